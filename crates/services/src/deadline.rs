use std::future::Future;
use std::time::Duration;

use storage::repository::StorageError;

/// Upper bound on how long a single store call may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreDeadline(Duration);

impl StoreDeadline {
    pub const DEFAULT: Duration = Duration::from_secs(10);

    #[must_use]
    pub fn new(limit: Duration) -> Self {
        Self(limit)
    }

    #[must_use]
    pub fn limit(&self) -> Duration {
        self.0
    }

    /// Await `call`, giving up once the deadline passes.
    ///
    /// # Errors
    ///
    /// Returns the call's own error, or `StorageError::Timeout` on expiry.
    pub async fn run<T, F>(&self, call: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        tokio::time::timeout(self.0, call)
            .await
            .unwrap_or(Err(StorageError::Timeout(self.0)))
    }
}

impl Default for StoreDeadline {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}
