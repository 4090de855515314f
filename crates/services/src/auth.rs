//! Session identity.

use std::sync::RwLock;

use async_trait::async_trait;
use study_core::model::UserId;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("no signed-in user")]
    Unauthorized,
}

/// Supplies the user behind the current session.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns `AuthError::Unauthorized` when nobody is signed in.
    async fn current_user(&self) -> Result<UserId, AuthError>;
}

/// Resolve the session user and require it to be `expected`.
///
/// # Errors
///
/// Returns `AuthError::Unauthorized` when nobody is signed in or the session
/// belongs to someone else.
pub async fn require_user(auth: &dyn AuthProvider, expected: UserId) -> Result<UserId, AuthError> {
    let user = auth.current_user().await?;
    if user == expected {
        Ok(user)
    } else {
        Err(AuthError::Unauthorized)
    }
}

/// In-process session holding at most one signed-in user.
#[derive(Debug, Default)]
pub struct SessionAuth {
    user: RwLock<Option<UserId>>,
}

impl SessionAuth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn signed_in(user: UserId) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    pub fn sign_in(&self, user: UserId) {
        let mut guard = self.user.write().unwrap_or_else(|p| p.into_inner());
        *guard = Some(user);
    }

    pub fn sign_out(&self) {
        let mut guard = self.user.write().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }

    #[must_use]
    pub fn user(&self) -> Option<UserId> {
        *self.user.read().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl AuthProvider for SessionAuth {
    async fn current_user(&self) -> Result<UserId, AuthError> {
        self.user().ok_or(AuthError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_and_out_drive_current_user() {
        let auth = SessionAuth::new();
        assert_eq!(auth.current_user().await, Err(AuthError::Unauthorized));

        let user = UserId::random();
        auth.sign_in(user);
        assert_eq!(auth.current_user().await, Ok(user));

        auth.sign_out();
        assert_eq!(auth.current_user().await, Err(AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn require_user_rejects_other_users() {
        let user = UserId::random();
        let auth = SessionAuth::signed_in(user);

        assert_eq!(require_user(&auth, user).await, Ok(user));
        assert_eq!(
            require_user(&auth, UserId::random()).await,
            Err(AuthError::Unauthorized)
        );
    }
}
