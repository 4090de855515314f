//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use study_core::model::{
    AttemptStatsError, CardError, DeckError, QuestionCodecError, QuizValidationError,
};
use study_core::scoring::ScoringError;

use crate::auth::AuthError;

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("no signed-in user")]
    Unauthorized,
    #[error(transparent)]
    Validation(#[from] QuizValidationError),
    #[error(transparent)]
    Codec(#[from] QuestionCodecError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ScoringService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScoringServiceError {
    #[error("no signed-in user, or attempt recorded for another user")]
    Unauthorized,
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Stats(#[from] AttemptStatsError),
    #[error(transparent)]
    Codec(#[from] QuestionCodecError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DashboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardError {
    #[error("no signed-in user, or dashboard requested for another user")]
    Unauthorized,
    #[error("could not load dashboard: {0}")]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DeckService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeckServiceError {
    #[error("no signed-in user")]
    Unauthorized,
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CardServiceError {
    #[error("no signed-in user")]
    Unauthorized,
    #[error(transparent)]
    Card(#[from] CardError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

macro_rules! unauthorized_from_auth {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<AuthError> for $ty {
                fn from(err: AuthError) -> Self {
                    match err {
                        AuthError::Unauthorized => Self::Unauthorized,
                    }
                }
            }
        )+
    };
}

unauthorized_from_auth!(
    QuizServiceError,
    ScoringServiceError,
    DashboardError,
    DeckServiceError,
    CardServiceError,
);
