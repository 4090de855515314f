use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{QuizId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttemptStatsError {
    #[error("score must be between 0 and 100, got {0}")]
    ScoreOutOfRange(u8),
}

/// Latest-attempt summary kept for one user on one quiz.
///
/// Only the most recent score survives; earlier scores are overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptStats {
    pub quiz_id: QuizId,
    pub user_id: UserId,
    latest_score_percent: u8,
    attempt_count: u32,
    last_attempt_at: DateTime<Utc>,
}

impl AttemptStats {
    /// Summary after the first completed attempt.
    ///
    /// # Errors
    ///
    /// Returns `AttemptStatsError::ScoreOutOfRange` if the score exceeds 100.
    pub fn first_attempt(
        quiz_id: QuizId,
        user_id: UserId,
        score_percent: u8,
        at: DateTime<Utc>,
    ) -> Result<Self, AttemptStatsError> {
        Self::from_persisted(quiz_id, user_id, score_percent, 1, at)
    }

    /// Rebuild a row loaded from storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptStatsError::ScoreOutOfRange` if the score exceeds 100.
    pub fn from_persisted(
        quiz_id: QuizId,
        user_id: UserId,
        latest_score_percent: u8,
        attempt_count: u32,
        last_attempt_at: DateTime<Utc>,
    ) -> Result<Self, AttemptStatsError> {
        if latest_score_percent > 100 {
            return Err(AttemptStatsError::ScoreOutOfRange(latest_score_percent));
        }
        Ok(Self {
            quiz_id,
            user_id,
            latest_score_percent,
            attempt_count,
            last_attempt_at,
        })
    }

    /// Summary after one more completed attempt: count + 1, score replaced.
    ///
    /// `previous` is the stored row, if any.
    ///
    /// # Errors
    ///
    /// Returns `AttemptStatsError::ScoreOutOfRange` if the score exceeds 100.
    pub fn record(
        previous: Option<&AttemptStats>,
        quiz_id: QuizId,
        user_id: UserId,
        score_percent: u8,
        at: DateTime<Utc>,
    ) -> Result<Self, AttemptStatsError> {
        let count = previous.map_or(0, AttemptStats::attempt_count);
        Self::from_persisted(quiz_id, user_id, score_percent, count.saturating_add(1), at)
    }

    #[must_use]
    pub fn latest_score_percent(&self) -> u8 {
        self.latest_score_percent
    }

    #[must_use]
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    #[must_use]
    pub fn last_attempt_at(&self) -> DateTime<Utc> {
        self.last_attempt_at
    }
}
