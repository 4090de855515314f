use std::sync::Arc;

use storage::repository::{QuizRepository, StatsRepository};
use study_core::model::{AttemptStats, Quiz, QuizId, UserId};
use study_core::scoring::{ScoreResult, Submission, evaluate};
use tracing::info;

use crate::Clock;
use crate::auth::{AuthProvider, require_user};
use crate::deadline::StoreDeadline;
use crate::error::ScoringServiceError;
use crate::quiz_service::load_owned_quiz;

/// Score plus the attempt summary stored for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub score: ScoreResult,
    pub stats: AttemptStats,
}

/// Scores completed quizzes and keeps the per-user attempt summary.
#[derive(Clone)]
pub struct ScoringService {
    clock: Clock,
    deadline: StoreDeadline,
    auth: Arc<dyn AuthProvider>,
    quizzes: Arc<dyn QuizRepository>,
    stats: Arc<dyn StatsRepository>,
}

impl ScoringService {
    #[must_use]
    pub fn new(
        clock: Clock,
        deadline: StoreDeadline,
        auth: Arc<dyn AuthProvider>,
        quizzes: Arc<dyn QuizRepository>,
        stats: Arc<dyn StatsRepository>,
    ) -> Self {
        Self {
            clock,
            deadline,
            auth,
            quizzes,
            stats,
        }
    }

    /// Count one more attempt at `quiz_id` for `user_id`, keeping `score` as
    /// the latest result.
    ///
    /// Not idempotent: each call adds an attempt.
    ///
    /// # Errors
    ///
    /// Returns `ScoringServiceError::Unauthorized` (and writes nothing) when
    /// the session user is not `user_id`, or `ScoringServiceError::Storage`
    /// if the summary cannot be read or written.
    pub async fn record_attempt(
        &self,
        user_id: UserId,
        quiz_id: QuizId,
        score: &ScoreResult,
    ) -> Result<AttemptStats, ScoringServiceError> {
        require_user(self.auth.as_ref(), user_id).await?;

        let previous = self
            .deadline
            .run(self.stats.get_stats(quiz_id, user_id))
            .await?;
        let stats = AttemptStats::record(
            previous.as_ref(),
            quiz_id,
            user_id,
            score.score_percent,
            self.clock.now(),
        )?;
        self.deadline.run(self.stats.upsert_stats(&stats)).await?;

        info!(
            quiz_id = %quiz_id,
            user_id = %user_id,
            score = stats.latest_score_percent(),
            attempts = stats.attempt_count(),
            "attempt recorded"
        );
        Ok(stats)
    }

    /// Load the quiz, score `submission` and record the attempt.
    ///
    /// Scoring happens before the single write, so a failure leaves the
    /// stored summary untouched.
    ///
    /// # Errors
    ///
    /// Returns `ScoringServiceError::Unauthorized` without a session,
    /// `ScoringServiceError::Scoring` for a quiz without questions, or
    /// `ScoringServiceError::Storage` for missing quizzes and store failures.
    pub async fn submit_attempt(
        &self,
        quiz_id: QuizId,
        submission: &Submission,
    ) -> Result<AttemptOutcome, ScoringServiceError> {
        let user_id = self.auth.current_user().await?;
        let quiz: Quiz = load_owned_quiz::<ScoringServiceError>(
            self.quizzes.as_ref(),
            self.deadline,
            quiz_id,
            user_id,
        )
        .await?;

        let score = evaluate(&quiz.questions, submission)?;
        let stats = self.record_attempt(user_id, quiz_id, &score).await?;
        Ok(AttemptOutcome { score, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use async_trait::async_trait;
    use storage::repository::{
        CategoryRepository, InMemoryRepository, NewQuizRecord, StorageError,
    };
    use study_core::model::{Question, encode_questions};
    use study_core::scoring::ScoringError;
    use study_core::time::{fixed_clock, fixed_now};

    use crate::auth::SessionAuth;

    async fn seeded(repo: &InMemoryRepository, owner: UserId, questions: &[Question]) -> QuizId {
        let category = repo.insert_category("Maths").await.unwrap();
        repo.insert_quiz(NewQuizRecord {
            owner_id: owner,
            title: "Calcul".into(),
            category_id: category,
            questions: encode_questions(questions).unwrap(),
            created_at: fixed_now(),
        })
        .await
        .unwrap()
    }

    fn service(repo: &InMemoryRepository, auth: Arc<SessionAuth>) -> ScoringService {
        ScoringService::new(
            fixed_clock(),
            StoreDeadline::default(),
            auth,
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    fn two_plus_two() -> Vec<Question> {
        vec![Question::new(
            "2+2?",
            vec!["3".into(), "4".into(), "5".into()],
            [1],
        )]
    }

    #[tokio::test]
    async fn submit_scores_and_records_first_attempt() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        let quiz = seeded(&repo, user, &two_plus_two()).await;
        let svc = service(&repo, Arc::new(SessionAuth::signed_in(user)));

        let mut submission = Submission::new();
        submission.select(0, 1);
        let outcome = svc.submit_attempt(quiz, &submission).await.unwrap();

        assert_eq!(outcome.score.correct_count, 1);
        assert_eq!(outcome.score.total_questions, 1);
        assert_eq!(outcome.score.score_percent, 100);
        assert_eq!(outcome.stats.attempt_count(), 1);
        assert_eq!(outcome.stats.last_attempt_at(), fixed_now());
    }

    #[tokio::test]
    async fn recording_twice_keeps_one_row_with_count_two() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        let quiz = seeded(&repo, user, &two_plus_two()).await;
        let svc = service(&repo, Arc::new(SessionAuth::signed_in(user)));
        let questions = two_plus_two();

        let wrong = evaluate(&questions, &Submission::new()).unwrap();
        let mut answered = Submission::new();
        answered.select(0, 1);
        let right = evaluate(&questions, &answered).unwrap();
        svc.record_attempt(user, quiz, &wrong).await.unwrap();
        svc.record_attempt(user, quiz, &right).await.unwrap();

        let rows = repo.list_stats(user, &[quiz]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].attempt_count(), 2);
        assert_eq!(rows[0].latest_score_percent(), 100);
    }

    #[tokio::test]
    async fn recording_for_another_user_is_unauthorized_and_writes_nothing() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        let quiz = seeded(&repo, user, &two_plus_two()).await;
        let svc = service(&repo, Arc::new(SessionAuth::signed_in(user)));
        let score = evaluate(&two_plus_two(), &Submission::new()).unwrap();

        let intruder = UserId::random();
        assert!(matches!(
            svc.record_attempt(intruder, quiz, &score).await,
            Err(ScoringServiceError::Unauthorized)
        ));
        assert!(repo.get_stats(quiz, intruder).await.unwrap().is_none());

        let signed_out = service(&repo, Arc::new(SessionAuth::new()));
        assert!(matches!(
            signed_out.record_attempt(user, quiz, &score).await,
            Err(ScoringServiceError::Unauthorized)
        ));
        assert!(repo.get_stats(quiz, user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_quiz_is_invalid_and_leaves_stats_alone() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        let quiz = seeded(&repo, user, &[]).await;
        let svc = service(&repo, Arc::new(SessionAuth::signed_in(user)));

        assert!(matches!(
            svc.submit_attempt(quiz, &Submission::new()).await,
            Err(ScoringServiceError::Scoring(ScoringError::InvalidQuiz))
        ));
        assert!(repo.get_stats(quiz, user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_quiz_is_not_found() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        let svc = service(&repo, Arc::new(SessionAuth::signed_in(user)));

        assert!(matches!(
            svc.submit_attempt(QuizId::new(12), &Submission::new()).await,
            Err(ScoringServiceError::Storage(StorageError::NotFound))
        ));
    }

    struct StalledStats;

    #[async_trait]
    impl StatsRepository for StalledStats {
        async fn get_stats(
            &self,
            _quiz_id: QuizId,
            _user_id: UserId,
        ) -> Result<Option<AttemptStats>, StorageError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }

        async fn list_stats(
            &self,
            _user_id: UserId,
            _quiz_ids: &[QuizId],
        ) -> Result<Vec<AttemptStats>, StorageError> {
            Ok(Vec::new())
        }

        async fn upsert_stats(&self, _stats: &AttemptStats) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_surfaces_timeout() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        let quiz = seeded(&repo, user, &two_plus_two()).await;
        let svc = ScoringService::new(
            fixed_clock(),
            StoreDeadline::new(Duration::from_millis(200)),
            Arc::new(SessionAuth::signed_in(user)),
            Arc::new(repo.clone()),
            Arc::new(StalledStats),
        );

        let err = svc
            .submit_attempt(quiz, &Submission::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScoringServiceError::Storage(StorageError::Timeout(_))
        ));
    }
}
