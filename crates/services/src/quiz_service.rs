use std::sync::Arc;

use storage::repository::{
    CategoryRepository, NewQuizRecord, QuizRepository, QuizUpdate, StorageError,
};
use study_core::model::{Category, Quiz, QuizDraft, QuizId, UserId, ValidatedQuiz};
use tracing::{debug, info};

use crate::Clock;
use crate::auth::AuthProvider;
use crate::deadline::StoreDeadline;
use crate::error::QuizServiceError;

/// Authoring operations on the session user's quizzes.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    deadline: StoreDeadline,
    auth: Arc<dyn AuthProvider>,
    quizzes: Arc<dyn QuizRepository>,
    categories: Arc<dyn CategoryRepository>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        deadline: StoreDeadline,
        auth: Arc<dyn AuthProvider>,
        quizzes: Arc<dyn QuizRepository>,
        categories: Arc<dyn CategoryRepository>,
    ) -> Self {
        Self {
            clock,
            deadline,
            auth,
            quizzes,
            categories,
        }
    }

    /// Categories a quiz may be filed under.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Unauthorized` without a session, or
    /// `QuizServiceError::Storage` if the categories cannot be read.
    pub async fn list_categories(&self) -> Result<Vec<Category>, QuizServiceError> {
        self.auth.current_user().await?;
        let categories = self.deadline.run(self.categories.list_categories()).await?;
        Ok(categories)
    }

    /// Validate and store a new quiz owned by the session user.
    ///
    /// Nothing is written when validation fails.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Unauthorized` without a session,
    /// `QuizServiceError::Validation` for the first broken authoring rule,
    /// or `QuizServiceError::Storage` if persistence fails.
    pub async fn create_quiz(&self, draft: QuizDraft) -> Result<QuizId, QuizServiceError> {
        let owner = self.auth.current_user().await?;
        let validated = self.validate(draft).await?;

        let record = NewQuizRecord::from_validated(&validated, owner)?;
        let id = self.deadline.run(self.quizzes.insert_quiz(record)).await?;

        info!(
            quiz_id = %id,
            user_id = %owner,
            questions = validated.questions.len(),
            "quiz created"
        );
        Ok(id)
    }

    /// Replace title, category and questions of an owned quiz.
    ///
    /// # Errors
    ///
    /// Same as [`QuizService::create_quiz`]; a quiz the session user does
    /// not own is `StorageError::NotFound`.
    pub async fn update_quiz(&self, id: QuizId, draft: QuizDraft) -> Result<(), QuizServiceError> {
        let owner = self.auth.current_user().await?;
        let validated = self.validate(draft).await?;

        let update = QuizUpdate::from_validated(&validated)?;
        self.deadline
            .run(self.quizzes.update_quiz(id, owner, update))
            .await?;

        info!(quiz_id = %id, user_id = %owner, "quiz updated");
        Ok(())
    }

    /// Delete an owned quiz along with every attempt summary for it.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Unauthorized` without a session, or
    /// `QuizServiceError::Storage` (`NotFound` for quizzes the user does not own).
    pub async fn delete_quiz(&self, id: QuizId) -> Result<(), QuizServiceError> {
        let owner = self.auth.current_user().await?;
        self.deadline.run(self.quizzes.delete_quiz(id, owner)).await?;

        info!(quiz_id = %id, user_id = %owner, "quiz deleted");
        Ok(())
    }

    /// Fetch an owned quiz with its questions decoded.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Unauthorized` without a session,
    /// `QuizServiceError::Storage` (`NotFound` for missing or foreign quizzes),
    /// or `QuizServiceError::Codec` if the stored questions are malformed.
    pub async fn get_quiz(&self, id: QuizId) -> Result<Quiz, QuizServiceError> {
        let owner = self.auth.current_user().await?;
        load_owned_quiz(self.quizzes.as_ref(), self.deadline, id, owner).await
    }

    async fn validate(&self, draft: QuizDraft) -> Result<ValidatedQuiz, QuizServiceError> {
        let categories = self.deadline.run(self.categories.list_categories()).await?;
        let validated = draft.validate(&categories, self.clock.now())?;
        debug!(title = %validated.title, "quiz draft validated");
        Ok(validated)
    }
}

/// Load and decode quiz `id`, treating quizzes of other users as missing.
pub(crate) async fn load_owned_quiz<E>(
    quizzes: &dyn QuizRepository,
    deadline: StoreDeadline,
    id: QuizId,
    owner: UserId,
) -> Result<Quiz, E>
where
    E: From<StorageError> + From<study_core::model::QuestionCodecError>,
{
    let record = deadline
        .run(quizzes.get_quiz(id))
        .await?
        .filter(|r| r.owner_id == owner)
        .ok_or(StorageError::NotFound)?;
    Ok(record.into_quiz()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use storage::repository::{InMemoryRepository, NewQuizRecord};
    use study_core::model::{CategoryId, Question, QuizField, QuizValidationError};
    use study_core::time::{fixed_clock, fixed_now};

    use crate::auth::SessionAuth;

    struct Fixture {
        service: QuizService,
        auth: Arc<SessionAuth>,
        repo: InMemoryRepository,
        category: CategoryId,
    }

    async fn fixture() -> Fixture {
        let repo = InMemoryRepository::new();
        let category = repo.insert_category("Géographie").await.unwrap();
        let auth = Arc::new(SessionAuth::signed_in(UserId::random()));
        let service = QuizService::new(
            fixed_clock(),
            StoreDeadline::default(),
            auth.clone(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        Fixture {
            service,
            auth,
            repo,
            category,
        }
    }

    fn draft(category: CategoryId) -> QuizDraft {
        QuizDraft {
            title: "  Capitales ".into(),
            category_id: Some(category),
            questions: vec![Question::new(
                "Capitale de l'Italie ?",
                vec!["Rome".into(), "Milan".into()],
                [0],
            )],
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_trimmed_quiz() {
        let fx = fixture().await;
        let id = fx.service.create_quiz(draft(fx.category)).await.unwrap();

        let quiz = fx.service.get_quiz(id).await.unwrap();
        assert_eq!(quiz.title, "Capitales");
        assert_eq!(quiz.category_id, Some(fx.category));
        assert_eq!(quiz.owner_id, fx.auth.user().unwrap());
        assert_eq!(quiz.question_count(), 1);
    }

    #[tokio::test]
    async fn invalid_draft_writes_nothing() {
        let fx = fixture().await;
        let mut bad = draft(fx.category);
        bad.questions[0].correct_options.clear();

        let err = fx.service.create_quiz(bad).await.unwrap_err();
        match err {
            QuizServiceError::Validation(e) => {
                assert_eq!(e, QuizValidationError::NoCorrectOption { question: 0 });
                assert_eq!(e.field(), QuizField::CorrectOptions { question: 0 });
                assert_eq!(e.field().to_string(), "questions[0].correctOptions");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let owner = fx.auth.user().unwrap();
        assert!(fx.repo.list_quizzes(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_category_is_rejected_before_write() {
        let fx = fixture().await;
        let err = fx
            .service
            .create_quiz(draft(CategoryId::new(999)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QuizServiceError::Validation(QuizValidationError::UnknownCategory(_))
        ));
    }

    #[tokio::test]
    async fn signed_out_user_is_unauthorized() {
        let fx = fixture().await;
        fx.auth.sign_out();

        assert!(matches!(
            fx.service.create_quiz(draft(fx.category)).await,
            Err(QuizServiceError::Unauthorized)
        ));
        assert!(matches!(
            fx.service.list_categories().await,
            Err(QuizServiceError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn other_users_cannot_touch_the_quiz() {
        let fx = fixture().await;
        let id = fx.service.create_quiz(draft(fx.category)).await.unwrap();
        let owner = fx.auth.user().unwrap();

        fx.auth.sign_in(UserId::random());
        assert!(matches!(
            fx.service.get_quiz(id).await,
            Err(QuizServiceError::Storage(StorageError::NotFound))
        ));
        assert!(matches!(
            fx.service.delete_quiz(id).await,
            Err(QuizServiceError::Storage(StorageError::NotFound))
        ));
        assert!(matches!(
            fx.service.update_quiz(id, draft(fx.category)).await,
            Err(QuizServiceError::Storage(StorageError::NotFound))
        ));

        fx.auth.sign_in(owner);
        let mut renamed = draft(fx.category);
        renamed.title = "Capitales d'Europe".into();
        fx.service.update_quiz(id, renamed).await.unwrap();
        assert_eq!(
            fx.service.get_quiz(id).await.unwrap().title,
            "Capitales d'Europe"
        );

        fx.service.delete_quiz(id).await.unwrap();
        assert!(fx.repo.get_quiz(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_stored_questions_surface_as_codec_error() {
        let fx = fixture().await;
        let id = fx
            .repo
            .insert_raw_quiz(NewQuizRecord {
                owner_id: fx.auth.user().unwrap(),
                title: "Cassé".into(),
                category_id: fx.category,
                questions: "{not json".into(),
                created_at: fixed_now(),
            })
            .unwrap();

        assert!(matches!(
            fx.service.get_quiz(id).await,
            Err(QuizServiceError::Codec(_))
        ));
    }

    #[tokio::test]
    async fn list_categories_returns_store_rows() {
        let fx = fixture().await;
        let categories = fx.service.list_categories().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].title, "Géographie");
    }
}
