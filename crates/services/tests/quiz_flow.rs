use services::{AppServices, Clock, QuizServiceError, StoreDeadline};
use storage::repository::{CategoryRepository, QuizRepository, Storage, StatsRepository};
use study_core::model::{Question, QuizDraft, QuizField, UNCATEGORIZED, UserId};
use study_core::scoring::Submission;
use study_core::time::fixed_now;

async fn sqlite_services(name: &str) -> (AppServices, Storage) {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let storage = Storage::sqlite(&url).await.expect("sqlite storage");
    let services =
        AppServices::from_storage(&storage, Clock::fixed(fixed_now()), StoreDeadline::default());
    (services, storage)
}

fn capitals(category: study_core::model::CategoryId) -> QuizDraft {
    QuizDraft {
        title: "Capitales".into(),
        category_id: Some(category),
        questions: vec![
            Question::new("France ?", vec!["Lyon".into(), "Paris".into()], [1]),
            Question::new(
                "Villes italiennes ?",
                vec!["Rome".into(), "Madrid".into(), "Milan".into()],
                [0, 2],
            ),
            Question::new("Allemagne ?", vec!["Berlin".into(), "Vienne".into()], [0]),
        ],
    }
}

#[tokio::test]
async fn author_take_and_review_dashboard_on_sqlite() {
    let (services, storage) = sqlite_services("memdb_services_quiz_flow").await;
    let geo = storage.categories.insert_category("Géographie").await.unwrap();
    let user = UserId::random();
    services.session().sign_in(user);

    let quiz_id = services
        .quiz_service()
        .create_quiz(capitals(geo))
        .await
        .unwrap();

    let mut submission = Submission::new();
    submission.select(0, 1);
    submission.set(1, [0]);
    submission.select(2, 0);
    let first = services
        .scoring_service()
        .submit_attempt(quiz_id, &submission)
        .await
        .unwrap();
    assert_eq!(first.score.correct_count, 2);
    assert_eq!(first.score.score_percent, 67);
    assert_eq!(first.score.question_results(), &[true, false, true]);

    submission.toggle(1, 2);
    let second = services
        .scoring_service()
        .submit_attempt(quiz_id, &submission)
        .await
        .unwrap();
    assert_eq!(second.score.score_percent, 100);
    assert_eq!(second.stats.attempt_count(), 2);

    let dashboard = services
        .dashboard_service()
        .load_dashboard(user)
        .await
        .unwrap();
    let entry = &dashboard.get("Géographie").unwrap().quizzes[0];
    assert_eq!(entry.id, quiz_id);
    assert_eq!(entry.question_count, 3);
    assert_eq!(entry.progress, 100);
    assert_eq!(entry.try_number, 2);
    assert_eq!(entry.last_tried, Some(fixed_now()));

    storage.categories.delete_category(geo).await.unwrap();
    let refreshed = services.dashboard_service().refresh().await.unwrap();
    assert_eq!(refreshed.category_titles(), vec![UNCATEGORIZED]);
    assert_eq!(refreshed.total_quizzes(), 1);
}

#[tokio::test]
async fn validation_failure_names_the_field_and_stores_nothing() {
    let (services, storage) = sqlite_services("memdb_services_validation").await;
    let geo = storage.categories.insert_category("Géographie").await.unwrap();
    let user = UserId::random();
    services.session().sign_in(user);

    let mut draft = capitals(geo);
    draft.questions[2].options.truncate(1);

    let err = services
        .quiz_service()
        .create_quiz(draft)
        .await
        .unwrap_err();
    match err {
        QuizServiceError::Validation(e) => {
            assert_eq!(e.field(), QuizField::Options { question: 2 });
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(storage.quizzes.list_quizzes(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_quiz_drops_its_stats() {
    let (services, storage) = sqlite_services("memdb_services_delete").await;
    let geo = storage.categories.insert_category("Géographie").await.unwrap();
    let user = UserId::random();
    services.session().sign_in(user);

    let quiz_id = services
        .quiz_service()
        .create_quiz(capitals(geo))
        .await
        .unwrap();
    services
        .scoring_service()
        .submit_attempt(quiz_id, &Submission::new())
        .await
        .unwrap();
    assert!(storage.stats.get_stats(quiz_id, user).await.unwrap().is_some());

    services.quiz_service().delete_quiz(quiz_id).await.unwrap();
    assert!(storage.stats.get_stats(quiz_id, user).await.unwrap().is_none());
    assert!(
        services
            .dashboard_service()
            .refresh()
            .await
            .unwrap()
            .is_empty()
    );
}
