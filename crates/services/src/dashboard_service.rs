use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use storage::repository::{QuizRecord, QuizRepository, StatsRepository};
use study_core::model::{AttemptStats, CategoryId, QuizId, UserId, decode_questions};
use tracing::{debug, warn};

use crate::auth::{AuthProvider, require_user};
use crate::deadline::StoreDeadline;
use crate::error::DashboardError;

//
// ─── VIEW MODEL ────────────────────────────────────────────────────────────────
//

/// One quiz as the dashboard lists it, merged with the user's attempt summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSummary {
    pub id: QuizId,
    pub title: String,
    pub category_id: Option<CategoryId>,
    pub question_count: usize,
    /// Latest score in percent, 0 when never attempted.
    pub progress: u8,
    pub try_number: u32,
    pub last_tried: Option<DateTime<Utc>>,
}

impl QuizSummary {
    fn from_record(record: &QuizRecord, stats: Option<&AttemptStats>) -> Self {
        let question_count = match decode_questions(&record.questions) {
            Ok(questions) => questions.len(),
            Err(err) => {
                warn!(quiz_id = %record.id, error = %err, "stored questions unreadable; listing quiz as empty");
                0
            }
        };

        Self {
            id: record.id,
            title: record.title.clone(),
            category_id: record.category_id,
            question_count,
            progress: stats.map_or(0, AttemptStats::latest_score_percent),
            try_number: stats.map_or(0, AttemptStats::attempt_count),
            last_tried: stats.map(AttemptStats::last_attempt_at),
        }
    }

    #[must_use]
    pub fn attempted(&self) -> bool {
        self.try_number > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    pub title: String,
    pub quizzes: Vec<QuizSummary>,
}

/// Quizzes grouped by category title, groups in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dashboard {
    groups: Vec<CategoryGroup>,
}

impl Dashboard {
    fn push(&mut self, index: &mut HashMap<String, usize>, title: &str, quiz: QuizSummary) {
        let slot = *index.entry(title.to_owned()).or_insert_with(|| {
            self.groups.push(CategoryGroup {
                title: title.to_owned(),
                quizzes: Vec::new(),
            });
            self.groups.len() - 1
        });
        self.groups[slot].quizzes.push(quiz);
    }

    #[must_use]
    pub fn groups(&self) -> &[CategoryGroup] {
        &self.groups
    }

    #[must_use]
    pub fn get(&self, title: &str) -> Option<&CategoryGroup> {
        self.groups.iter().find(|g| g.title == title)
    }

    #[must_use]
    pub fn category_titles(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.title.as_str()).collect()
    }

    #[must_use]
    pub fn total_quizzes(&self) -> usize {
        self.groups.iter().map(|g| g.quizzes.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Builds the per-user dashboard of quizzes and attempt summaries.
#[derive(Clone)]
pub struct DashboardService {
    deadline: StoreDeadline,
    auth: Arc<dyn AuthProvider>,
    quizzes: Arc<dyn QuizRepository>,
    stats: Arc<dyn StatsRepository>,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        deadline: StoreDeadline,
        auth: Arc<dyn AuthProvider>,
        quizzes: Arc<dyn QuizRepository>,
        stats: Arc<dyn StatsRepository>,
    ) -> Self {
        Self {
            deadline,
            auth,
            quizzes,
            stats,
        }
    }

    /// Load every quiz owned by `user_id`, merged with that user's stats.
    ///
    /// A quiz whose stored questions cannot be decoded is still listed, with
    /// zero questions.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Unauthorized` when the session user is not
    /// `user_id`, or `DashboardError::Storage` if a store call fails.
    pub async fn load_dashboard(&self, user_id: UserId) -> Result<Dashboard, DashboardError> {
        require_user(self.auth.as_ref(), user_id).await?;

        let records = self.deadline.run(self.quizzes.list_quizzes(user_id)).await?;
        let ids: Vec<QuizId> = records.iter().map(|r| r.id).collect();
        let stats = self
            .deadline
            .run(self.stats.list_stats(user_id, &ids))
            .await?;
        let by_quiz: HashMap<QuizId, &AttemptStats> =
            stats.iter().map(|s| (s.quiz_id, s)).collect();

        let mut dashboard = Dashboard::default();
        let mut index = HashMap::new();
        for record in &records {
            let summary = QuizSummary::from_record(record, by_quiz.get(&record.id).copied());
            dashboard.push(&mut index, record.bucket(), summary);
        }

        debug!(
            user_id = %user_id,
            quizzes = dashboard.total_quizzes(),
            categories = dashboard.groups.len(),
            "dashboard loaded"
        );
        Ok(dashboard)
    }

    /// Reload the dashboard for whoever is signed in.
    ///
    /// # Errors
    ///
    /// Same as [`DashboardService::load_dashboard`].
    pub async fn refresh(&self) -> Result<Dashboard, DashboardError> {
        let user_id = self.auth.current_user().await?;
        self.load_dashboard(user_id).await
    }
}
