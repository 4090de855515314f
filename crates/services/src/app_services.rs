use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::auth::{AuthProvider, SessionAuth};
use crate::card_service::CardService;
use crate::dashboard_service::DashboardService;
use crate::deadline::StoreDeadline;
use crate::deck_service::DeckService;
use crate::quiz_service::QuizService;
use crate::scoring_service::ScoringService;

/// Assembles app-facing services over one storage bundle and one session.
#[derive(Clone)]
pub struct AppServices {
    session: Arc<SessionAuth>,
    quizzes: Arc<QuizService>,
    scoring: Arc<ScoringService>,
    dashboard: Arc<DashboardService>,
    decks: Arc<DeckService>,
    cards: Arc<CardService>,
}

impl AppServices {
    /// Wire every service to `storage` with a fresh, signed-out session.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, deadline: StoreDeadline) -> Self {
        let session = Arc::new(SessionAuth::new());
        let auth: Arc<dyn AuthProvider> = session.clone();

        let quizzes = Arc::new(QuizService::new(
            clock,
            deadline,
            Arc::clone(&auth),
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.categories),
        ));
        let scoring = Arc::new(ScoringService::new(
            clock,
            deadline,
            Arc::clone(&auth),
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.stats),
        ));
        let dashboard = Arc::new(DashboardService::new(
            deadline,
            Arc::clone(&auth),
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.stats),
        ));
        let decks = Arc::new(DeckService::new(
            clock,
            deadline,
            Arc::clone(&auth),
            Arc::clone(&storage.decks),
        ));
        let cards = Arc::new(CardService::new(
            clock,
            deadline,
            auth,
            Arc::clone(&storage.decks),
            Arc::clone(&storage.cards),
        ));

        Self {
            session,
            quizzes,
            scoring,
            dashboard,
            decks,
            cards,
        }
    }

    #[must_use]
    pub fn session(&self) -> Arc<SessionAuth> {
        Arc::clone(&self.session)
    }

    #[must_use]
    pub fn quiz_service(&self) -> Arc<QuizService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn scoring_service(&self) -> Arc<ScoringService> {
        Arc::clone(&self.scoring)
    }

    #[must_use]
    pub fn dashboard_service(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard)
    }

    #[must_use]
    pub fn deck_service(&self) -> Arc<DeckService> {
        Arc::clone(&self.decks)
    }

    #[must_use]
    pub fn card_service(&self) -> Arc<CardService> {
        Arc::clone(&self.cards)
    }
}
