#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth;
pub mod card_service;
pub mod dashboard_service;
pub mod deadline;
pub mod deck_service;
pub mod error;
pub mod quiz_service;
pub mod scoring_service;

pub use study_core::Clock;

pub use app_services::AppServices;
pub use auth::{AuthError, AuthProvider, SessionAuth};
pub use card_service::CardService;
pub use dashboard_service::{CategoryGroup, Dashboard, DashboardService, QuizSummary};
pub use deadline::StoreDeadline;
pub use deck_service::{DeckGroup, DeckService};
pub use error::{
    CardServiceError, DashboardError, DeckServiceError, QuizServiceError, ScoringServiceError,
};
pub use quiz_service::QuizService;
pub use scoring_service::{AttemptOutcome, ScoringService};
