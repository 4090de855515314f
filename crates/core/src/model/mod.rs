mod card;
mod category;
mod deck;
mod ids;
mod question;
mod quiz;
mod stats;

pub use ids::{CardId, CategoryId, DeckId, ParseIdError, QuizId, UserId};

pub use card::{Card, CardDraft, CardError, ValidatedCard};
pub use category::{Category, CategoryError, UNCATEGORIZED, bucket_title};
pub use deck::{Deck, DeckDraft, DeckError, ValidatedDeck, normalize_title as normalize_deck_title};
pub use question::{Question, QuestionCodecError, decode_questions, encode_questions};
pub use quiz::{MIN_OPTIONS, Quiz, QuizDraft, QuizField, QuizValidationError, ValidatedQuiz};
pub use stats::{AttemptStats, AttemptStatsError};
