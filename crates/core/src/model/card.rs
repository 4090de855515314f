use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{CardId, DeckId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CardError {
    #[error("card front cannot be empty")]
    EmptyFront,

    #[error("card back cannot be empty")]
    EmptyBack,
}

/// Unvalidated two-sided flashcard content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDraft {
    pub deck_id: DeckId,
    pub front: String,
    pub back: String,
}

impl CardDraft {
    /// # Errors
    ///
    /// Returns `CardError` if either side is blank.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedCard, CardError> {
        let front = self.front.trim();
        if front.is_empty() {
            return Err(CardError::EmptyFront);
        }
        let back = self.back.trim();
        if back.is_empty() {
            return Err(CardError::EmptyBack);
        }
        Ok(ValidatedCard {
            deck_id: self.deck_id,
            front: front.to_owned(),
            back: back.to_owned(),
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCard {
    pub deck_id: DeckId,
    pub front: String,
    pub back: String,
    pub created_at: DateTime<Utc>,
}

impl ValidatedCard {
    #[must_use]
    pub fn assign_id(self, id: CardId) -> Card {
        Card {
            id,
            deck_id: self.deck_id,
            front: self.front,
            back: self.back,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub deck_id: DeckId,
    pub front: String,
    pub back: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn card_fails_if_front_empty() {
        let draft = CardDraft {
            deck_id: DeckId::new(1),
            front: "   ".into(),
            back: "ok".into(),
        };
        assert_eq!(draft.validate(fixed_now()).unwrap_err(), CardError::EmptyFront);
    }

    #[test]
    fn card_fails_if_back_empty() {
        let draft = CardDraft {
            deck_id: DeckId::new(1),
            front: "ok".into(),
            back: "".into(),
        };
        assert_eq!(draft.validate(fixed_now()).unwrap_err(), CardError::EmptyBack);
    }

    #[test]
    fn valid_card_validates_and_assigns_id() {
        let card = CardDraft {
            deck_id: DeckId::new(1),
            front: " bonjour ".into(),
            back: "hello".into(),
        }
        .validate(fixed_now())
        .unwrap()
        .assign_id(CardId::new(42));

        assert_eq!(card.id, CardId::new(42));
        assert_eq!(card.deck_id, DeckId::new(1));
        assert_eq!(card.front, "bonjour");
        assert_eq!(card.back, "hello");
    }
}
