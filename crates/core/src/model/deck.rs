use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{DeckId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeckError {
    #[error("deck title cannot be empty")]
    EmptyTitle,

    #[error("deck category cannot be empty")]
    EmptyCategory,
}

/// Labels for a deck that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckDraft {
    pub owner_id: UserId,
    pub category: String,
    pub title: String,
}

impl DeckDraft {
    /// Trims both labels and stamps the creation time.
    ///
    /// # Errors
    ///
    /// Returns `DeckError` if either label is blank.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedDeck, DeckError> {
        Ok(ValidatedDeck {
            owner_id: self.owner_id,
            category: normalize_category(&self.category)?,
            title: normalize_title(&self.title)?,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDeck {
    pub owner_id: UserId,
    pub category: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl ValidatedDeck {
    #[must_use]
    pub fn assign_id(self, id: DeckId) -> Deck {
        Deck {
            id,
            owner_id: self.owner_id,
            category: self.category,
            title: self.title,
            created_at: self.created_at,
        }
    }
}

/// A user-owned collection of flashcards, labelled with a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    id: DeckId,
    owner_id: UserId,
    category: String,
    title: String,
    created_at: DateTime<Utc>,
}

impl Deck {
    /// Creates a deck, trimming its category and title.
    ///
    /// # Errors
    ///
    /// Returns `DeckError` if either label is blank.
    pub fn new(
        id: DeckId,
        owner_id: UserId,
        category: impl Into<String>,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DeckError> {
        let category = normalize_category(&category.into())?;
        let title = normalize_title(&title.into())?;
        Ok(Self {
            id,
            owner_id,
            category,
            title,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> DeckId {
        self.id
    }

    #[must_use]
    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// # Errors
///
/// Returns `DeckError::EmptyTitle` for blank input.
pub fn normalize_title(raw: &str) -> Result<String, DeckError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DeckError::EmptyTitle);
    }
    Ok(trimmed.to_owned())
}

fn normalize_category(raw: &str) -> Result<String, DeckError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DeckError::EmptyCategory);
    }
    Ok(trimmed.to_owned())
}
