use std::sync::Arc;

use storage::repository::{CardRepository, DeckRepository, StorageError};
use study_core::model::{Card, CardDraft, CardId, DeckId, UserId};
use tracing::info;

use crate::Clock;
use crate::auth::AuthProvider;
use crate::deadline::StoreDeadline;
use crate::error::CardServiceError;

/// Orchestrates card creation and persistence inside the session user's decks.
#[derive(Clone)]
pub struct CardService {
    clock: Clock,
    deadline: StoreDeadline,
    auth: Arc<dyn AuthProvider>,
    decks: Arc<dyn DeckRepository>,
    cards: Arc<dyn CardRepository>,
}

impl CardService {
    #[must_use]
    pub fn new(
        clock: Clock,
        deadline: StoreDeadline,
        auth: Arc<dyn AuthProvider>,
        decks: Arc<dyn DeckRepository>,
        cards: Arc<dyn CardRepository>,
    ) -> Self {
        Self {
            clock,
            deadline,
            auth,
            decks,
            cards,
        }
    }

    /// Create a new card and persist it.
    ///
    /// # Errors
    ///
    /// Returns `CardServiceError::Card` for validation failures, or
    /// `CardServiceError::Storage` (`NotFound` when the deck is not the user's).
    pub async fn create_card(
        &self,
        deck_id: DeckId,
        front: impl Into<String>,
        back: impl Into<String>,
    ) -> Result<CardId, CardServiceError> {
        let owner = self.auth.current_user().await?;
        let card = CardDraft {
            deck_id,
            front: front.into(),
            back: back.into(),
        }
        .validate(self.clock.now())?;

        self.ensure_owned(deck_id, owner).await?;
        let card_id = self.deadline.run(self.cards.insert_card(&card)).await?;

        info!(deck_id = %deck_id, card_id = %card_id, "card created");
        Ok(card_id)
    }

    /// Cards of an owned deck, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `CardServiceError::Storage` (`NotFound` when the deck is not the user's).
    pub async fn list_cards(&self, deck_id: DeckId) -> Result<Vec<Card>, CardServiceError> {
        let owner = self.auth.current_user().await?;
        self.ensure_owned(deck_id, owner).await?;
        let cards = self.deadline.run(self.cards.list_cards(deck_id)).await?;
        Ok(cards)
    }

    /// # Errors
    ///
    /// Returns `CardServiceError::Storage` (`NotFound` when the deck is not the
    /// user's or the card is not in it).
    pub async fn delete_card(
        &self,
        deck_id: DeckId,
        card_id: CardId,
    ) -> Result<(), CardServiceError> {
        let owner = self.auth.current_user().await?;
        self.ensure_owned(deck_id, owner).await?;
        self.deadline
            .run(self.cards.delete_card(deck_id, card_id))
            .await?;
        Ok(())
    }

    async fn ensure_owned(&self, deck_id: DeckId, owner: UserId) -> Result<(), CardServiceError> {
        self.deadline
            .run(self.decks.get_deck(deck_id, owner))
            .await?
            .ok_or(StorageError::NotFound)?;
        Ok(())
    }
}
