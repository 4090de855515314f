use std::collections::HashMap;
use std::sync::Arc;

use storage::repository::{DeckRepository, NewDeckRecord};
use study_core::model::{Deck, DeckDraft, DeckId, normalize_deck_title};
use tracing::info;

use crate::Clock;
use crate::auth::AuthProvider;
use crate::deadline::StoreDeadline;
use crate::error::DeckServiceError;

/// Decks sharing a category label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckGroup {
    pub category: String,
    pub decks: Vec<Deck>,
}

/// Orchestrates deck creation and persistence for the session user.
#[derive(Clone)]
pub struct DeckService {
    clock: Clock,
    deadline: StoreDeadline,
    auth: Arc<dyn AuthProvider>,
    decks: Arc<dyn DeckRepository>,
}

impl DeckService {
    #[must_use]
    pub fn new(
        clock: Clock,
        deadline: StoreDeadline,
        auth: Arc<dyn AuthProvider>,
        decks: Arc<dyn DeckRepository>,
    ) -> Self {
        Self {
            clock,
            deadline,
            auth,
            decks,
        }
    }

    /// Create a new deck and persist it.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::Unauthorized` without a session,
    /// `DeckServiceError::Deck` for validation failures, or
    /// `DeckServiceError::Storage` if persistence fails.
    pub async fn create_deck(
        &self,
        category: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<DeckId, DeckServiceError> {
        let owner = self.auth.current_user().await?;
        let validated = DeckDraft {
            owner_id: owner,
            category: category.into(),
            title: title.into(),
        }
        .validate(self.clock.now())?;
        let deck_id = self
            .deadline
            .run(self.decks.insert_deck(NewDeckRecord::from(validated)))
            .await?;

        info!(deck_id = %deck_id, user_id = %owner, "deck created");
        Ok(deck_id)
    }

    /// # Errors
    ///
    /// Returns `DeckServiceError::Deck` for a blank title, or
    /// `DeckServiceError::Storage` (`NotFound` for decks the user does not own).
    pub async fn rename_deck(&self, deck_id: DeckId, title: &str) -> Result<(), DeckServiceError> {
        let owner = self.auth.current_user().await?;
        let title = normalize_deck_title(title)?;
        self.deadline
            .run(self.decks.rename_deck(deck_id, owner, &title))
            .await?;
        Ok(())
    }

    /// Delete a deck together with its cards.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::Storage` (`NotFound` for decks the user does not own).
    pub async fn delete_deck(&self, deck_id: DeckId) -> Result<(), DeckServiceError> {
        let owner = self.auth.current_user().await?;
        self.deadline
            .run(self.decks.delete_deck(deck_id, owner))
            .await?;

        info!(deck_id = %deck_id, user_id = %owner, "deck deleted");
        Ok(())
    }

    /// Decks of the session user in creation order.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::Storage` if repository access fails.
    pub async fn list_decks(&self) -> Result<Vec<Deck>, DeckServiceError> {
        let owner = self.auth.current_user().await?;
        let decks = self.deadline.run(self.decks.list_decks(owner)).await?;
        Ok(decks)
    }

    /// Decks grouped by category, groups in first-appearance order.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::Storage` if repository access fails.
    pub async fn decks_by_category(&self) -> Result<Vec<DeckGroup>, DeckServiceError> {
        let mut groups: Vec<DeckGroup> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for deck in self.list_decks().await? {
            let slot = match index.get(deck.category()) {
                Some(slot) => *slot,
                None => {
                    index.insert(deck.category().to_owned(), groups.len());
                    groups.push(DeckGroup {
                        category: deck.category().to_owned(),
                        decks: Vec::new(),
                    });
                    groups.len() - 1
                }
            };
            groups[slot].decks.push(deck);
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use storage::repository::{InMemoryRepository, StorageError};
    use study_core::model::{DeckError, UserId};
    use study_core::time::fixed_clock;

    use crate::auth::SessionAuth;

    fn service(auth: Arc<SessionAuth>) -> DeckService {
        DeckService::new(
            fixed_clock(),
            StoreDeadline::default(),
            auth,
            Arc::new(InMemoryRepository::new()),
        )
    }

    #[tokio::test]
    async fn create_rename_and_list() {
        let service = service(Arc::new(SessionAuth::signed_in(UserId::random())));

        let id = service.create_deck("Langues", " Espagnol ").await.unwrap();
        service.rename_deck(id, "Espagnol A2").await.unwrap();

        let decks = service.list_decks().await.unwrap();
        assert_eq!(decks.len(), 1);
        assert_eq!(decks[0].id(), id);
        assert_eq!(decks[0].title(), "Espagnol A2");
    }

    #[tokio::test]
    async fn blank_labels_are_rejected() {
        let service = service(Arc::new(SessionAuth::signed_in(UserId::random())));

        assert!(matches!(
            service.create_deck("Langues", "  ").await,
            Err(DeckServiceError::Deck(DeckError::EmptyTitle))
        ));
        assert!(matches!(
            service.create_deck("", "Allemand").await,
            Err(DeckServiceError::Deck(DeckError::EmptyCategory))
        ));

        let id = service.create_deck("Langues", "Allemand").await.unwrap();
        assert!(matches!(
            service.rename_deck(id, "").await,
            Err(DeckServiceError::Deck(DeckError::EmptyTitle))
        ));
    }

    #[tokio::test]
    async fn groups_by_category_in_first_appearance_order() {
        let service = service(Arc::new(SessionAuth::signed_in(UserId::random())));
        service.create_deck("Langues", "Espagnol").await.unwrap();
        service.create_deck("Sciences", "Chimie").await.unwrap();
        service.create_deck("Langues", "Italien").await.unwrap();

        let groups = service.decks_by_category().await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category, "Langues");
        assert_eq!(groups[0].decks.len(), 2);
        assert_eq!(groups[1].category, "Sciences");
    }

    #[tokio::test]
    async fn decks_are_scoped_to_the_session_user() {
        let auth = Arc::new(SessionAuth::signed_in(UserId::random()));
        let service = service(auth.clone());
        let id = service.create_deck("Langues", "Espagnol").await.unwrap();

        auth.sign_in(UserId::random());
        assert!(service.list_decks().await.unwrap().is_empty());
        assert!(matches!(
            service.delete_deck(id).await,
            Err(DeckServiceError::Storage(StorageError::NotFound))
        ));

        auth.sign_out();
        assert!(matches!(
            service.list_decks().await,
            Err(DeckServiceError::Unauthorized)
        ));
    }
}
