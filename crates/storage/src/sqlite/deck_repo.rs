use study_core::model::{Deck, DeckId, UserId, normalize_deck_title};

use super::SqliteRepository;
use super::mapping::{db_err, deck_id_from_i64, id_to_i64, map_deck_row, ser};
use crate::repository::{DeckRepository, NewDeckRecord, StorageError};

#[async_trait::async_trait]
impl DeckRepository for SqliteRepository {
    async fn insert_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO decks (user_id, category, title, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(deck.owner_id.to_string())
        .bind(deck.category)
        .bind(deck.title)
        .bind(deck.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        deck_id_from_i64(res.last_insert_rowid())
    }

    async fn get_deck(&self, id: DeckId, owner: UserId) -> Result<Option<Deck>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, category, title, created_at
            FROM decks
            WHERE id = ?1 AND user_id = ?2
            ",
        )
        .bind(id_to_i64("deck_id", id.value())?)
        .bind(owner.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_deck_row).transpose()
    }

    async fn list_decks(&self, owner: UserId) -> Result<Vec<Deck>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, category, title, created_at
            FROM decks
            WHERE user_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(owner.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_deck_row).collect()
    }

    async fn rename_deck(
        &self,
        id: DeckId,
        owner: UserId,
        title: &str,
    ) -> Result<(), StorageError> {
        let title = normalize_deck_title(title).map_err(ser)?;
        let res = sqlx::query("UPDATE decks SET title = ?1 WHERE id = ?2 AND user_id = ?3")
            .bind(title)
            .bind(id_to_i64("deck_id", id.value())?)
            .bind(owner.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_deck(&self, id: DeckId, owner: UserId) -> Result<(), StorageError> {
        // cards go with the deck via ON DELETE CASCADE.
        let res = sqlx::query("DELETE FROM decks WHERE id = ?1 AND user_id = ?2")
            .bind(id_to_i64("deck_id", id.value())?)
            .bind(owner.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
