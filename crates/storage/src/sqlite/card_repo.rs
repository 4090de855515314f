use study_core::model::{Card, CardId, DeckId, ValidatedCard};

use super::SqliteRepository;
use super::mapping::{card_id_from_i64, db_err, id_to_i64, map_card_row};
use crate::repository::{CardRepository, StorageError};

#[async_trait::async_trait]
impl CardRepository for SqliteRepository {
    async fn insert_card(&self, card: &ValidatedCard) -> Result<CardId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO cards (deck_id, front, back, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(id_to_i64("deck_id", card.deck_id.value())?)
        .bind(&card.front)
        .bind(&card.back)
        .bind(card.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        card_id_from_i64(res.last_insert_rowid())
    }

    async fn list_cards(&self, deck_id: DeckId) -> Result<Vec<Card>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, deck_id, front, back, created_at
            FROM cards
            WHERE deck_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("deck_id", deck_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_card_row).collect()
    }

    async fn delete_card(&self, deck_id: DeckId, card_id: CardId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM cards WHERE id = ?1 AND deck_id = ?2")
            .bind(id_to_i64("card_id", card_id.value())?)
            .bind(id_to_i64("deck_id", deck_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
