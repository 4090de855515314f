use std::str::FromStr;

use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use study_core::model::{
    AttemptStats, Card, CardId, Category, CategoryId, Deck, DeckId, QuizId, UserId,
};

use crate::repository::{QuizRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Map a driver error, keeping constraint failures distinguishable.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_foreign_key_violation() || db.is_unique_violation() || db.is_check_violation() {
            return StorageError::Conflict(db.message().to_owned());
        }
    }
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

pub(crate) fn category_id_from_i64(v: i64) -> Result<CategoryId, StorageError> {
    Ok(CategoryId::new(i64_to_u64("category_id", v)?))
}

pub(crate) fn deck_id_from_i64(v: i64) -> Result<DeckId, StorageError> {
    Ok(DeckId::new(i64_to_u64("deck_id", v)?))
}

pub(crate) fn card_id_from_i64(v: i64) -> Result<CardId, StorageError> {
    Ok(CardId::new(i64_to_u64("card_id", v)?))
}

pub(crate) fn user_id_from_str(s: &str) -> Result<UserId, StorageError> {
    UserId::from_str(s).map_err(ser)
}

pub(crate) fn map_quiz_row(row: &SqliteRow) -> Result<QuizRecord, StorageError> {
    Ok(QuizRecord {
        id: quiz_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        owner_id: user_id_from_str(&row.try_get::<String, _>("user_id").map_err(ser)?)?,
        title: row.try_get("title").map_err(ser)?,
        category_id: row
            .try_get::<Option<i64>, _>("categ_id")
            .map_err(ser)?
            .map(category_id_from_i64)
            .transpose()?,
        category_title: row.try_get("category_title").map_err(ser)?,
        questions: row.try_get("questions").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_stats_row(row: &SqliteRow) -> Result<AttemptStats, StorageError> {
    let progress: i64 = row.try_get("progress").map_err(ser)?;
    let progress = u8::try_from(progress)
        .map_err(|_| StorageError::Serialization(format!("invalid progress: {progress}")))?;
    let try_number: i64 = row.try_get("try_number").map_err(ser)?;
    let try_number = u32::try_from(try_number)
        .map_err(|_| StorageError::Serialization(format!("invalid try_number: {try_number}")))?;

    AttemptStats::from_persisted(
        quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?,
        user_id_from_str(&row.try_get::<String, _>("user_id").map_err(ser)?)?,
        progress,
        try_number,
        row.try_get("last_tried").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_category_row(row: &SqliteRow) -> Result<Category, StorageError> {
    Category::new(
        category_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_deck_row(row: &SqliteRow) -> Result<Deck, StorageError> {
    Deck::new(
        deck_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_str(&row.try_get::<String, _>("user_id").map_err(ser)?)?,
        row.try_get::<String, _>("category").map_err(ser)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_card_row(row: &SqliteRow) -> Result<Card, StorageError> {
    Ok(Card {
        id: card_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        deck_id: deck_id_from_i64(row.try_get::<i64, _>("deck_id").map_err(ser)?)?,
        front: row.try_get("front").map_err(ser)?,
        back: row.try_get("back").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}
