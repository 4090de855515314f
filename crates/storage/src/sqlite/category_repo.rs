use study_core::model::{Category, CategoryId};

use super::SqliteRepository;
use super::mapping::{category_id_from_i64, db_err, id_to_i64, map_category_row};
use crate::repository::{CategoryRepository, StorageError};

#[async_trait::async_trait]
impl CategoryRepository for SqliteRepository {
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let rows = sqlx::query("SELECT id, title FROM categories ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(map_category_row).collect()
    }

    async fn insert_category(&self, title: &str) -> Result<CategoryId, StorageError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StorageError::Serialization(
                "category title cannot be empty".into(),
            ));
        }

        let res = sqlx::query("INSERT INTO categories (title) VALUES (?1)")
            .bind(title)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        category_id_from_i64(res.last_insert_rowid())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id_to_i64("category_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
