use study_core::model::{AttemptStats, QuizId, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_stats_row};
use crate::repository::{StatsRepository, StorageError};

#[async_trait::async_trait]
impl StatsRepository for SqliteRepository {
    async fn get_stats(
        &self,
        quiz_id: QuizId,
        user_id: UserId,
    ) -> Result<Option<AttemptStats>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT quiz_id, user_id, progress, try_number, last_tried
            FROM quiz_stats
            WHERE quiz_id = ?1 AND user_id = ?2
            ",
        )
        .bind(id_to_i64("quiz_id", quiz_id.value())?)
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_stats_row).transpose()
    }

    async fn list_stats(
        &self,
        user_id: UserId,
        quiz_ids: &[QuizId],
    ) -> Result<Vec<AttemptStats>, StorageError> {
        if quiz_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (0..quiz_ids.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT quiz_id, user_id, progress, try_number, last_tried
             FROM quiz_stats
             WHERE user_id = ?1 AND quiz_id IN ({placeholders})
             ORDER BY quiz_id ASC"
        );

        let mut query = sqlx::query(&sql).bind(user_id.to_string());
        for id in quiz_ids {
            query = query.bind(id_to_i64("quiz_id", id.value())?);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(map_stats_row).collect()
    }

    async fn upsert_stats(&self, stats: &AttemptStats) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO quiz_stats (quiz_id, user_id, progress, try_number, last_tried)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (quiz_id, user_id) DO UPDATE SET
                progress = excluded.progress,
                try_number = excluded.try_number,
                last_tried = excluded.last_tried
            ",
        )
        .bind(id_to_i64("quiz_id", stats.quiz_id.value())?)
        .bind(stats.user_id.to_string())
        .bind(i64::from(stats.latest_score_percent()))
        .bind(i64::from(stats.attempt_count()))
        .bind(stats.last_attempt_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
