use study_core::model::{QuizId, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_quiz_row, quiz_id_from_i64};
use crate::repository::{NewQuizRecord, QuizRecord, QuizRepository, QuizUpdate, StorageError};

const SELECT_QUIZ: &str = r"
    SELECT q.id, q.user_id, q.title, q.categ_id, q.questions, q.created_at,
           c.title AS category_title
    FROM quizzes q
    LEFT JOIN categories c ON c.id = q.categ_id
";

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn list_quizzes(&self, owner: UserId) -> Result<Vec<QuizRecord>, StorageError> {
        let sql = format!("{SELECT_QUIZ} WHERE q.user_id = ?1 ORDER BY q.id ASC");
        let rows = sqlx::query(&sql)
            .bind(owner.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(map_quiz_row).collect()
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<QuizRecord>, StorageError> {
        let sql = format!("{SELECT_QUIZ} WHERE q.id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("quiz_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_quiz_row).transpose()
    }

    async fn insert_quiz(&self, quiz: NewQuizRecord) -> Result<QuizId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO quizzes (user_id, title, categ_id, questions, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(quiz.owner_id.to_string())
        .bind(quiz.title)
        .bind(id_to_i64("category_id", quiz.category_id.value())?)
        .bind(quiz.questions)
        .bind(quiz.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        quiz_id_from_i64(res.last_insert_rowid())
    }

    async fn update_quiz(
        &self,
        id: QuizId,
        owner: UserId,
        update: QuizUpdate,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE quizzes
            SET title = ?1, categ_id = ?2, questions = ?3
            WHERE id = ?4 AND user_id = ?5
            ",
        )
        .bind(update.title)
        .bind(id_to_i64("category_id", update.category_id.value())?)
        .bind(update.questions)
        .bind(id_to_i64("quiz_id", id.value())?)
        .bind(owner.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_quiz(&self, id: QuizId, owner: UserId) -> Result<(), StorageError> {
        // quiz_stats rows go with the quiz via ON DELETE CASCADE.
        let res = sqlx::query("DELETE FROM quizzes WHERE id = ?1 AND user_id = ?2")
            .bind(id_to_i64("quiz_id", id.value())?)
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
