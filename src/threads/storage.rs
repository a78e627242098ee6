//! Repository for threads and thread responses over the shared SQLite pool.

use chrono::Utc;
use sqlx::SqlitePool;

use super::model::{
    Adjustment, AnswerDetail, BreakdownDetail, ChartDetail, ThreadResponseRow, ThreadRow,
};
use crate::ai::status::RecommendationStatus;
use crate::ai::types::{RecommendedQuestion, WireError};
use crate::error::{Result, ServiceError};
use crate::storage::QUERY_TIMEOUT;

/// Execute a future with the standard query timeout.
async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::DatabaseTimeout(QUERY_TIMEOUT.as_secs())),
    }
}

#[derive(Clone)]
pub struct ThreadStorage {
    pool: SqlitePool,
}

impl ThreadStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ─── Threads ─────────────────────────────────────────────────────────────

    pub async fn create_thread(&self, project_id: i64, summary: &str) -> Result<ThreadRow> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO threads (project_id, summary, created_at, updated_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(project_id)
        .bind(summary)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        let id = result.last_insert_rowid();
        self.get_thread(id).await
    }

    pub async fn find_thread(&self, id: i64) -> Result<Option<ThreadRow>> {
        Ok(sqlx::query_as("SELECT * FROM threads WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Like [`find_thread`] but raises the not-found error directly.
    pub async fn get_thread(&self, id: i64) -> Result<ThreadRow> {
        self.find_thread(id)
            .await?
            .ok_or(ServiceError::NotFound("thread", id))
    }

    /// All threads of a project, all-time descending order.
    pub async fn list_threads(&self, project_id: i64) -> Result<Vec<ThreadRow>> {
        with_timeout(async {
            Ok(
                sqlx::query_as("SELECT * FROM threads WHERE project_id = ? ORDER BY id DESC")
                    .bind(project_id)
                    .fetch_all(&self.pool)
                    .await?,
            )
        })
        .await
    }

    pub async fn update_thread_summary(&self, id: i64, summary: &str) -> Result<ThreadRow> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE threads SET summary = ?, updated_at = ? WHERE id = ?")
            .bind(summary)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("thread", id));
        }
        self.get_thread(id).await
    }

    /// Tracker write path for the recommendation flow. Passing `None` for
    /// `questions` leaves the stored list untouched (status-only change).
    pub async fn update_thread_questions(
        &self,
        id: i64,
        status: RecommendationStatus,
        questions: Option<&[RecommendedQuestion]>,
        error: Option<&WireError>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let status_raw = serde_json::to_value(status)?
            .as_str()
            .unwrap_or_default()
            .to_string();
        let error_raw = error.map(serde_json::to_string).transpose()?;
        let result = match questions {
            Some(qs) => {
                let questions_raw = serde_json::to_string(qs)?;
                sqlx::query(
                    "UPDATE threads SET questions = ?, questions_status = ?, questions_error = ?,
                     updated_at = ? WHERE id = ?",
                )
                .bind(questions_raw)
                .bind(&status_raw)
                .bind(&error_raw)
                .bind(&now)
                .bind(id)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "UPDATE threads SET questions_status = ?, questions_error = ?, updated_at = ?
                     WHERE id = ?",
                )
                .bind(&status_raw)
                .bind(&error_raw)
                .bind(&now)
                .bind(id)
                .execute(&self.pool)
                .await?
            }
        };
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("thread", id));
        }
        Ok(())
    }

    /// Clear stale recommendations before a regeneration run.
    pub async fn clear_thread_questions(&self, id: i64) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE threads SET questions = NULL, questions_status = NULL,
             questions_error = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a thread; responses cascade via the foreign key.
    pub async fn delete_thread(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM threads WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("thread", id));
        }
        Ok(())
    }

    // ─── Responses ───────────────────────────────────────────────────────────

    pub async fn create_response(
        &self,
        thread_id: i64,
        question: &str,
        sql: &str,
        asking_task_id: Option<&str>,
        adjustment: Option<&Adjustment>,
    ) -> Result<ThreadResponseRow> {
        let now = Utc::now().to_rfc3339();
        let adjustment_raw = adjustment.map(serde_json::to_string).transpose()?;
        let result = sqlx::query(
            "INSERT INTO thread_responses
             (thread_id, question, sql, asking_task_id, adjustment, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(thread_id)
        .bind(question)
        .bind(sql)
        .bind(asking_task_id)
        .bind(adjustment_raw)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.get_response(result.last_insert_rowid()).await
    }

    pub async fn find_response(&self, id: i64) -> Result<Option<ThreadResponseRow>> {
        Ok(sqlx::query_as("SELECT * FROM thread_responses WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn get_response(&self, id: i64) -> Result<ThreadResponseRow> {
        self.find_response(id)
            .await?
            .ok_or(ServiceError::NotFound("thread response", id))
    }

    /// All responses of a thread, oldest first.
    pub async fn list_responses(&self, thread_id: i64) -> Result<Vec<ThreadResponseRow>> {
        with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT * FROM thread_responses WHERE thread_id = ? ORDER BY id ASC",
            )
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await?)
        })
        .await
    }

    /// Prior-turn history: the last `limit` responses with non-empty SQL,
    /// newest first.
    pub async fn latest_responses_with_sql(
        &self,
        thread_id: i64,
        limit: i64,
    ) -> Result<Vec<ThreadResponseRow>> {
        Ok(sqlx::query_as(
            "SELECT * FROM thread_responses
             WHERE thread_id = ? AND sql != ''
             ORDER BY id DESC LIMIT ?",
        )
        .bind(thread_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Last `limit` questions of a thread, descending id order (used to
    /// scope recommendation generation).
    pub async fn latest_questions(&self, thread_id: i64, limit: i64) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT question FROM thread_responses
             WHERE thread_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(thread_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(q,)| q).collect())
    }

    /// Choose the authoritative SQL candidate for a response. The column is
    /// write-once: the update only applies while `sql` is still empty.
    /// Returns false when the response already had its SQL chosen.
    pub async fn set_response_sql(&self, id: i64, sql: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE thread_responses SET sql = ?, updated_at = ? WHERE id = ? AND sql = ''",
        )
        .bind(sql)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ─── Detail updates (tracker write paths) ────────────────────────────────

    pub async fn update_breakdown_detail(
        &self,
        response_id: i64,
        detail: &BreakdownDetail,
    ) -> Result<()> {
        self.write_detail(response_id, "breakdown_detail", serde_json::to_string(detail)?)
            .await
    }

    pub async fn update_answer_detail(
        &self,
        response_id: i64,
        detail: &AnswerDetail,
    ) -> Result<()> {
        self.write_detail(response_id, "answer_detail", serde_json::to_string(detail)?)
            .await
    }

    pub async fn update_chart_detail(&self, response_id: i64, detail: &ChartDetail) -> Result<()> {
        self.write_detail(response_id, "chart_detail", serde_json::to_string(detail)?)
            .await
    }

    pub async fn update_adjustment(&self, response_id: i64, adjustment: &Adjustment) -> Result<()> {
        self.write_detail(response_id, "adjustment", serde_json::to_string(adjustment)?)
            .await
    }

    async fn write_detail(&self, response_id: i64, column: &str, raw: String) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        // Column names come from the fixed call sites above, never from input.
        let stmt =
            format!("UPDATE thread_responses SET {column} = ?, updated_at = ? WHERE id = ?");
        let result = sqlx::query(&stmt)
            .bind(raw)
            .bind(&now)
            .bind(response_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("thread response", response_id));
        }
        Ok(())
    }
}
