//! Task binding repository.
//!
//! Maps an externally issued query id to the thread/response it ultimately
//! must update, so a cancelled-and-rerun flow can supersede a previous
//! binding without losing the audit trail (`previous_query_id`).

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{Result, ServiceError};
use crate::threads::model::AskingTaskRow;

#[derive(Clone)]
pub struct TaskBindingStorage {
    pool: SqlitePool,
}

impl TaskBindingStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        query_id: &str,
        thread_id: Option<i64>,
        response_id: Option<i64>,
        question: &str,
        previous_query_id: Option<&str>,
    ) -> Result<AskingTaskRow> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO asking_tasks
             (query_id, thread_id, response_id, question, previous_query_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(query_id)
        .bind(thread_id)
        .bind(response_id)
        .bind(question)
        .bind(previous_query_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.get(query_id).await
    }

    pub async fn find(&self, query_id: &str) -> Result<Option<AskingTaskRow>> {
        Ok(sqlx::query_as("SELECT * FROM asking_tasks WHERE query_id = ?")
            .bind(query_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn get(&self, query_id: &str) -> Result<AskingTaskRow> {
        self.find(query_id)
            .await?
            .ok_or_else(|| ServiceError::TaskNotFound(query_id.to_string()))
    }

    /// Link a submitted task to the thread/response it must update. Called
    /// when the conversation entity is created after the task was submitted.
    pub async fn link(
        &self,
        query_id: &str,
        thread_id: i64,
        response_id: Option<i64>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE asking_tasks SET thread_id = ?, response_id = ? WHERE query_id = ?",
        )
        .bind(thread_id)
        .bind(response_id)
        .bind(query_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::TaskNotFound(query_id.to_string()));
        }
        Ok(())
    }
}
