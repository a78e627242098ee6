//! Orchestration façade over the asking flows.
//!
//! Validates preconditions, creates conversation entities, submits remote
//! tasks, registers them with the matching background tracker, and exposes
//! the synchronous read/cancel operations. Errors bubble to the caller
//! after telemetry tagging.

use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::ai::types::{AskRequest, AskResult, BreakdownRequest, ChartRequest, RecommendationRequest, SqlPair, TextAnswerRequest};
use crate::ai::AiApi;
use crate::error::{Result, ServiceError};
use crate::preview::QueryRunner;
use crate::tasks::TaskBindingStorage;
use crate::telemetry::{TelemetryEvent, TelemetrySender};
use crate::threads::model::{
    AnswerDetail, BreakdownDetail, ChartDetail, ThreadResponseRow, ThreadRow,
};
use crate::threads::ThreadStorage;
use crate::tracking::TrackerSet;

use super::cte::construct_cte_sql;

/// How many prior exchanges are persisted as candidate history.
const HISTORY_FETCH_LIMIT: i64 = 10;
/// How many of those are sent to the AI service with a new ask.
const HISTORY_SEND_LIMIT: usize = 5;
/// How many prior questions scope a recommendation run.
const RECOMMENDATION_QUESTION_LIMIT: i64 = 5;
const RECOMMENDATION_MAX_QUESTIONS: u32 = 5;
const RECOMMENDATION_MAX_CATEGORIES: u32 = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAskingTaskInput {
    pub question: String,
    pub project_id: i64,
    /// Present when the question continues an existing thread.
    pub thread_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateThreadInput {
    pub project_id: i64,
    pub question: String,
    /// Authoritative SQL candidate chosen for the first response.
    #[serde(default)]
    pub sql: String,
    /// Asking task that produced the SQL, for binding linkage.
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateThreadResponseInput {
    pub question: String,
    #[serde(default)]
    pub sql: String,
    pub task_id: Option<String>,
}

pub struct AskingService {
    pub(crate) client: Arc<dyn AiApi>,
    pub(crate) store: ThreadStorage,
    pub(crate) bindings: TaskBindingStorage,
    pub(crate) trackers: TrackerSet,
    pub(crate) telemetry: TelemetrySender,
    pub(crate) runner: Arc<dyn QueryRunner>,
    pub(crate) default_preview_limit: u64,
}

impl AskingService {
    pub fn new(
        client: Arc<dyn AiApi>,
        store: ThreadStorage,
        bindings: TaskBindingStorage,
        trackers: TrackerSet,
        telemetry: TelemetrySender,
        runner: Arc<dyn QueryRunner>,
        default_preview_limit: u64,
    ) -> Self {
        Self {
            client,
            store,
            bindings,
            trackers,
            telemetry,
            runner,
            default_preview_limit,
        }
    }

    // ─── Asking tasks ────────────────────────────────────────────────────────

    /// Submit a SQL-generation task. When the question continues a thread,
    /// prior exchanges with non-empty SQL (newest first, bounded) are sent
    /// as generation context.
    pub async fn create_asking_task(&self, input: CreateAskingTaskInput) -> Result<String> {
        let histories = match input.thread_id {
            Some(thread_id) => self.resolve_histories(thread_id).await?,
            None => Vec::new(),
        };
        let query_id = self
            .client
            .create_ask(&AskRequest {
                query: input.question.clone(),
                project_id: input.project_id.to_string(),
                histories,
            })
            .await?;
        self.bindings
            .create(&query_id, input.thread_id, None, &input.question, None)
            .await?;
        self.telemetry.send(
            TelemetryEvent::new("asking_task_created")
                .with_properties(json!({ "query_id": query_id }))
                .with_service("ai_service"),
        );
        Ok(query_id)
    }

    /// Re-submit the original question of an existing response, recording
    /// the superseded task id for the audit trail.
    pub async fn rerun_asking_task(&self, response_id: i64) -> Result<String> {
        let response = self.store.get_response(response_id).await?;
        let thread = self.store.get_thread(response.thread_id).await?;
        let histories = self.resolve_histories(response.thread_id).await?;
        let query_id = self
            .client
            .create_ask(&AskRequest {
                query: response.question.clone(),
                project_id: thread.project_id.to_string(),
                histories,
            })
            .await?;
        self.bindings
            .create(
                &query_id,
                Some(response.thread_id),
                Some(response_id),
                &response.question,
                response.asking_task_id.as_deref(),
            )
            .await?;
        Ok(query_id)
    }

    /// Request remote cancellation. Fire-and-forget semantics: the task
    /// stays wherever it is tracked until a poll observes the terminal
    /// STOPPED status.
    pub async fn cancel_asking_task(&self, query_id: &str) -> Result<()> {
        if let Err(e) = self.client.cancel_ask(query_id).await {
            self.telemetry.send(
                TelemetryEvent::new("asking_task_cancel")
                    .with_properties(json!({ "query_id": query_id, "error": e.to_string() }))
                    .with_service("ai_service")
                    .failure(),
            );
            return Err(e);
        }
        self.telemetry.send(
            TelemetryEvent::new("asking_task_cancel")
                .with_properties(json!({ "query_id": query_id }))
                .with_service("ai_service"),
        );
        Ok(())
    }

    /// Read the current remote state of an asking task.
    pub async fn get_asking_task(&self, query_id: &str) -> Result<AskResult> {
        self.client.fetch_ask_result(query_id).await
    }

    async fn resolve_histories(&self, thread_id: i64) -> Result<Vec<SqlPair>> {
        let responses = self
            .store
            .latest_responses_with_sql(thread_id, HISTORY_FETCH_LIMIT)
            .await?;
        Ok(responses
            .into_iter()
            .take(HISTORY_SEND_LIMIT)
            .map(|r| SqlPair {
                question: r.question,
                sql: r.sql,
            })
            .collect())
    }

    // ─── Threads ─────────────────────────────────────────────────────────────

    /// Create a thread plus its first response. The thread summary is the
    /// first question. When a task id is supplied the binding is linked to
    /// the new entities.
    pub async fn create_thread(&self, input: CreateThreadInput) -> Result<ThreadRow> {
        let thread = self
            .store
            .create_thread(input.project_id, &input.question)
            .await?;
        let response = self
            .store
            .create_response(
                thread.id,
                &input.question,
                &input.sql,
                input.task_id.as_deref(),
                None,
            )
            .await?;
        if let Some(task_id) = &input.task_id {
            self.bindings
                .link(task_id, thread.id, Some(response.id))
                .await?;
        }
        Ok(thread)
    }

    pub async fn create_thread_response(
        &self,
        thread_id: i64,
        input: CreateThreadResponseInput,
    ) -> Result<ThreadResponseRow> {
        // Precondition: the thread must exist.
        self.store.get_thread(thread_id).await?;
        let response = self
            .store
            .create_response(
                thread_id,
                &input.question,
                &input.sql,
                input.task_id.as_deref(),
                None,
            )
            .await?;
        if let Some(task_id) = &input.task_id {
            self.bindings
                .link(task_id, thread_id, Some(response.id))
                .await?;
        }
        Ok(response)
    }

    pub async fn get_thread(&self, id: i64) -> Result<ThreadRow> {
        self.store.get_thread(id).await
    }

    pub async fn list_threads(&self, project_id: i64) -> Result<Vec<ThreadRow>> {
        self.store.list_threads(project_id).await
    }

    pub async fn list_thread_responses(&self, thread_id: i64) -> Result<Vec<ThreadResponseRow>> {
        self.store.get_thread(thread_id).await?;
        self.store.list_responses(thread_id).await
    }

    pub async fn get_response(&self, id: i64) -> Result<ThreadResponseRow> {
        self.store.get_response(id).await
    }

    pub async fn update_thread_summary(&self, id: i64, summary: &str) -> Result<ThreadRow> {
        if summary.trim().is_empty() {
            return Err(ServiceError::Validation("summary must not be empty".into()));
        }
        self.store.update_thread_summary(id, summary).await
    }

    pub async fn delete_thread(&self, id: i64) -> Result<()> {
        self.store.delete_thread(id).await
    }

    // ─── Sub-result generation ───────────────────────────────────────────────

    /// Submit a breakdown task for the response's SQL and start tracking it.
    /// The previous breakdown detail, if any, is overwritten wholesale.
    pub async fn generate_thread_response_breakdown(
        &self,
        response_id: i64,
    ) -> Result<ThreadResponseRow> {
        let response = self.store.get_response(response_id).await?;
        let thread = self.store.get_thread(response.thread_id).await?;
        require_sql(&response)?;

        let query_id = self
            .client
            .create_breakdown(&BreakdownRequest {
                query: response.question.clone(),
                sql: response.sql.clone(),
                project_id: thread.project_id.to_string(),
            })
            .await?;
        let detail = BreakdownDetail::pending(query_id.clone());
        self.store
            .update_breakdown_detail(response_id, &detail)
            .await?;
        self.trackers.breakdown.add_task(response_id, query_id);
        self.store.get_response(response_id).await
    }

    /// Submit a narrative text-answer task and start tracking it.
    pub async fn generate_thread_response_answer(
        &self,
        response_id: i64,
    ) -> Result<ThreadResponseRow> {
        let response = self.store.get_response(response_id).await?;
        let thread = self.store.get_thread(response.thread_id).await?;
        require_sql(&response)?;

        let query_id = self
            .client
            .create_text_answer(&TextAnswerRequest {
                query: response.question.clone(),
                sql: response.sql.clone(),
                project_id: thread.project_id.to_string(),
                sql_data: None,
            })
            .await?;
        let detail = AnswerDetail::pending(query_id.clone());
        self.store.update_answer_detail(response_id, &detail).await?;
        self.trackers.text_answer.add_task(response_id, query_id);
        self.store.get_response(response_id).await
    }

    /// Submit a chart-generation task and start tracking it.
    pub async fn generate_thread_response_chart(
        &self,
        response_id: i64,
    ) -> Result<ThreadResponseRow> {
        let response = self.store.get_response(response_id).await?;
        let thread = self.store.get_thread(response.thread_id).await?;
        require_sql(&response)?;

        let query_id = self
            .client
            .create_chart(&ChartRequest {
                query: response.question.clone(),
                sql: response.sql.clone(),
                project_id: thread.project_id.to_string(),
            })
            .await?;
        let detail = ChartDetail::pending(query_id.clone(), false);
        self.store.update_chart_detail(response_id, &detail).await?;
        self.trackers.chart.add_task(response_id, query_id);
        self.store.get_response(response_id).await
    }

    // ─── Previews ────────────────────────────────────────────────────────────

    /// Execute the response's SQL against the live data source.
    pub async fn preview_data(
        &self,
        response_id: i64,
        limit: Option<u64>,
    ) -> Result<serde_json::Value> {
        let response = self.store.get_response(response_id).await?;
        require_sql(&response)?;
        self.run_preview(&response.sql, limit).await
    }

    /// Execute the CTE assembled from the response's breakdown steps,
    /// optionally truncated at `step_ix`.
    pub async fn preview_breakdown_data(
        &self,
        response_id: i64,
        step_ix: Option<usize>,
        limit: Option<u64>,
    ) -> Result<serde_json::Value> {
        let response = self.store.get_response(response_id).await?;
        let detail = response
            .breakdown_detail()?
            .ok_or_else(|| ServiceError::Validation("response has no breakdown".into()))?;
        let sql = construct_cte_sql(&detail.steps, step_ix)?;
        self.run_preview(&sql, limit).await
    }

    async fn run_preview(&self, sql: &str, limit: Option<u64>) -> Result<serde_json::Value> {
        let limit = limit.unwrap_or(self.default_preview_limit);
        match self.runner.preview(sql, limit).await {
            Ok(rows) => Ok(rows),
            Err(e) => {
                self.telemetry.send(
                    TelemetryEvent::new("preview_data")
                        .with_properties(json!({ "error": e.to_string() }))
                        .with_service("engine")
                        .failure(),
                );
                Err(e)
            }
        }
    }

    // ─── Recommendation questions ────────────────────────────────────────────

    /// Kick off recommendation-question generation for a thread. A no-op
    /// when the thread is already generating (checked against the tracker's
    /// active set) — duplicate requests never double-submit.
    pub async fn generate_thread_recommendation_questions(&self, thread_id: i64) -> Result<()> {
        let thread = self.store.get_thread(thread_id).await?;
        if self.trackers.recommendation.contains(thread_id) {
            info!(thread_id, "recommendation generation already running, skipping");
            return Ok(());
        }

        let questions = self
            .store
            .latest_questions(thread_id, RECOMMENDATION_QUESTION_LIMIT)
            .await?;
        self.store.clear_thread_questions(thread_id).await?;
        let query_id = self
            .client
            .create_question_recommendation(&RecommendationRequest {
                project_id: thread.project_id.to_string(),
                previous_questions: questions,
                max_questions: RECOMMENDATION_MAX_QUESTIONS,
                max_categories: RECOMMENDATION_MAX_CATEGORIES,
            })
            .await?;
        self.store
            .update_thread_questions(
                thread_id,
                crate::ai::status::RecommendationStatus::Generating,
                None,
                None,
            )
            .await?;
        self.trackers.recommendation.add_task(thread_id, query_id);
        Ok(())
    }
}

pub(crate) fn require_sql(response: &ThreadResponseRow) -> Result<()> {
    if response.sql.trim().is_empty() {
        return Err(ServiceError::Validation(format!(
            "thread response {} has no SQL",
            response.id
        )));
    }
    Ok(())
}
