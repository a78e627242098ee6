//! Adjustment flows — revisions of a prior response.
//!
//! Every adjustment creates a NEW response pointing back at the original
//! through `original_thread_response_id`. History is append-only; the
//! original row is never rewritten.

use serde_json::Value;

use crate::ai::status::AdjustmentStatus;
use crate::ai::AiApi;
use crate::ai::types::{ChartAdjustmentRequest, FeedbackAdjustmentRequest};
use crate::error::{Result, ServiceError};
use crate::threads::model::{Adjustment, AdjustmentPayload, ChartDetail, ThreadResponseRow};

use super::service::{require_sql, AskingService};

impl AskingService {
    /// Submit a chart-adjustment task carrying the prior chart schema. The
    /// chart detail itself is the unit being revised, so this mutates the
    /// response's chart detail (new query id supersedes the old one) rather
    /// than creating a new response.
    pub async fn adjust_thread_response_chart(
        &self,
        response_id: i64,
        adjustment_option: Value,
    ) -> Result<ThreadResponseRow> {
        let response = self.store.get_response(response_id).await?;
        let thread = self.store.get_thread(response.thread_id).await?;
        require_sql(&response)?;
        let chart_schema = response
            .chart_detail()?
            .and_then(|d| d.chart_schema)
            .ok_or_else(|| {
                ServiceError::Validation("response has no chart to adjust".into())
            })?;

        let query_id = self
            .client
            .create_chart_adjustment(&ChartAdjustmentRequest {
                query: response.question.clone(),
                sql: response.sql.clone(),
                project_id: thread.project_id.to_string(),
                adjustment_option,
                chart_schema,
            })
            .await?;
        let detail = ChartDetail::pending(query_id.clone(), true);
        self.store.update_chart_detail(response_id, &detail).await?;
        self.trackers.chart_adjustment.add_task(response_id, query_id);
        self.store.get_response(response_id).await
    }

    /// Record a manual SQL override as a new response linked to the
    /// original. No remote task is involved; the override is authoritative
    /// immediately.
    pub async fn adjust_thread_response_with_sql(
        &self,
        response_id: i64,
        sql: &str,
    ) -> Result<ThreadResponseRow> {
        if sql.trim().is_empty() {
            return Err(ServiceError::Validation("adjusted SQL must not be empty".into()));
        }
        let original = self.store.get_response(response_id).await?;
        let adjustment = Adjustment::Sql {
            payload: AdjustmentPayload {
                original_thread_response_id: response_id,
                sql: Some(sql.to_string()),
                tweaks: Vec::new(),
            },
        };
        self.store
            .create_response(
                original.thread_id,
                &original.question,
                sql,
                None,
                Some(&adjustment),
            )
            .await
    }

    /// Submit a reasoning-feedback adjustment: a new response is created in
    /// the pending state and handed to the feedback-adjustment tracker,
    /// which fills in the regenerated SQL once the remote task finishes.
    pub async fn adjust_thread_response_answer(
        &self,
        response_id: i64,
        tweaks: Vec<String>,
    ) -> Result<ThreadResponseRow> {
        if tweaks.iter().all(|t| t.trim().is_empty()) {
            return Err(ServiceError::Validation("no adjustment feedback given".into()));
        }
        let original = self.store.get_response(response_id).await?;
        let thread = self.store.get_thread(original.thread_id).await?;
        require_sql(&original)?;

        let query_id = self
            .client
            .create_feedback_adjustment(&FeedbackAdjustmentRequest {
                question: original.question.clone(),
                sql: original.sql.clone(),
                project_id: thread.project_id.to_string(),
                tweaks: tweaks.clone(),
            })
            .await?;
        let adjustment = Adjustment::Reasoning {
            payload: AdjustmentPayload {
                original_thread_response_id: response_id,
                sql: None,
                tweaks,
            },
            query_id: query_id.clone(),
            status: AdjustmentStatus::Understanding,
            error: None,
        };
        let new_response = self
            .store
            .create_response(
                original.thread_id,
                &original.question,
                "",
                None,
                Some(&adjustment),
            )
            .await?;
        self.trackers
            .feedback_adjustment
            .add_task(new_response.id, query_id);
        Ok(new_response)
    }
}
