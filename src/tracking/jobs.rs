//! The poll jobs behind the six tracker instances.
//!
//! Each job fetches the remote result for one entity, compares it with the
//! last persisted status, writes only on change, emits a telemetry event
//! classifying success vs failure, and reports whether the entity is done.
//! A handle whose query id no longer matches the persisted detail has been
//! superseded by a re-submission and is dropped without a write.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::{PollJob, PollOutcome};
use serde::Serialize;
use crate::ai::status::{
    AdjustmentStatus, BreakdownStatus, ChartStatus, RecommendationStatus, TextAnswerStatus,
};
use crate::ai::AiApi;
use crate::error::Result;
use crate::telemetry::{TelemetryEvent, TelemetrySender};
use crate::threads::model::Adjustment;
use crate::threads::ThreadStorage;

const AI_SERVICE_TAG: &str = "ai_service";

/// Upper-case internal form of a status, as persisted.
fn status_str<S: Serialize>(status: &S) -> String {
    serde_json::to_value(status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn transition_event(
    name: &'static str,
    entity_id: i64,
    query_id: &str,
    status: &str,
    success: bool,
) -> TelemetryEvent {
    let event = TelemetryEvent::new(name)
        .with_properties(json!({
            "entity_id": entity_id.to_string(),
            "query_id": query_id,
            "status": status,
        }))
        .with_service(AI_SERVICE_TAG);
    if success {
        event
    } else {
        event.failure()
    }
}

// ─── Breakdown ───────────────────────────────────────────────────────────────

pub struct BreakdownPollJob {
    pub client: Arc<dyn AiApi>,
    pub store: ThreadStorage,
    pub telemetry: TelemetrySender,
}

#[async_trait]
impl PollJob for BreakdownPollJob {
    async fn poll(&self, response_id: i64, query_id: &str) -> Result<PollOutcome> {
        let result = self.client.fetch_breakdown_result(query_id).await?;
        let row = self.store.get_response(response_id).await?;
        let Some(mut detail) = row.breakdown_detail()? else {
            return Ok(PollOutcome::Finalized);
        };
        if detail.query_id != query_id {
            return Ok(PollOutcome::Finalized);
        }
        if detail.status == result.status {
            return Ok(PollOutcome::InFlight);
        }

        detail.status = result.status;
        detail.error = result.error;
        if let Some(payload) = result.payload {
            detail.description = payload.description;
            detail.steps = payload.steps;
        }
        self.store
            .update_breakdown_detail(response_id, &detail)
            .await?;
        self.telemetry.send(transition_event(
            "breakdown_status_change",
            response_id,
            query_id,
            &status_str(&result.status),
            result.status != BreakdownStatus::Failed,
        ));

        Ok(if result.status.is_terminal() {
            PollOutcome::Finalized
        } else {
            PollOutcome::InFlight
        })
    }
}

// ─── Text answer ─────────────────────────────────────────────────────────────

pub struct TextAnswerPollJob {
    pub client: Arc<dyn AiApi>,
    pub store: ThreadStorage,
    pub telemetry: TelemetrySender,
}

#[async_trait]
impl PollJob for TextAnswerPollJob {
    async fn poll(&self, response_id: i64, query_id: &str) -> Result<PollOutcome> {
        let result = self.client.fetch_text_answer_result(query_id).await?;
        let row = self.store.get_response(response_id).await?;
        let Some(mut detail) = row.answer_detail()? else {
            return Ok(PollOutcome::Finalized);
        };
        if detail.query_id != query_id {
            return Ok(PollOutcome::Finalized);
        }
        if detail.status == result.status {
            return Ok(PollOutcome::InFlight);
        }

        detail.status = result.status;
        detail.error = result.error;
        self.store.update_answer_detail(response_id, &detail).await?;
        self.telemetry.send(transition_event(
            "text_answer_status_change",
            response_id,
            query_id,
            &status_str(&result.status),
            result.status != TextAnswerStatus::Failed,
        ));

        Ok(if result.status.is_terminal() {
            PollOutcome::Finalized
        } else {
            PollOutcome::InFlight
        })
    }
}

// ─── Chart / chart adjustment ────────────────────────────────────────────────

pub struct ChartPollJob {
    pub client: Arc<dyn AiApi>,
    pub store: ThreadStorage,
    pub telemetry: TelemetrySender,
    /// Polls `/v1/chart-adjustments` instead of `/v1/charts` when set.
    pub adjustment: bool,
}

#[async_trait]
impl PollJob for ChartPollJob {
    async fn poll(&self, response_id: i64, query_id: &str) -> Result<PollOutcome> {
        let result = if self.adjustment {
            self.client.fetch_chart_adjustment_result(query_id).await?
        } else {
            self.client.fetch_chart_result(query_id).await?
        };
        let row = self.store.get_response(response_id).await?;
        let Some(mut detail) = row.chart_detail()? else {
            return Ok(PollOutcome::Finalized);
        };
        if detail.query_id != query_id {
            return Ok(PollOutcome::Finalized);
        }
        if detail.status == result.status {
            return Ok(PollOutcome::InFlight);
        }

        detail.status = result.status;
        detail.error = result.error;
        if let Some(payload) = result.payload {
            detail.reasoning = payload.reasoning;
            if payload.chart_schema.is_some() {
                detail.chart_schema = payload.chart_schema;
            }
        }
        self.store.update_chart_detail(response_id, &detail).await?;
        let event = if self.adjustment {
            "chart_adjustment_status_change"
        } else {
            "chart_status_change"
        };
        self.telemetry.send(transition_event(
            event,
            response_id,
            query_id,
            &status_str(&result.status),
            result.status != ChartStatus::Failed,
        ));

        Ok(if result.status.is_terminal() {
            PollOutcome::Finalized
        } else {
            PollOutcome::InFlight
        })
    }
}

// ─── Recommendation questions ────────────────────────────────────────────────

/// Tracked entity is the thread, not a response.
pub struct RecommendationPollJob {
    pub client: Arc<dyn AiApi>,
    pub store: ThreadStorage,
    pub telemetry: TelemetrySender,
}

#[async_trait]
impl PollJob for RecommendationPollJob {
    async fn poll(&self, thread_id: i64, query_id: &str) -> Result<PollOutcome> {
        let result = self
            .client
            .fetch_question_recommendation_result(query_id)
            .await?;
        let thread = self.store.get_thread(thread_id).await?;
        if thread.questions_status()? == Some(result.status) {
            return Ok(PollOutcome::InFlight);
        }

        let questions = result.payload.map(|p| p.questions);
        self.store
            .update_thread_questions(
                thread_id,
                result.status,
                questions.as_deref(),
                result.error.as_ref(),
            )
            .await?;
        self.telemetry.send(transition_event(
            "recommendation_status_change",
            thread_id,
            query_id,
            &status_str(&result.status),
            result.status != RecommendationStatus::Failed,
        ));

        Ok(if result.status.is_terminal() {
            PollOutcome::Finalized
        } else {
            PollOutcome::InFlight
        })
    }
}

// ─── Feedback adjustment ─────────────────────────────────────────────────────

/// Reconciles `/v1/ask-feedbacks` tasks into the adjustment record of the
/// revised response; on FINISHED the first candidate becomes the response's
/// authoritative SQL (write-once).
pub struct FeedbackAdjustmentPollJob {
    pub client: Arc<dyn AiApi>,
    pub store: ThreadStorage,
    pub telemetry: TelemetrySender,
}

#[async_trait]
impl PollJob for FeedbackAdjustmentPollJob {
    async fn poll(&self, response_id: i64, query_id: &str) -> Result<PollOutcome> {
        let result = self.client.fetch_feedback_adjustment_result(query_id).await?;
        let row = self.store.get_response(response_id).await?;
        let Some(Adjustment::Reasoning {
            payload,
            query_id: stored_query_id,
            status,
            ..
        }) = row.adjustment()?
        else {
            return Ok(PollOutcome::Finalized);
        };
        if stored_query_id != query_id {
            return Ok(PollOutcome::Finalized);
        }
        if status == result.status {
            return Ok(PollOutcome::InFlight);
        }

        let adjustment = Adjustment::Reasoning {
            payload,
            query_id: stored_query_id,
            status: result.status,
            error: result.error,
        };
        self.store.update_adjustment(response_id, &adjustment).await?;
        if result.status == AdjustmentStatus::Finished {
            if let Some(candidate) = result.candidates.first() {
                self.store.set_response_sql(response_id, &candidate.sql).await?;
            }
        }
        self.telemetry.send(transition_event(
            "feedback_adjustment_status_change",
            response_id,
            query_id,
            &status_str(&result.status),
            result.status != AdjustmentStatus::Failed,
        ));

        Ok(if result.status.is_terminal() {
            PollOutcome::Finalized
        } else {
            PollOutcome::InFlight
        })
    }
}
