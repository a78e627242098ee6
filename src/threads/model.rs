//! Conversation aggregate: threads, thread responses, and the detail
//! sub-records the background trackers reconcile.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ai::status::{
    AdjustmentStatus, BreakdownStatus, ChartStatus, RecommendationStatus, TextAnswerStatus,
};
use crate::ai::types::{BreakdownStep, RecommendedQuestion, WireError};
use crate::error::Result;

// ─── Rows ────────────────────────────────────────────────────────────────────

/// A conversation thread. Owns zero or more responses; deleting a thread
/// cascades to them.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ThreadRow {
    pub id: i64,
    pub project_id: i64,
    pub summary: String,
    /// JSON array of [`RecommendedQuestion`], set by the recommendation tracker.
    pub questions: Option<String>,
    /// Persisted [`RecommendationStatus`] (upper-case), NULL before the first run.
    pub questions_status: Option<String>,
    /// JSON [`WireError`] when the last recommendation run failed.
    pub questions_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ThreadRow {
    pub fn questions(&self) -> Result<Vec<RecommendedQuestion>> {
        match &self.questions {
            Some(raw) => Ok(serde_json::from_str(raw)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn questions_status(&self) -> Result<Option<RecommendationStatus>> {
        match &self.questions_status {
            Some(raw) => RecommendationStatus::parse_wire(raw).map(Some),
            None => Ok(None),
        }
    }
}

/// One question/answer exchange of a thread.
///
/// `sql` is immutable once the authoritative candidate is chosen; revisions
/// happen only through adjustment rows pointing at the original response.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ThreadResponseRow {
    pub id: i64,
    pub thread_id: i64,
    pub question: String,
    pub sql: String,
    /// Opaque query id of the asking task that produced this response.
    pub asking_task_id: Option<String>,
    pub breakdown_detail: Option<String>,
    pub answer_detail: Option<String>,
    pub chart_detail: Option<String>,
    pub adjustment: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ThreadResponseRow {
    pub fn breakdown_detail(&self) -> Result<Option<BreakdownDetail>> {
        parse_detail(&self.breakdown_detail)
    }

    pub fn answer_detail(&self) -> Result<Option<AnswerDetail>> {
        parse_detail(&self.answer_detail)
    }

    pub fn chart_detail(&self) -> Result<Option<ChartDetail>> {
        parse_detail(&self.chart_detail)
    }

    pub fn adjustment(&self) -> Result<Option<Adjustment>> {
        parse_detail(&self.adjustment)
    }
}

fn parse_detail<T: serde::de::DeserializeOwned>(raw: &Option<String>) -> Result<Option<T>> {
    match raw {
        Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
        None => Ok(None),
    }
}

// ─── Detail sub-records ──────────────────────────────────────────────────────

/// Breakdown of the response SQL into named CTE steps. The unit the
/// breakdown tracker mutates; re-submission overwrites it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownDetail {
    pub query_id: String,
    pub status: BreakdownStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<BreakdownStep>,
}

impl BreakdownDetail {
    pub fn pending(query_id: String) -> Self {
        Self {
            query_id,
            status: BreakdownStatus::Understanding,
            error: None,
            description: String::new(),
            steps: Vec::new(),
        }
    }
}

/// Narrative text answer. The body itself is streamed to clients straight
/// from the AI service; only status and error land here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerDetail {
    pub query_id: String,
    pub status: TextAnswerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl AnswerDetail {
    pub fn pending(query_id: String) -> Self {
        Self {
            query_id,
            status: TextAnswerStatus::Preprocessing,
            error: None,
        }
    }
}

/// Chart spec for the response, written by the chart / chart-adjustment
/// trackers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartDetail {
    pub query_id: String,
    pub status: ChartStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_schema: Option<Value>,
    /// True when this detail was produced by a chart adjustment.
    #[serde(default)]
    pub adjusted: bool,
}

impl ChartDetail {
    pub fn pending(query_id: String, adjusted: bool) -> Self {
        Self {
            query_id,
            status: ChartStatus::Fetching,
            error: None,
            reasoning: String::new(),
            chart_schema: None,
            adjusted,
        }
    }
}

// ─── Adjustments ─────────────────────────────────────────────────────────────

/// Parent pointer carried by every adjustment record. The chain is
/// forward-pointing only: a new response references the response it revises.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentPayload {
    pub original_thread_response_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tweaks: Vec<String>,
}

/// A revision of a prior response, recorded as a new linked response —
/// never an in-place rewrite of history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Adjustment {
    /// Manual SQL override. No remote task involved.
    Sql { payload: AdjustmentPayload },
    /// Reasoning-feedback adjustment, tracked through `/v1/ask-feedbacks`.
    Reasoning {
        payload: AdjustmentPayload,
        query_id: String,
        status: AdjustmentStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<WireError>,
    },
}

impl Adjustment {
    pub fn original_response_id(&self) -> i64 {
        match self {
            Adjustment::Sql { payload } | Adjustment::Reasoning { payload, .. } => {
                payload.original_thread_response_id
            }
        }
    }
}

// ─── Task binding ────────────────────────────────────────────────────────────

/// Maps an externally issued query id to the thread/response it ultimately
/// must update. `previous_query_id` keeps the audit trail across
/// cancel-and-rerun supersession.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AskingTaskRow {
    pub query_id: String,
    pub thread_id: Option<i64>,
    pub response_id: Option<i64>,
    pub question: String,
    pub previous_query_id: Option<String>,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjustment_round_trips_with_type_tag() {
        let adj = Adjustment::Sql {
            payload: AdjustmentPayload {
                original_thread_response_id: 7,
                sql: Some("SELECT 1".into()),
                tweaks: vec![],
            },
        };
        let raw = serde_json::to_string(&adj).unwrap();
        assert!(raw.contains("\"type\":\"sql\""));
        let back: Adjustment = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.original_response_id(), 7);
    }

    #[test]
    fn detail_defaults_are_pending() {
        let d = BreakdownDetail::pending("q-1".into());
        assert_eq!(d.status, BreakdownStatus::Understanding);
        assert!(d.steps.is_empty());
        let c = ChartDetail::pending("q-2".into(), true);
        assert_eq!(c.status, ChartStatus::Fetching);
        assert!(c.adjusted);
    }
}
