//! Wire request/response payloads for the AI inference service.
//!
//! All bodies use lower_snake_case field names; numeric ids cross the wire
//! as decimal strings. Result payloads the core never inspects stay opaque
//! `serde_json::Value`s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status::{
    AdjustmentStatus, AskStatus, BreakdownStatus, ChartStatus, DeployStatus, RecommendationStatus,
    TextAnswerStatus,
};

/// Returned by every submit call.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub query_id: String,
}

/// Error payload attached to a failed task result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Untyped task result as it comes off the wire; the client parses `status`
/// into the kind-specific enumeration before handing it out.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct RawTaskResult {
    pub status: String,
    #[serde(default)]
    pub error: Option<WireError>,
    #[serde(default)]
    pub response: Option<Value>,
}

// ─── Asks ────────────────────────────────────────────────────────────────────

/// One prior question/SQL exchange, sent as generation context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlPair {
    pub question: String,
    pub sql: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskRequest {
    pub query: String,
    /// Project scope, decimal string on the wire.
    pub project_id: String,
    /// Prior exchanges of the same thread, newest first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub histories: Vec<SqlPair>,
}

/// A generated SQL candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskCandidate {
    pub sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AskResult {
    pub status: AskStatus,
    pub error: Option<WireError>,
    pub candidates: Vec<AskCandidate>,
}

// ─── Ask details (breakdown) ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct BreakdownRequest {
    pub query: String,
    pub sql: String,
    pub project_id: String,
}

/// One named CTE step of a breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownStep {
    pub sql: String,
    pub summary: String,
    pub cte_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BreakdownPayload {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<BreakdownStep>,
}

#[derive(Debug, Clone)]
pub struct BreakdownResult {
    pub status: BreakdownStatus,
    pub error: Option<WireError>,
    pub payload: Option<BreakdownPayload>,
}

// ─── SQL answers (text answer) ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TextAnswerRequest {
    pub query: String,
    pub sql: String,
    pub project_id: String,
    /// Sample of the SQL result rows the narration is grounded on (opaque).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_data: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct TextAnswerResult {
    pub status: TextAnswerStatus,
    pub error: Option<WireError>,
}

// ─── Charts ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ChartRequest {
    pub query: String,
    pub sql: String,
    pub project_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartPayload {
    #[serde(default)]
    pub reasoning: String,
    /// Vega-lite style schema, opaque to the core.
    #[serde(default)]
    pub chart_schema: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ChartResult {
    pub status: ChartStatus,
    pub error: Option<WireError>,
    pub payload: Option<ChartPayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartAdjustmentRequest {
    pub query: String,
    pub sql: String,
    pub project_id: String,
    /// Requested tweak (chart type, axes…), opaque.
    pub adjustment_option: Value,
    /// Schema of the chart being adjusted.
    pub chart_schema: Value,
}

// ─── Question recommendations ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationRequest {
    pub project_id: String,
    /// Previous questions of the thread, descending id order, capped at 5.
    pub previous_questions: Vec<String>,
    pub max_questions: u32,
    pub max_categories: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedQuestion {
    pub question: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sql: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationPayload {
    #[serde(default)]
    pub questions: Vec<RecommendedQuestion>,
}

#[derive(Debug, Clone)]
pub struct RecommendationResult {
    pub status: RecommendationStatus,
    pub error: Option<WireError>,
    pub payload: Option<RecommendationPayload>,
}

// ─── Ask feedbacks (reasoning adjustment) ────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackAdjustmentRequest {
    pub question: String,
    pub sql: String,
    pub project_id: String,
    /// User feedback on the prior reasoning, free text.
    pub tweaks: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FeedbackAdjustmentResult {
    pub status: AdjustmentStatus,
    pub error: Option<WireError>,
    pub candidates: Vec<AskCandidate>,
}

// ─── Semantics preparations (deploy) ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DeployRequest {
    /// Semantic-layer manifest (MDL), opaque to the core.
    pub manifest: Value,
    /// Caller-chosen deployment hash, decimal/hex string.
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct DeployStatusResult {
    pub status: DeployStatus,
    pub error: Option<WireError>,
}
