//! Per-kind task status enumerations.
//!
//! Status strings are lower-case on the wire and upper-case internally (and
//! in persisted detail records). Parsing is case-insensitive; an unrecognized
//! string is a [`ServiceError::UnknownStatus`] — fatal for that poll cycle,
//! never silently swallowed.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// The task kinds tracked by the background pollers, one tracker instance
/// per kind. Also selects the AI-service resource family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// SQL generation for a question (`/v1/asks`).
    Ask,
    /// Breakdown of an answer into CTE steps (`/v1/ask-details`).
    Breakdown,
    /// Narrative text answer over the SQL result (`/v1/sql-answers`).
    TextAnswer,
    /// Chart spec generation (`/v1/charts`).
    Chart,
    /// Tweak of a previously generated chart (`/v1/chart-adjustments`).
    ChartAdjustment,
    /// Recommended follow-up questions for a thread (`/v1/question-recommendations`).
    Recommendation,
    /// Reasoning-feedback adjustment of an answer (`/v1/ask-feedbacks`).
    FeedbackAdjustment,
}

impl TaskKind {
    /// URL path segment of the matching resource family.
    pub fn resource(self) -> &'static str {
        match self {
            TaskKind::Ask => "asks",
            TaskKind::Breakdown => "ask-details",
            TaskKind::TextAnswer => "sql-answers",
            TaskKind::Chart => "charts",
            TaskKind::ChartAdjustment => "chart-adjustments",
            TaskKind::Recommendation => "question-recommendations",
            TaskKind::FeedbackAdjustment => "ask-feedbacks",
        }
    }
}

/// Normalize a wire status string (lower-case) for matching.
fn normalize(s: &str) -> String {
    s.trim().to_ascii_uppercase()
}

// ─── Ask ─────────────────────────────────────────────────────────────────────

/// Lifecycle of a SQL-generation (asking) task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AskStatus {
    Understanding,
    Searching,
    Planning,
    Generating,
    Correcting,
    Finished,
    Failed,
    Stopped,
}

impl AskStatus {
    pub fn parse_wire(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "UNDERSTANDING" => Ok(Self::Understanding),
            "SEARCHING" => Ok(Self::Searching),
            "PLANNING" => Ok(Self::Planning),
            "GENERATING" => Ok(Self::Generating),
            "CORRECTING" => Ok(Self::Correcting),
            "FINISHED" => Ok(Self::Finished),
            "FAILED" => Ok(Self::Failed),
            "STOPPED" => Ok(Self::Stopped),
            _ => Err(ServiceError::UnknownStatus(s.to_string())),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Stopped)
    }
}

// ─── Breakdown ───────────────────────────────────────────────────────────────

/// Lifecycle of a breakdown (answer decomposition) task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakdownStatus {
    Understanding,
    Searching,
    Generating,
    Finished,
    Failed,
    Stopped,
}

impl BreakdownStatus {
    pub fn parse_wire(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "UNDERSTANDING" => Ok(Self::Understanding),
            "SEARCHING" => Ok(Self::Searching),
            "GENERATING" => Ok(Self::Generating),
            "FINISHED" => Ok(Self::Finished),
            "FAILED" => Ok(Self::Failed),
            "STOPPED" => Ok(Self::Stopped),
            _ => Err(ServiceError::UnknownStatus(s.to_string())),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Stopped)
    }
}

// ─── Text answer ─────────────────────────────────────────────────────────────

/// Lifecycle of a narrative text-answer task. The service streams the body
/// separately; `Streaming` is the intermediate state while chunks are
/// produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextAnswerStatus {
    Preprocessing,
    Streaming,
    Finished,
    Failed,
    Interrupted,
}

impl TextAnswerStatus {
    pub fn parse_wire(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "PREPROCESSING" => Ok(Self::Preprocessing),
            "STREAMING" => Ok(Self::Streaming),
            "FINISHED" => Ok(Self::Finished),
            "FAILED" => Ok(Self::Failed),
            "INTERRUPTED" => Ok(Self::Interrupted),
            _ => Err(ServiceError::UnknownStatus(s.to_string())),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Interrupted)
    }
}

// ─── Chart ───────────────────────────────────────────────────────────────────

/// Lifecycle of a chart or chart-adjustment task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChartStatus {
    Fetching,
    Generating,
    Finished,
    Failed,
    Stopped,
}

impl ChartStatus {
    pub fn parse_wire(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "FETCHING" => Ok(Self::Fetching),
            "GENERATING" => Ok(Self::Generating),
            "FINISHED" => Ok(Self::Finished),
            "FAILED" => Ok(Self::Failed),
            "STOPPED" => Ok(Self::Stopped),
            _ => Err(ServiceError::UnknownStatus(s.to_string())),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Stopped)
    }
}

// ─── Recommendation ──────────────────────────────────────────────────────────

/// Lifecycle of a question-recommendation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationStatus {
    Generating,
    Finished,
    Failed,
    Stopped,
}

impl RecommendationStatus {
    pub fn parse_wire(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "GENERATING" => Ok(Self::Generating),
            "FINISHED" => Ok(Self::Finished),
            "FAILED" => Ok(Self::Failed),
            "STOPPED" => Ok(Self::Stopped),
            _ => Err(ServiceError::UnknownStatus(s.to_string())),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Stopped)
    }
}

// ─── Feedback adjustment ─────────────────────────────────────────────────────

/// Lifecycle of a reasoning-feedback adjustment task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentStatus {
    Understanding,
    Generating,
    Finished,
    Failed,
    Stopped,
}

impl AdjustmentStatus {
    pub fn parse_wire(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "UNDERSTANDING" => Ok(Self::Understanding),
            "GENERATING" => Ok(Self::Generating),
            "FINISHED" => Ok(Self::Finished),
            "FAILED" => Ok(Self::Failed),
            "STOPPED" => Ok(Self::Stopped),
            _ => Err(ServiceError::UnknownStatus(s.to_string())),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Stopped)
    }
}

// ─── Deployment ──────────────────────────────────────────────────────────────

/// Lifecycle of a semantics deployment (`/v1/semantics-preparations`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeployStatus {
    Indexing,
    Finished,
    Failed,
}

impl DeployStatus {
    pub fn parse_wire(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "INDEXING" => Ok(Self::Indexing),
            "FINISHED" => Ok(Self::Finished),
            "FAILED" => Ok(Self::Failed),
            _ => Err(ServiceError::UnknownStatus(s.to_string())),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_parse_is_case_insensitive() {
        assert_eq!(
            AskStatus::parse_wire("understanding").unwrap(),
            AskStatus::Understanding
        );
        assert_eq!(
            AskStatus::parse_wire("FINISHED").unwrap(),
            AskStatus::Finished
        );
        assert_eq!(
            ChartStatus::parse_wire(" fetching ").unwrap(),
            ChartStatus::Fetching
        );
    }

    #[test]
    fn unknown_status_is_an_error() {
        let err = AskStatus::parse_wire("exploded").unwrap_err();
        assert!(matches!(err, ServiceError::UnknownStatus(_)));
    }

    #[test]
    fn terminal_classification() {
        assert!(AskStatus::Finished.is_terminal());
        assert!(AskStatus::Failed.is_terminal());
        assert!(AskStatus::Stopped.is_terminal());
        assert!(!AskStatus::Generating.is_terminal());
        assert!(TextAnswerStatus::Interrupted.is_terminal());
        assert!(!TextAnswerStatus::Streaming.is_terminal());
    }

    #[test]
    fn persisted_form_is_upper_case() {
        let s = serde_json::to_string(&BreakdownStatus::Understanding).unwrap();
        assert_eq!(s, "\"UNDERSTANDING\"");
        let parsed: BreakdownStatus = serde_json::from_str("\"FINISHED\"").unwrap();
        assert_eq!(parsed, BreakdownStatus::Finished);
    }
}
