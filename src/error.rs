//! Typed error taxonomy for the asking core.
//!
//! Orchestration operations bubble these to the caller after telemetry
//! tagging; background-tracker poll errors are caught per entity and logged.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// A referenced thread/response/task does not exist. Never retried.
    #[error("{0} {1} not found")]
    NotFound(&'static str, i64),

    /// Same as [`ServiceError::NotFound`] but for opaque string ids (query ids).
    #[error("task {0} not found")]
    TaskNotFound(String),

    /// Non-2xx or malformed body from the AI service. `message` carries the
    /// detail string extracted from the response body when one was present.
    #[error("AI service error ({code}): {message}")]
    AiService { code: String, message: String },

    /// Wire status string not in the expected enumeration. Fatal for the
    /// current poll cycle only — the entity stays tracked for the next tick.
    #[error("unknown task status on the wire: {0:?}")]
    UnknownStatus(String),

    /// Raised synchronously before any I/O (bad step index, empty payload…).
    #[error("validation error: {0}")]
    Validation(String),

    /// Query-execution (engine) failure during a data preview.
    #[error("engine error: {0}")]
    Engine(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database query timed out after {0}s")]
    DatabaseTimeout(u64),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServiceError {
    /// Stable machine-readable code, used in telemetry properties and the
    /// REST error body.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(..) | ServiceError::TaskNotFound(_) => "NOT_FOUND",
            ServiceError::AiService { .. } => "AI_SERVICE_ERROR",
            ServiceError::UnknownStatus(_) => "UNKNOWN_STATUS",
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::Engine(_) => "ENGINE_ERROR",
            ServiceError::Database(_) | ServiceError::DatabaseTimeout(_) => "DATABASE_ERROR",
            ServiceError::Json(_) => "SERIALIZATION_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
