use thiserror::Error;

use super::parser::ParseError;
use crate::llm_client::LlmError;

/// Why a single attempt failed. Every variant is retryable at the task level.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("backend: {0}")]
    Backend(#[from] LlmError),

    #[error("{0}")]
    Parse(#[from] ParseError),
}

/// Errors that end an annotation task run.
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("task '{task}' gave up on [{candidates}] after {attempts} attempts: {last_error}")]
    FailedTerminal {
        task: String,
        candidates: String,
        attempts: u32,
        last_error: String,
    },

    /// Two successful units produced the same candidate. Indicates a logic defect.
    #[error("task '{task}' produced candidate '{key}' more than once")]
    DuplicateKey { task: String, key: String },

    #[error("task '{task}' is misconfigured: {reason}")]
    InvalidTask { task: String, reason: String },

    #[error("a unit of task '{task}' panicked: {message}")]
    TaskPanicked { task: String, message: String },

    #[error("admission gate closed before all units were scheduled")]
    GateClosed,
}

impl AnnotationError {
    pub fn code(&self) -> &'static str {
        match self {
            AnnotationError::FailedTerminal { .. } => "FAILED_TERMINAL",
            AnnotationError::DuplicateKey { .. } => "DUPLICATE_KEY",
            AnnotationError::InvalidTask { .. } => "INVALID_TASK",
            AnnotationError::TaskPanicked { .. } => "TASK_PANICKED",
            AnnotationError::GateClosed => "GATE_CLOSED",
        }
    }
}
