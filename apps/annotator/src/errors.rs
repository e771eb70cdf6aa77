use thiserror::Error;

use crate::annotation::AnnotationError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Component errors stay typed underneath; `code()` gives a stable label for logs.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Annotation error: {0}")]
    Annotation(#[from] AnnotationError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Input(_) => "INPUT_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Csv(_) => "CSV_ERROR",
            AppError::Llm(_) => "LLM_ERROR",
            AppError::Annotation(e) => e.code(),
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
