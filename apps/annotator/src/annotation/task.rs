//! Annotation Task Descriptor: what one enrichment pass asks of the model.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::AnnotationError;
use super::schema::ResponseSchema;
use crate::llm_client::Backend;
use crate::models::Record;

/// Builds the prompt for one unit of work: a single record, or a small
/// ordered batch for tabular tasks.
pub trait PromptBuilder: Send + Sync {
    fn build(&self, batch: &[Arc<Record>]) -> String;
}

/// What happens to a unit whose retries run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Leave the candidates out of this task's table. Their cells end up null.
    Drop,
    /// Abort the whole task run.
    Abort,
}

/// Model and backend used for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTarget {
    pub model: String,
    pub backend: Backend,
}

impl ModelTarget {
    pub fn new(model: impl Into<String>, backend: Backend) -> Self {
        Self {
            model: model.into(),
            backend,
        }
    }
}

/// Immutable for the duration of a run.
#[derive(Clone)]
pub struct AnnotationTask {
    pub name: String,
    pub prompt: Arc<dyn PromptBuilder>,
    pub schema: ResponseSchema,
    pub batch_size: usize,
    pub max_concurrent: usize,
    /// Retries after the first attempt; a unit makes at most `max_retries + 1` calls.
    pub max_retries: u32,
    pub on_exhausted: ExhaustionPolicy,
}

impl std::fmt::Debug for AnnotationTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationTask")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("batch_size", &self.batch_size)
            .field("max_concurrent", &self.max_concurrent)
            .field("max_retries", &self.max_retries)
            .field("on_exhausted", &self.on_exhausted)
            .finish()
    }
}

impl AnnotationTask {
    pub fn with_concurrency(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn output_columns(&self) -> Vec<String> {
        self.schema.output_columns()
    }

    pub fn validate(&self) -> Result<(), AnnotationError> {
        let invalid = |reason: String| AnnotationError::InvalidTask {
            task: self.name.clone(),
            reason,
        };

        if self.batch_size == 0 {
            return Err(invalid("batch_size must be at least 1".to_string()));
        }
        if self.max_concurrent == 0 {
            return Err(invalid("max_concurrent must be at least 1".to_string()));
        }
        if let Some(max) = self.schema.max_batch() {
            if self.batch_size > max {
                return Err(invalid(format!(
                    "schema accounts for at most {max} candidate(s) per reply, batch_size is {}",
                    self.batch_size
                )));
            }
        }
        self.schema.validate().map_err(invalid)
    }
}
