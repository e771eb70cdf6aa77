pub mod aggregator;
pub mod attempt;
pub mod catalog;
pub mod error;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod scheduler;
pub mod schema;
pub mod task;

#[cfg(test)]
mod testing;

pub use aggregator::{FinalTable, ResultTable};
pub use catalog::TaskKind;
pub use error::AnnotationError;
pub use orchestrator::{Orchestrator, ResultSink};
pub use schema::FieldValue;
pub use task::{AnnotationTask, ModelTarget};
