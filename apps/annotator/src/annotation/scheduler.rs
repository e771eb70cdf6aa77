//! Concurrency Scheduler: join-all barrier with a counting admission gate.
//!
//! Every unit is spawned up front; the semaphore decides how many are in flight.
//! Completion order follows whichever network calls return first.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use super::error::AnnotationError;

pub struct Scheduler {
    task: String,
    max_concurrent: usize,
}

impl Scheduler {
    pub fn new(task: impl Into<String>, max_concurrent: usize) -> Self {
        Self {
            task: task.into(),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Runs `work` for every item and waits for all of them.
    ///
    /// The first unit error aborts the remaining units and is returned; their
    /// partial results are discarded.
    pub async fn run_all<T, O, F, Fut>(&self, items: Vec<T>, work: F) -> Result<Vec<O>, AnnotationError>
    where
        T: Send + 'static,
        O: Send + 'static,
        F: Fn(T, Arc<Semaphore>) -> Fut,
        Fut: Future<Output = Result<O, AnnotationError>> + Send + 'static,
    {
        let gate = Arc::new(Semaphore::new(self.max_concurrent));
        let mut join_set: JoinSet<Result<O, AnnotationError>> = JoinSet::new();

        let total = items.len();
        for item in items {
            join_set.spawn(work(item, gate.clone()));
        }
        debug!(
            "{}: scheduled {} units, at most {} in flight",
            self.task, total, self.max_concurrent
        );

        let mut outcomes = Vec::with_capacity(total);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(outcome)) => outcomes.push(outcome),
                Ok(Err(e)) => {
                    join_set.abort_all();
                    return Err(e);
                }
                Err(join_error) => {
                    join_set.abort_all();
                    return Err(AnnotationError::TaskPanicked {
                        task: self.task.clone(),
                        message: join_error.to_string(),
                    });
                }
            }
        }

        Ok(outcomes)
    }
}
