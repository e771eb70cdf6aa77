//! Per-Record Task: one unit of work (a record or a batch) driven through
//! prompt → gateway → parser with a bounded retry loop.
//!
//! States: `Pending → InFlight → {Succeeded, Retrying, FailedTerminal}`.
//! A retry goes back through the admission gate like any fresh unit.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::error::{AnnotationError, AttemptError};
use super::parser::parse_reply;
use super::schema::AnnotationRow;
use super::task::{AnnotationTask, ExhaustionPolicy, ModelTarget};
use crate::llm_client::ModelGateway;
use crate::models::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Pending,
    InFlight,
    Succeeded,
    Retrying,
    FailedTerminal,
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttemptState::Pending => "pending",
            AttemptState::InFlight => "in_flight",
            AttemptState::Succeeded => "succeeded",
            AttemptState::Retrying => "retrying",
            AttemptState::FailedTerminal => "failed_terminal",
        };
        f.write_str(s)
    }
}

/// Attempt counter and state for one unit. The counter never exceeds
/// `max_retries + 1`.
#[derive(Debug, Clone)]
pub struct TaskAttempt {
    attempts: u32,
    max_retries: u32,
    state: AttemptState,
}

impl TaskAttempt {
    pub fn new(max_retries: u32) -> Self {
        Self {
            attempts: 0,
            max_retries,
            state: AttemptState::Pending,
        }
    }

    /// Admitted through the gate: `Pending | Retrying → InFlight`.
    pub fn admit(&mut self) {
        debug_assert!(matches!(
            self.state,
            AttemptState::Pending | AttemptState::Retrying
        ));
        self.attempts += 1;
        self.state = AttemptState::InFlight;
    }

    pub fn succeed(&mut self) {
        self.state = AttemptState::Succeeded;
    }

    /// `InFlight → Retrying`, or `FailedTerminal` once the bound is spent.
    pub fn fail(&mut self) -> AttemptState {
        self.state = if self.attempts > self.max_retries {
            AttemptState::FailedTerminal
        } else {
            AttemptState::Retrying
        };
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }
}

/// A record or ordered batch of records scheduled as one prompt.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    pub index: usize,
    pub records: Vec<Arc<Record>>,
}

impl WorkUnit {
    /// Splits `records` into units of at most `batch_size`, preserving order.
    pub fn batches(records: &[Arc<Record>], batch_size: usize) -> Vec<WorkUnit> {
        records
            .chunks(batch_size.max(1))
            .enumerate()
            .map(|(index, chunk)| WorkUnit {
                index,
                records: chunk.to_vec(),
            })
            .collect()
    }

    pub fn keys(&self) -> Vec<String> {
        self.records.iter().map(|r| r.name().to_string()).collect()
    }
}

#[derive(Debug, Clone)]
pub enum UnitOutcome {
    Succeeded {
        rows: Vec<AnnotationRow>,
        attempts: u32,
    },
    /// Retries ran out under `ExhaustionPolicy::Drop`.
    Dropped {
        keys: Vec<String>,
        attempts: u32,
        reason: String,
    },
}

/// Everything a unit needs besides its records. Shared by all units of a run.
pub struct UnitContext {
    pub task: Arc<AnnotationTask>,
    pub gateway: Arc<dyn ModelGateway>,
    pub target: ModelTarget,
}

/// Drives one unit to `Succeeded` or `FailedTerminal`.
///
/// The gate permit is held for the gateway call and the parse, then released
/// before any retry so waiting units get a fair chance at the slot.
pub async fn run_unit(
    ctx: Arc<UnitContext>,
    unit: WorkUnit,
    gate: Arc<Semaphore>,
) -> Result<UnitOutcome, AnnotationError> {
    let task = &ctx.task;
    let keys = unit.keys();
    let prompt = task.prompt.build(&unit.records);
    let mut attempt = TaskAttempt::new(task.max_retries);

    loop {
        let result = {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| AnnotationError::GateClosed)?;
            attempt.admit();
            execute(&ctx, &prompt, &keys).await
        };

        match result {
            Ok(rows) => {
                attempt.succeed();
                debug!(
                    "{}: unit {} {} after {} attempt(s)",
                    task.name,
                    unit.index,
                    attempt.state(),
                    attempt.attempts()
                );
                if attempt.attempts() > 1 {
                    info!(
                        "{}: unit {} recovered on attempt {}",
                        task.name,
                        unit.index,
                        attempt.attempts()
                    );
                }
                return Ok(UnitOutcome::Succeeded {
                    rows,
                    attempts: attempt.attempts(),
                });
            }
            Err(e) => {
                if attempt.fail() == AttemptState::Retrying {
                    warn!(
                        "{}: attempt {}/{} for [{}] failed, retrying: {}",
                        task.name,
                        attempt.attempts(),
                        task.max_retries + 1,
                        keys.join(", "),
                        e
                    );
                    continue;
                }
                return exhausted(task, keys, attempt.attempts(), e);
            }
        }
    }
}

async fn execute(
    ctx: &UnitContext,
    prompt: &str,
    keys: &[String],
) -> Result<Vec<AnnotationRow>, AttemptError> {
    let reply = ctx
        .gateway
        .complete(prompt, &ctx.target.model, ctx.target.backend)
        .await?;

    parse_reply(&reply, &ctx.task.schema, keys).map_err(|e| {
        debug!("{}: unparseable reply: {:?}", ctx.task.name, reply);
        AttemptError::from(e)
    })
}

fn exhausted(
    task: &AnnotationTask,
    keys: Vec<String>,
    attempts: u32,
    last_error: AttemptError,
) -> Result<UnitOutcome, AnnotationError> {
    match task.on_exhausted {
        ExhaustionPolicy::Drop => {
            warn!(
                "{}: giving up on [{}] after {} attempts: {}",
                task.name,
                keys.join(", "),
                attempts,
                last_error
            );
            Ok(UnitOutcome::Dropped {
                keys,
                attempts,
                reason: last_error.to_string(),
            })
        }
        ExhaustionPolicy::Abort => Err(AnnotationError::FailedTerminal {
            task: task.name.clone(),
            candidates: keys.join(", "),
            attempts,
            last_error: last_error.to_string(),
        }),
    }
}
