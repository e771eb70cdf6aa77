//! Pipeline Orchestrator: runs annotation tasks over one record set and
//! left-joins their tables on the candidate name.
//!
//! Flow per task: batch records → schedule units under the task's gate →
//! aggregate successes → hand the table to the sink → join into the final table.

use std::sync::Arc;

use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use super::aggregator::{FinalTable, ResultTable};
use super::attempt::{run_unit, UnitContext, WorkUnit};
use super::error::AnnotationError;
use super::scheduler::Scheduler;
use super::task::{AnnotationTask, ModelTarget};
use crate::errors::AppError;
use crate::llm_client::ModelGateway;
use crate::models::Record;

/// Receives each per-task table as soon as its run finishes.
pub trait ResultSink {
    fn task_completed(&mut self, target: &ModelTarget, table: &ResultTable) -> Result<(), AppError>;
}

#[derive(Debug)]
pub struct TaskFailure {
    pub task: String,
    pub error: AnnotationError,
}

#[derive(Debug)]
pub struct PipelineReport {
    pub table: FinalTable,
    pub failures: Vec<TaskFailure>,
}

pub struct Orchestrator {
    gateway: Arc<dyn ModelGateway>,
}

impl Orchestrator {
    /// The gateway is injected once and shared by every unit of every task.
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }

    /// Runs one task over `records` and returns its table.
    ///
    /// Fails when the descriptor is invalid, when a unit under the abort
    /// policy exhausts its retries, or on a duplicate candidate key.
    pub async fn run_task(
        &self,
        task: Arc<AnnotationTask>,
        records: &[Arc<Record>],
        target: &ModelTarget,
    ) -> Result<ResultTable, AnnotationError> {
        task.validate()?;

        let run_id = Uuid::new_v4();
        let span = info_span!(
            "annotation_task",
            task = %task.name,
            model = %target.model,
            backend = %target.backend,
            %run_id
        );

        async {
            let units = WorkUnit::batches(records, task.batch_size);
            info!(
                "Starting {} over {} records in {} units (max {} in flight)",
                task.name,
                records.len(),
                units.len(),
                task.max_concurrent
            );

            let ctx = Arc::new(UnitContext {
                task: task.clone(),
                gateway: self.gateway.clone(),
                target: target.clone(),
            });

            let scheduler = Scheduler::new(task.name.clone(), task.max_concurrent);
            let outcomes = scheduler
                .run_all(units, |unit, gate| run_unit(ctx.clone(), unit, gate))
                .await?;

            let table = ResultTable::from_outcomes(task.name.clone(), task.output_columns(), outcomes)?;
            info!(
                "Finished {}: {}/{} candidates annotated",
                task.name,
                table.len(),
                records.len()
            );
            Ok(table)
        }
        .instrument(span)
        .await
    }

    /// Runs every task in order and joins the results.
    ///
    /// A task that fails is reported in `failures` and its columns stay null;
    /// the remaining tasks still run. Sink errors stop the pipeline.
    pub async fn run(
        &self,
        tasks: &[Arc<AnnotationTask>],
        records: &[Arc<Record>],
        target: &ModelTarget,
        sink: &mut dyn ResultSink,
    ) -> Result<PipelineReport, AppError> {
        let mut table = FinalTable::new(records.iter().map(|r| r.as_ref()));
        let mut failures = Vec::new();

        for task in tasks {
            match self.run_task(task.clone(), records, target).await {
                Ok(result) => {
                    sink.task_completed(target, &result)?;
                    table.left_join(&result);
                }
                Err(e) => {
                    error!(
                        code = e.code(),
                        "Task {} aborted for model {}: {}", task.name, target.model, e
                    );
                    table.left_join(&ResultTable::new(task.name.clone(), task.output_columns()));
                    failures.push(TaskFailure {
                        task: task.name.clone(),
                        error: e,
                    });
                }
            }
        }

        Ok(PipelineReport { table, failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::annotation::schema::FieldValue;
    use crate::annotation::task::ExhaustionPolicy;
    use crate::annotation::testing::{
        candidates, gender_task, prompt_names, single_score_task, ScriptedGateway,
    };
    use crate::llm_client::{Backend, LlmError};

    fn target() -> ModelTarget {
        ModelTarget::new("stub-model", Backend::Local)
    }

    struct DiscardSink;

    impl ResultSink for DiscardSink {
        fn task_completed(&mut self, _: &ModelTarget, _: &ResultTable) -> Result<(), AppError> {
            Ok(())
        }
    }

    struct CollectSink(Vec<String>);

    impl ResultSink for CollectSink {
        fn task_completed(&mut self, target: &ModelTarget, table: &ResultTable) -> Result<(), AppError> {
            self.0.push(format!("{}:{}:{}", target.model, table.task(), table.len()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_recovers_malformed_reply_without_error() {
        // A answers at once; B needs a second attempt.
        let gateway = Arc::new(ScriptedGateway::new(|prompt, call| {
            let names = prompt_names(prompt);
            Ok(match (names[0].as_str(), call) {
                ("A", _) => "Score: 85".to_string(),
                ("B", 0) => "not a number".to_string(),
                _ => "Score: 40".to_string(),
            })
        }));
        let orchestrator = Orchestrator::new(gateway);
        let table = orchestrator
            .run_task(
                Arc::new(single_score_task(2, ExhaustionPolicy::Abort)),
                &candidates(&["A", "B"]),
                &target(),
            )
            .await
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("A"), Some(&[FieldValue::Integer(85)][..]));
        assert_eq!(table.get("B"), Some(&[FieldValue::Integer(40)][..]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_limit_holds_across_run() {
        let gateway = Arc::new(
            ScriptedGateway::new(|_, _| Ok("Score: 50".to_string()))
                .with_delay(Duration::from_millis(25)),
        );
        let orchestrator = Orchestrator::new(gateway.clone());
        let names: Vec<String> = (0..30).map(|i| format!("C{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let task = single_score_task(0, ExhaustionPolicy::Abort).with_concurrency(4);
        let table = orchestrator
            .run_task(Arc::new(task), &candidates(&refs), &target())
            .await
            .unwrap();

        assert_eq!(table.len(), 30);
        assert!(gateway.peak_in_flight() <= 4);
        assert_eq!(gateway.peak_in_flight(), 4);
    }

    #[tokio::test]
    async fn test_same_input_same_table() {
        let script = |prompt: &str, _call: u32| {
            let names = prompt_names(prompt);
            Ok(format!("Score: {}", names[0].len() * 7))
        };
        let records = candidates(&["Ann", "Bo", "Cyrus"]);
        let task = Arc::new(single_score_task(1, ExhaustionPolicy::Abort));

        let first = Orchestrator::new(Arc::new(ScriptedGateway::new(script)))
            .run_task(task.clone(), &records, &target())
            .await
            .unwrap();
        let second = Orchestrator::new(Arc::new(ScriptedGateway::new(script)))
            .run_task(task, &records, &target())
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_tabular_batches_cover_every_candidate() {
        let gateway = Arc::new(ScriptedGateway::new(|prompt, _| {
            Ok(prompt_names(prompt)
                .iter()
                .map(|n| format!("{n},Unknown"))
                .collect::<Vec<_>>()
                .join("\n"))
        }));
        let records = candidates(&["A", "B", "C", "D", "E", "F", "G"]);
        let table = Orchestrator::new(gateway.clone())
            .run_task(Arc::new(gender_task(3, 1, ExhaustionPolicy::Abort)), &records, &target())
            .await
            .unwrap();

        assert_eq!(table.len(), 7);
        assert_eq!(gateway.total_calls(), 3);
    }

    #[tokio::test]
    async fn test_short_batch_is_retried_whole() {
        // First reply for each batch drops its last row.
        let gateway = Arc::new(ScriptedGateway::new(|prompt, call| {
            let names = prompt_names(prompt);
            let take = if call == 0 { names.len() - 1 } else { names.len() };
            Ok(names[..take]
                .iter()
                .map(|n| format!("{n},Female"))
                .collect::<Vec<_>>()
                .join("\n"))
        }));
        let records = candidates(&["A", "B", "C"]);
        let table = Orchestrator::new(gateway.clone())
            .run_task(Arc::new(gender_task(3, 2, ExhaustionPolicy::Abort)), &records, &target())
            .await
            .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(gateway.total_calls(), 2);
        assert_eq!(gateway.distinct_prompts(), 1);
    }

    #[tokio::test]
    async fn test_abort_policy_fails_task_run() {
        let gateway = Arc::new(ScriptedGateway::new(|prompt, _| {
            if prompt_names(prompt)[0] == "B" {
                Ok("???".to_string())
            } else {
                Ok("Score: 1".to_string())
            }
        }));
        let err = Orchestrator::new(gateway)
            .run_task(
                Arc::new(single_score_task(2, ExhaustionPolicy::Abort)),
                &candidates(&["A", "B"]),
                &target(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FAILED_TERMINAL");
    }

    #[tokio::test]
    async fn test_invalid_task_rejected_before_any_call() {
        let gateway = Arc::new(ScriptedGateway::new(|_, _| Ok("Score: 1".to_string())));
        let task = single_score_task(1, ExhaustionPolicy::Drop).with_concurrency(0);
        let err = Orchestrator::new(gateway.clone())
            .run_task(Arc::new(task), &candidates(&["A"]), &target())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_TASK");
        assert_eq!(gateway.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_run_joins_tasks_and_keeps_failed_columns_null() {
        // Scores always parse; gender replies are always malformed.
        let gateway = Arc::new(ScriptedGateway::new(|prompt, _| {
            if prompt.starts_with("Candidates:") && prompt_names(prompt).len() == 1 {
                Ok("Score: 70".to_string())
            } else {
                Err(LlmError::EmptyContent)
            }
        }));
        let tasks = vec![
            Arc::new(single_score_task(0, ExhaustionPolicy::Abort)),
            Arc::new(gender_task(2, 1, ExhaustionPolicy::Abort)),
        ];
        let records = candidates(&["A", "B", "C"]);
        let mut sink = CollectSink(Vec::new());

        let report = Orchestrator::new(gateway)
            .run(&tasks, &records, &target(), &mut sink)
            .await
            .unwrap();

        assert_eq!(report.table.len(), 3);
        assert_eq!(report.table.columns(), &["score", "gender"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].task, "stub_gender");
        for (_, cells) in report.table.rows() {
            assert_eq!(cells[0], Some(FieldValue::Integer(70)));
            assert_eq!(cells[1], None);
        }
        assert_eq!(sink.0, vec!["stub-model:stub_score:3"]);
    }

    #[tokio::test]
    async fn test_drop_policy_leaves_null_cells() {
        let gateway = Arc::new(ScriptedGateway::new(|prompt, _| {
            if prompt_names(prompt)[0] == "B" {
                Ok("no score".to_string())
            } else {
                Ok("Score: 9".to_string())
            }
        }));
        let tasks = vec![Arc::new(single_score_task(1, ExhaustionPolicy::Drop))];
        let records = candidates(&["A", "B"]);

        let report = Orchestrator::new(gateway)
            .run(&tasks, &records, &target(), &mut DiscardSink)
            .await
            .unwrap();

        assert!(report.failures.is_empty());
        assert_eq!(report.table.get("A", "score"), Some(Some(&FieldValue::Integer(9))));
        assert_eq!(report.table.get("B", "score"), Some(None));
    }
}
