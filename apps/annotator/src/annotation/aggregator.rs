//! Result Aggregator: per-task tables keyed by candidate, and the final
//! left-joined table with one row per input record.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use super::attempt::UnitOutcome;
use super::error::AnnotationError;
use super::schema::{AnnotationRow, FieldValue};
use crate::models::Record;

/// Candidate key → that task's values. Keys are unique; iteration is sorted
/// by key so identical inputs give identical tables.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    task: String,
    columns: Vec<String>,
    rows: BTreeMap<String, Vec<FieldValue>>,
}

impl ResultTable {
    pub fn new(task: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            task: task.into(),
            columns,
            rows: BTreeMap::new(),
        }
    }

    pub fn from_rows(
        task: impl Into<String>,
        columns: Vec<String>,
        rows: impl IntoIterator<Item = AnnotationRow>,
    ) -> Result<Self, AnnotationError> {
        let mut table = Self::new(task, columns);
        for row in rows {
            table.insert(row)?;
        }
        Ok(table)
    }

    /// Builds a table from the `Succeeded` outcomes only.
    pub fn from_outcomes(
        task: impl Into<String>,
        columns: Vec<String>,
        outcomes: Vec<UnitOutcome>,
    ) -> Result<Self, AnnotationError> {
        let mut table = Self::new(task, columns);
        let mut dropped = 0;
        let mut retried = 0;
        for outcome in outcomes {
            match outcome {
                UnitOutcome::Succeeded { rows, attempts } => {
                    if attempts > 1 {
                        retried += 1;
                    }
                    for row in rows {
                        table.insert(row)?;
                    }
                }
                UnitOutcome::Dropped {
                    keys,
                    attempts,
                    reason,
                } => {
                    debug!(
                        "{}: [{}] dropped after {} attempts: {}",
                        table.task,
                        keys.join(", "),
                        attempts,
                        reason
                    );
                    dropped += keys.len();
                }
            }
        }
        if retried > 0 {
            debug!("{}: {} unit(s) needed more than one attempt", table.task, retried);
        }
        if dropped > 0 {
            warn!(
                "{}: {} candidate(s) left out after exhausting retries",
                table.task, dropped
            );
        }
        Ok(table)
    }

    pub fn insert(&mut self, row: AnnotationRow) -> Result<(), AnnotationError> {
        debug_assert_eq!(row.values.len(), self.columns.len());
        if self.rows.contains_key(&row.key) {
            return Err(AnnotationError::DuplicateKey {
                task: self.task.clone(),
                key: row.key,
            });
        }
        self.rows.insert(row.key, row.values);
        Ok(())
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, key: &str) -> Option<&[FieldValue]> {
        self.rows.get(key).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[FieldValue])> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Exactly one row per input record, in input order. Columns accumulate as
/// per-task tables are joined; a candidate absent from a table gets nulls.
#[derive(Debug, Clone)]
pub struct FinalTable {
    keys: Vec<String>,
    index: HashMap<String, usize>,
    columns: Vec<String>,
    cells: Vec<Vec<Option<FieldValue>>>,
}

impl FinalTable {
    pub fn new<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        let keys: Vec<String> = records.into_iter().map(|r| r.name().to_string()).collect();
        let index = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), i))
            .collect();
        let cells = vec![Vec::new(); keys.len()];
        Self {
            keys,
            index,
            columns: Vec::new(),
            cells,
        }
    }

    /// Left-joins `table` on the candidate key. A column whose name is already
    /// taken is qualified with the task name.
    pub fn left_join(&mut self, table: &ResultTable) {
        for column in table.columns() {
            let name = if self.columns.contains(column) {
                format!("{}_{}", table.task(), column)
            } else {
                column.clone()
            };
            self.columns.push(name);
        }

        for (row, key) in self.cells.iter_mut().zip(&self.keys) {
            match table.get(key) {
                Some(values) => row.extend(values.iter().cloned().map(Some)),
                None => row.extend(std::iter::repeat(None).take(table.columns().len())),
            }
        }

        let orphans = table
            .rows()
            .filter(|(key, _)| !self.index.contains_key(*key))
            .count();
        if orphans > 0 {
            debug!(
                "{}: {} row(s) matched no input record and were ignored",
                table.task(),
                orphans
            );
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// `None` for an unknown key or column; `Some(None)` for a null cell.
    #[cfg(test)]
    pub fn get(&self, key: &str, column: &str) -> Option<Option<&FieldValue>> {
        let row = *self.index.get(key)?;
        let col = self.columns.iter().position(|c| c == column)?;
        Some(self.cells[row][col].as_ref())
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[Option<FieldValue>])> {
        self.keys
            .iter()
            .zip(&self.cells)
            .map(|(k, cells)| (k.as_str(), cells.as_slice()))
    }
}
