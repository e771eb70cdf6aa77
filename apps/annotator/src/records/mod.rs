pub mod cleaning;
pub mod dedup;
pub mod experience;
pub mod loader;

use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::Record;

pub use experience::years_experience_table;

/// Load → drop empty documents → require a name → dedup by name.
pub fn load_records(path: &Path, keep_empty: bool) -> Result<Vec<Record>, AppError> {
    let documents = loader::load_documents(path)?;
    let (records, report) = prepare(documents, keep_empty);
    info!(
        "{} records ready ({} empty, {} unnamed, {} duplicate dropped)",
        records.len(),
        report.empty,
        report.unnamed,
        report.duplicates
    );
    Ok(records)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PrepareReport {
    pub empty: usize,
    pub unnamed: usize,
    pub duplicates: usize,
}

pub fn prepare(documents: Vec<Value>, keep_empty: bool) -> (Vec<Record>, PrepareReport) {
    let mut report = PrepareReport::default();
    let mut named = Vec::with_capacity(documents.len());

    for (i, document) in documents.into_iter().enumerate() {
        if !keep_empty && cleaning::record_is_empty(&document) {
            report.empty += 1;
            continue;
        }
        match Record::from_value(document) {
            Some(record) => named.push(record),
            None => {
                warn!("Skipping document {} without personal_info.name", i);
                report.unnamed += 1;
            }
        }
    }

    let (records, duplicates) = dedup::dedup_by_name(named);
    report.duplicates = duplicates;
    (records, report)
}
