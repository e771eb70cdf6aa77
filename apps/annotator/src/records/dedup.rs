use std::collections::HashSet;

use tracing::warn;

use crate::models::Record;

/// Keeps the first record for each candidate name so the name can serve as a
/// unique key downstream. Returns the kept records in input order and the
/// number of duplicates dropped.
pub fn dedup_by_name(records: Vec<Record>) -> (Vec<Record>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut dropped = 0;

    let kept = records
        .into_iter()
        .filter(|record| {
            if seen.insert(record.name().to_string()) {
                true
            } else {
                warn!("Dropping duplicate record for '{}'", record.name());
                dropped += 1;
                false
            }
        })
        .collect();

    (kept, dropped)
}
