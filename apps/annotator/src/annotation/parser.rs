//! Response Parser: turns a raw model reply into typed rows for a schema.
//!
//! Any deviation from the declared shape is an error for the whole reply.
//! Nothing here tries to repair text; the caller re-queries instead.

use std::collections::HashSet;

use thiserror::Error;

use super::schema::{AnnotationRow, ColumnKind, FieldValue, ResponseSchema, TabularSchema};

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Row count differs from the number of candidates in the prompt.
    #[error("batch integrity violated: expected {expected} rows, got {actual}")]
    BatchIntegrity { expected: usize, actual: usize },

    /// Right row count, but the rows do not name exactly the prompt's candidates.
    #[error("batch integrity violated: {0}")]
    CandidateMismatch(String),
}

/// Parses `reply` for the candidates named in the originating prompt.
/// On success the rows cover every candidate exactly once.
pub fn parse_reply(
    reply: &str,
    schema: &ResponseSchema,
    candidates: &[String],
) -> Result<Vec<AnnotationRow>, ParseError> {
    match schema {
        ResponseSchema::SingleScore { .. } => {
            if candidates.len() != 1 {
                return Err(ParseError::BatchIntegrity {
                    expected: candidates.len(),
                    actual: 1,
                });
            }
            let score = parse_single_score(reply)?;
            Ok(vec![AnnotationRow {
                key: candidates[0].clone(),
                values: vec![FieldValue::Integer(score)],
            }])
        }
        ResponseSchema::Tabular(tabular) => parse_tabular(reply, tabular, candidates),
    }
}

/// Takes the text after the last `:`, cuts at a stray backslash, and strips
/// whitespace and trailing non-digit characters before parsing an integer.
pub fn parse_single_score(reply: &str) -> Result<i64, ParseError> {
    // rsplit always yields at least one piece.
    let tail = reply.rsplit(':').next().unwrap_or(reply);
    let tail = tail.split('\\').next().unwrap_or(tail);
    let cleaned = tail
        .trim()
        .trim_end_matches(|c: char| !c.is_ascii_digit())
        .trim();

    cleaned.parse::<i64>().map_err(|_| {
        ParseError::Malformed(format!(
            "expected an integer score, got {:?}",
            truncate(reply, 80)
        ))
    })
}

fn parse_tabular(
    reply: &str,
    schema: &TabularSchema,
    candidates: &[String],
) -> Result<Vec<AnnotationRow>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(schema.delimiter)
        .has_headers(schema.has_header)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reply.as_bytes());

    let width = schema.columns.len();

    if schema.has_header {
        let headers = reader
            .headers()
            .map_err(|e| ParseError::Malformed(format!("unreadable header: {e}")))?;
        let matches = headers.len() == width
            && headers
                .iter()
                .zip(&schema.columns)
                .all(|(field, column)| field.eq_ignore_ascii_case(column.name));
        if !matches {
            let expected: Vec<&str> = schema.columns.iter().map(|c| c.name).collect();
            return Err(ParseError::Malformed(format!(
                "header {:?} does not match {:?}",
                headers.iter().collect::<Vec<_>>(),
                expected
            )));
        }
    }

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ParseError::Malformed(format!("row {}: {e}", i + 1)))?;
        // Whitespace-only lines survive the reader as one empty field.
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() != width {
            return Err(ParseError::Malformed(format!(
                "row {} has {} fields, expected {}",
                i + 1,
                record.len(),
                width
            )));
        }

        let mut key = None;
        let mut values = Vec::new();
        for (column, raw) in schema.columns.iter().zip(record.iter()) {
            let value = match column.kind {
                ColumnKind::Key => {
                    if raw.is_empty() {
                        return Err(ParseError::Malformed(format!("row {} has no name", i + 1)));
                    }
                    key = Some(raw.to_string());
                    continue;
                }
                ColumnKind::Text => FieldValue::Text(raw.to_string()),
                ColumnKind::Label(labels) => {
                    if !labels.contains(&raw) {
                        return Err(ParseError::Malformed(format!(
                            "row {}: '{}' is not a valid {} (expected one of {})",
                            i + 1,
                            raw,
                            column.name,
                            labels.join("/")
                        )));
                    }
                    FieldValue::Text(raw.to_string())
                }
            };
            if column.output {
                values.push(value);
            }
        }

        // validate() guarantees exactly one key column.
        let key = key.ok_or_else(|| ParseError::Malformed("schema has no key column".to_string()))?;
        rows.push(AnnotationRow { key, values });
    }

    if rows.len() != candidates.len() {
        return Err(ParseError::BatchIntegrity {
            expected: candidates.len(),
            actual: rows.len(),
        });
    }

    check_candidates(&rows, candidates)?;
    Ok(rows)
}

/// Each row must name a distinct candidate from the prompt.
fn check_candidates(rows: &[AnnotationRow], candidates: &[String]) -> Result<(), ParseError> {
    let expected: HashSet<&str> = candidates.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::new();

    for row in rows {
        if !expected.contains(row.key.as_str()) {
            return Err(ParseError::CandidateMismatch(format!(
                "'{}' was not in the prompt",
                row.key
            )));
        }
        if !seen.insert(row.key.as_str()) {
            return Err(ParseError::CandidateMismatch(format!(
                "'{}' appears more than once",
                row.key
            )));
        }
    }
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
