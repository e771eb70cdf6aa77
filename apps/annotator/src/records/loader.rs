use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;

/// Reads raw documents from `path`: JSON Lines when the extension is `.jsonl`,
/// otherwise a single JSON array.
pub fn load_documents(path: &Path) -> Result<Vec<Value>, AppError> {
    let text = fs::read_to_string(path)?;
    let is_jsonl = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jsonl"));

    let documents = if is_jsonl {
        parse_jsonl(&text)
    } else {
        parse_array(&text)?
    };

    info!(
        "Loaded {} documents from {}",
        documents.len(),
        path.display()
    );
    Ok(documents)
}

fn parse_array(text: &str) -> Result<Vec<Value>, AppError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Array(items) => Ok(items),
        other => Err(AppError::Input(format!(
            "expected a JSON array of records, found {}",
            json_kind(&other)
        ))),
    }
}

/// Blank lines are ignored; unparseable lines are skipped with a warning.
fn parse_jsonl(text: &str) -> Vec<Value> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(i, line)| match serde_json::from_str(line.trim()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Failed to parse JSON on line {}: {}", i + 1, e);
                None
            }
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_jsonl_skips_blank_and_bad_lines() {
        let text = "{\"a\":1}\n\n not json\n{\"a\":2}\n";
        let docs = parse_jsonl(text);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["a"], 2);
    }

    #[test]
    fn test_array_file_loads() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"[{{"personal_info":{{"name":"A"}}}},{{"personal_info":{{"name":"B"}}}}]"#)
            .unwrap();
        let docs = load_documents(file.path()).unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_jsonl_file_detected_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        writeln!(file, r#"{{"personal_info":{{"name":"A"}}}}"#).unwrap();
        writeln!(file, r#"{{"personal_info":{{"name":"B"}}}}"#).unwrap();
        let docs = load_documents(file.path()).unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_non_array_json_is_input_error() {
        let err = parse_array(r#"{"personal_info":{}}"#).unwrap_err();
        assert_eq!(err.code(), "INPUT_ERROR");
        assert!(err.to_string().contains("an object"));
    }
}
