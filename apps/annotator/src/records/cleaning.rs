use serde_json::Value;

/// Placeholder strings that count as empty.
const EMPTY_MARKERS: &[&str] = &["n/a", "unknown"];

/// True if a value carries meaningful content.
///
/// Null, blank strings, placeholder strings, and containers holding any empty
/// value are empty. Numbers and booleans always count as content.
pub fn is_nonempty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(_) | Value::Number(_) => true,
        Value::String(s) => {
            let s = s.trim();
            !s.is_empty() && !EMPTY_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m))
        }
        Value::Array(items) => items.iter().all(is_nonempty),
        Value::Object(map) => map.values().all(is_nonempty),
    }
}

/// A document is empty when its `personal_info` block is. Documents without
/// that block are left for the name check to reject.
pub fn record_is_empty(document: &Value) -> bool {
    document
        .get("personal_info")
        .is_some_and(|info| !is_nonempty(info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert!(!is_nonempty(&Value::Null));
        assert!(is_nonempty(&json!(false)));
        assert!(is_nonempty(&json!(0)));
        assert!(is_nonempty(&json!("Rust")));
    }

    #[test]
    fn test_placeholder_strings_are_empty() {
        assert!(!is_nonempty(&json!("  ")));
        assert!(!is_nonempty(&json!("N/A")));
        assert!(!is_nonempty(&json!("Unknown")));
    }

    #[test]
    fn test_container_with_any_empty_leaf_is_empty() {
        assert!(!is_nonempty(&json!({"name": "A", "email": ""})));
        assert!(!is_nonempty(&json!(["a", null])));
        assert!(is_nonempty(&json!({"name": "A", "tags": ["x"]})));
    }

    #[test]
    fn test_empty_containers_count_as_content() {
        // Vacuously true, matching how the containers check every element.
        assert!(is_nonempty(&json!([])));
        assert!(is_nonempty(&json!({})));
    }

    #[test]
    fn test_record_is_empty_checks_personal_info_only() {
        assert!(record_is_empty(&json!({"personal_info": {"name": "n/a"}})));
        assert!(!record_is_empty(&json!({"personal_info": {"name": "Jane"}, "skills": null})));
        assert!(!record_is_empty(&json!({"skills": ["Rust"]})));
    }
}
