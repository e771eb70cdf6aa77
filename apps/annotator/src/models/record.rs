use serde::Serialize;
use serde_json::Value;

/// One candidate résumé. The document itself is opaque; only the fields the
/// prompt builders read have accessors. Never mutated once loaded.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Record {
    document: Value,
    #[serde(skip)]
    name: String,
}

/// Primary institution as shown to the prestige task.
#[derive(Debug, Clone, PartialEq)]
pub struct Institution {
    pub name: String,
    pub location: String,
}

impl Record {
    /// Wraps a raw document. Returns `None` when `personal_info.name` is
    /// missing or blank, since the name is the candidate key.
    pub fn from_value(document: Value) -> Option<Self> {
        let name = document
            .get("personal_info")
            .and_then(|p| p.get("name"))
            .and_then(|n| n.as_str())
            .map(str::trim)
            .filter(|n| !n.is_empty())?
            .to_string();
        Some(Self { document, name })
    }

    /// Candidate key.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn experience(&self) -> Option<&Value> {
        self.document.get("experience")
    }

    pub fn skills(&self) -> Option<&Value> {
        self.document.get("skills")
    }

    /// First education entry's institution, with "Unknown" standing in for
    /// missing parts.
    pub fn primary_institution(&self) -> Institution {
        let institution = self
            .document
            .get("education")
            .and_then(|e| e.get(0))
            .and_then(|e| e.get("institution"));
        let field = |key: &str| {
            institution
                .and_then(|i| i.get(key))
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("Unknown")
                .to_string()
        };
        Institution {
            name: field("name"),
            location: field("location"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_reads_name() {
        let record = Record::from_value(json!({"personal_info": {"name": " Jane Kim "}})).unwrap();
        assert_eq!(record.name(), "Jane Kim");
    }

    #[test]
    fn test_from_value_without_name_is_none() {
        assert!(Record::from_value(json!({"personal_info": {"email": "a@b.c"}})).is_none());
        assert!(Record::from_value(json!({"personal_info": {"name": "  "}})).is_none());
        assert!(Record::from_value(json!({"skills": []})).is_none());
    }

    #[test]
    fn test_primary_institution_first_entry() {
        let record = Record::from_value(json!({
            "personal_info": {"name": "Kevin Diggs"},
            "education": [
                {"institution": {"name": "Boston University", "location": "Boston, MA"}},
                {"institution": {"name": "Other", "location": "Elsewhere"}}
            ]
        }))
        .unwrap();
        assert_eq!(
            record.primary_institution(),
            Institution {
                name: "Boston University".to_string(),
                location: "Boston, MA".to_string()
            }
        );
    }

    #[test]
    fn test_primary_institution_missing_is_unknown() {
        let record = Record::from_value(json!({"personal_info": {"name": "A"}})).unwrap();
        let inst = record.primary_institution();
        assert_eq!(inst.name, "Unknown");
        assert_eq!(inst.location, "Unknown");
    }

    #[test]
    fn test_serializes_as_original_document() {
        let doc = json!({"personal_info": {"name": "A"}, "skills": ["Rust"]});
        let record = Record::from_value(doc.clone()).unwrap();
        assert_eq!(serde_json::to_value(&record).unwrap(), doc);
    }
}
