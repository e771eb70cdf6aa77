//! Response schemas: the declared shape of a model reply for one annotation task.

use std::fmt;

use serde::Serialize;

/// A typed cell in a result table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Text(v) => write!(f, "{v}"),
        }
    }
}

/// One parsed row: the candidate key plus values in output-column order.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRow {
    pub key: String,
    pub values: Vec<FieldValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    /// Candidate name. Exactly one per tabular schema.
    Key,
    Text,
    /// Categorical value restricted to a fixed label set.
    Label(&'static [&'static str]),
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Whether the column lands in the result table. Echo columns (such as the
    /// institution repeated back by the prestige task) are validated then dropped.
    pub output: bool,
}

impl Column {
    pub fn key(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Key,
            output: false,
        }
    }

    pub fn label(name: &'static str, labels: &'static [&'static str]) -> Self {
        Self {
            name,
            kind: ColumnKind::Label(labels),
            output: true,
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Text,
            output: true,
        }
    }

    /// Parsed and checked, but not written to the result table.
    pub fn echo(mut self) -> Self {
        self.output = false;
        self
    }
}

/// Delimiter-separated rows with a fixed column order.
#[derive(Debug, Clone)]
pub struct TabularSchema {
    pub delimiter: u8,
    pub has_header: bool,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone)]
pub enum ResponseSchema {
    /// A single integer after the last `:` of the reply, for one candidate.
    SingleScore { field: &'static str },
    Tabular(TabularSchema),
}

impl ResponseSchema {
    /// Columns the result table carries besides `name`.
    pub fn output_columns(&self) -> Vec<String> {
        match self {
            ResponseSchema::SingleScore { field } => vec![field.to_string()],
            ResponseSchema::Tabular(t) => t
                .columns
                .iter()
                .filter(|c| c.output && c.kind != ColumnKind::Key)
                .map(|c| c.name.to_string())
                .collect(),
        }
    }

    /// Largest batch a reply of this shape can account for.
    pub fn max_batch(&self) -> Option<usize> {
        match self {
            ResponseSchema::SingleScore { .. } => Some(1),
            ResponseSchema::Tabular(_) => None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let ResponseSchema::Tabular(t) = self else {
            return Ok(());
        };
        if t.delimiter != b',' && t.delimiter != b';' {
            return Err(format!(
                "unsupported delimiter '{}'",
                char::from(t.delimiter)
            ));
        }
        let keys = t
            .columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Key)
            .count();
        if keys != 1 {
            return Err(format!("expected exactly one key column, found {keys}"));
        }
        if let Some(c) = t
            .columns
            .iter()
            .find(|c| matches!(c.kind, ColumnKind::Label(labels) if labels.is_empty()))
        {
            return Err(format!("label column '{}' has no labels", c.name));
        }
        Ok(())
    }
}
