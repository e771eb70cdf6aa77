//! CSV outputs: one appendable file per (model, task) plus the joined table.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::annotation::{FinalTable, ModelTarget, ResultSink, ResultTable};
use crate::errors::AppError;

const KEY_COLUMN: &str = "name";

/// Makes a model identifier safe to use in a file name.
pub fn sanitize_model(model: &str) -> String {
    model.replace(['/', ':'], "_")
}

pub struct CsvResultWriter {
    out_dir: PathBuf,
}

impl CsvResultWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)?;
        Ok(Self { out_dir })
    }

    pub fn task_path(&self, model: &str, task: &str) -> PathBuf {
        self.out_dir
            .join(format!("{}_{}.csv", sanitize_model(model), task))
    }

    pub fn final_path(&self, model: &str) -> PathBuf {
        self.out_dir
            .join(format!("{}_final.csv", sanitize_model(model)))
    }

    /// Appends `table` to its (model, task) file. The header is written only
    /// when the file is new or empty.
    pub fn append_task(&self, model: &str, table: &ResultTable) -> Result<PathBuf, AppError> {
        let path = self.task_path(model, table.task());
        let needs_header = !has_content(&path)?;

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(
                std::iter::once(KEY_COLUMN).chain(table.columns().iter().map(String::as_str)),
            )?;
        }
        for (key, values) in table.rows() {
            let mut record = vec![key.to_string()];
            record.extend(values.iter().map(ToString::to_string));
            writer.write_record(&record)?;
        }
        writer.flush()?;

        info!("Wrote {} rows to {}", table.len(), path.display());
        Ok(path)
    }

    /// Writes the joined table, replacing any earlier file. Null cells are empty.
    pub fn write_final(&self, model: &str, table: &FinalTable) -> Result<PathBuf, AppError> {
        let path = self.final_path(model);
        let mut writer = csv::Writer::from_path(&path)?;

        writer.write_record(
            std::iter::once(KEY_COLUMN).chain(table.columns().iter().map(String::as_str)),
        )?;
        for (key, cells) in table.rows() {
            let mut record = vec![key.to_string()];
            record.extend(
                cells
                    .iter()
                    .map(|c| c.as_ref().map(ToString::to_string).unwrap_or_default()),
            );
            writer.write_record(&record)?;
        }
        writer.flush()?;

        info!("Wrote final table ({} rows) to {}", table.len(), path.display());
        Ok(path)
    }
}

impl ResultSink for CsvResultWriter {
    fn task_completed(&mut self, target: &ModelTarget, table: &ResultTable) -> Result<(), AppError> {
        self.append_task(&target.model, table).map(|_| ())
    }
}

fn has_content(path: &Path) -> Result<bool, AppError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len() > 0),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::schema::AnnotationRow;
    use crate::annotation::FieldValue;
    use crate::llm_client::Backend;
    use crate::models::Record;
    use serde_json::json;

    fn score_table(rows: &[(&str, i64)]) -> ResultTable {
        ResultTable::from_rows(
            "fit_score",
            vec!["score".to_string()],
            rows.iter().map(|(k, v)| AnnotationRow {
                key: k.to_string(),
                values: vec![FieldValue::Integer(*v)],
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_sanitize_model() {
        assert_eq!(sanitize_model("meta-llama/llama-4:scout"), "meta-llama_llama-4_scout");
        assert_eq!(sanitize_model("llama3"), "llama3");
    }

    #[test]
    fn test_append_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvResultWriter::new(dir.path()).unwrap();
        let target = ModelTarget::new("qwen:7b", Backend::Local);

        writer.task_completed(&target, &score_table(&[("A", 85)])).unwrap();
        writer.task_completed(&target, &score_table(&[("B", 40)])).unwrap();

        let text = fs::read_to_string(dir.path().join("qwen_7b_fit_score.csv")).unwrap();
        assert_eq!(text, "name,score\nA,85\nB,40\n");
    }

    #[test]
    fn test_final_table_leaves_nulls_blank_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CsvResultWriter::new(dir.path()).unwrap();
        let records = vec![
            Record::from_value(json!({"personal_info": {"name": "A"}})).unwrap(),
            Record::from_value(json!({"personal_info": {"name": "B, Jr."}})).unwrap(),
        ];
        let mut table = FinalTable::new(&records);
        table.left_join(&score_table(&[("A", 85)]));

        writer.write_final("llama3", &table).unwrap();
        let path = writer.write_final("llama3", &table).unwrap();

        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text, "name,score\nA,85\n\"B, Jr.\",\n");
    }
}
