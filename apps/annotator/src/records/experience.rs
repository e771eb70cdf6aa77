//! Years of experience, computed from `experience[].dates` without a model.

use chrono::{Datelike, Local, NaiveDate};
use serde_json::Value;

use crate::annotation::{AnnotationError, FieldValue, ResultTable};
use crate::annotation::schema::AnnotationRow;
use crate::models::Record;

pub const YEARS_EXPERIENCE_TASK: &str = "years_experience";

/// End dates meaning "still there".
const OPEN_ENDED: &[&str] = &["present", "current"];

/// Splits `YYYY-MM` into its parts. The month is optional so a bare year
/// still contributes whole years.
fn year_month(raw: &str, today: NaiveDate) -> Option<(i32, Option<u32>)> {
    let raw = raw.trim();
    if OPEN_ENDED.iter().any(|o| raw.eq_ignore_ascii_case(o)) {
        return Some((today.year(), Some(today.month())));
    }
    let mut parts = raw.split('-');
    let year = parts.next()?.trim().parse::<i32>().ok()?;
    let month = parts.next().and_then(|m| m.trim().parse::<u32>().ok());
    Some((year, month))
}

/// Sum over entries of the year span, plus the month span as a fraction when
/// the end month is not before the start month. Rounded to one decimal.
pub fn years_of_experience(experience: Option<&Value>, today: NaiveDate) -> f64 {
    let Some(entries) = experience.and_then(Value::as_array) else {
        return 0.0;
    };

    let mut total = 0.0;
    for dates in entries.iter().filter_map(|e| e.get("dates")) {
        let start = dates.get("start").and_then(Value::as_str);
        let end = dates.get("end").and_then(Value::as_str);
        let (Some(start), Some(end)) = (start, end) else {
            continue;
        };
        let (Some((start_year, start_month)), Some((end_year, end_month))) =
            (year_month(start, today), year_month(end, today))
        else {
            continue;
        };

        if start_year <= end_year {
            total += f64::from(end_year - start_year);
        }
        if let (Some(sm), Some(em)) = (start_month, end_month) {
            if sm <= em {
                total += f64::from(em - sm) / 12.0;
            }
        }
    }

    (total * 10.0).round() / 10.0
}

/// Per-task table with a `years_experience` float per record.
pub fn years_experience_table<'a>(
    records: impl IntoIterator<Item = &'a Record>,
) -> Result<ResultTable, AnnotationError> {
    years_experience_table_at(records, Local::now().date_naive())
}

pub fn years_experience_table_at<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    today: NaiveDate,
) -> Result<ResultTable, AnnotationError> {
    let rows = records.into_iter().map(|r| AnnotationRow {
        key: r.name().to_string(),
        values: vec![FieldValue::Float(years_of_experience(r.experience(), today))],
    });
    ResultTable::from_rows(
        YEARS_EXPERIENCE_TASK,
        vec![YEARS_EXPERIENCE_TASK.to_string()],
        rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn span(start: &str, end: &str) -> Value {
        json!({"dates": {"start": start, "end": end}})
    }

    #[test]
    fn test_sums_years_and_months() {
        let exp = json!([span("2018-01", "2020-07"), span("2020-08", "2021-08")]);
        assert_eq!(years_of_experience(Some(&exp), today()), 3.5);
    }

    #[test]
    fn test_month_wraparound_only_counts_years() {
        // 2019-11 → 2021-02: two years, months go backwards.
        let exp = json!([span("2019-11", "2021-02")]);
        assert_eq!(years_of_experience(Some(&exp), today()), 2.0);
    }

    #[test]
    fn test_present_means_today() {
        let exp = json!([span("2022-03", "Present")]);
        assert_eq!(years_of_experience(Some(&exp), today()), 2.3);
    }

    #[test]
    fn test_bad_dates_are_skipped() {
        let exp = json!([
            span("sometime", "2020-01"),
            {"dates": {"start": "2019-01"}},
            {"title": "no dates"},
            span("2015", "2017")
        ]);
        assert_eq!(years_of_experience(Some(&exp), today()), 2.0);
    }

    #[test]
    fn test_missing_experience_is_zero() {
        assert_eq!(years_of_experience(None, today()), 0.0);
        assert_eq!(years_of_experience(Some(&json!("lots")), today()), 0.0);
    }

    #[test]
    fn test_table_has_a_row_per_record() {
        let records = vec![
            Record::from_value(json!({
                "personal_info": {"name": "A"},
                "experience": [span("2020-01", "2021-01")]
            }))
            .unwrap(),
            Record::from_value(json!({"personal_info": {"name": "B"}})).unwrap(),
        ];
        let table = years_experience_table_at(&records, today()).unwrap();
        assert_eq!(table.columns(), &["years_experience"]);
        assert_eq!(table.get("A"), Some(&[FieldValue::Float(1.0)][..]));
        assert_eq!(table.get("B"), Some(&[FieldValue::Float(0.0)][..]));
    }
}
