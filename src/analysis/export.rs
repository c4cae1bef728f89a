//! CSV export and re-ingest.
//!
//! Row-major, header row = column names in first-row key order, UTF-8, one
//! record per data row. Exports are re-parseable into an equivalent
//! `TabularResult` (modulo type stringification): `parse_csv` infers integers,
//! floats and booleans and reads empty cells as null.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::table::{Row, TabularResult};
use crate::types::Result;

/// Render a result set as a CSV document. Empty input yields `None` — an
/// explicit no-data outcome instead of a headerless artifact.
pub fn to_csv_string(result: &TabularResult) -> Result<Option<String>> {
    if result.is_empty() {
        return Ok(None);
    }

    let columns = result.columns();
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&columns)?;

    for row in result.rows() {
        let record: Vec<String> = columns
            .iter()
            .map(|col| cell_to_field(result.cell(row, col)))
            .collect();
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| crate::types::Error::validation(format!("csv flush failed: {}", e)))?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Write one artifact per completed job, named deterministically from the job
/// identifier. Returns the path, or `None` when there is no data to export.
pub fn write_csv(result: &TabularResult, export_dir: &Path, job_id: &str) -> Result<Option<PathBuf>> {
    let Some(csv) = to_csv_string(result)? else {
        return Ok(None);
    };

    std::fs::create_dir_all(export_dir)?;
    let path = export_dir.join(format!("query_results_{}.csv", sanitize_job_id(job_id)));
    std::fs::write(&path, csv)?;
    tracing::info!(path = %path.display(), rows = result.row_count(), "exported result set");
    Ok(Some(path))
}

/// Parse a CSV document produced by [`to_csv_string`] back into a result set.
pub fn parse_csv(text: &str) -> Result<TabularResult> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = Row::new();
        for (header, field) in headers.iter().zip(record.iter()) {
            row.insert(header.to_string(), field_to_cell(field));
        }
        rows.push(row);
    }
    Ok(TabularResult::new(rows))
}

fn cell_to_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn field_to_cell(field: &str) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    if field == "true" {
        return Value::Bool(true);
    }
    if field == "false" {
        return Value::Bool(false);
    }
    if let Ok(i) = field.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = field.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    Value::String(field.to_string())
}

/// Job ids come from the platform verbatim; keep the filename shell-safe.
fn sanitize_job_id(job_id: &str) -> String {
    job_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn table(rows: Vec<Value>) -> TabularResult {
        TabularResult::from_value(&Value::Array(rows))
    }

    #[test]
    fn test_empty_result_exports_nothing() {
        assert!(to_csv_string(&TabularResult::default()).unwrap().is_none());
    }

    #[test]
    fn test_header_follows_first_row_order() {
        let t = table(vec![json!({"b": 1, "a": 2})]);
        let csv = to_csv_string(&t).unwrap().unwrap();
        assert!(csv.starts_with("b,a\n"));
    }

    #[test]
    fn test_roundtrip_preserves_shape_and_cells() {
        let t = table(vec![
            json!({"day": "2026-01-01", "volume": 42, "ratio": 1.5, "flagged": true, "note": null}),
            json!({"day": "2026-01-02", "volume": -7, "ratio": 0.25, "flagged": false, "note": "ok"}),
        ]);
        let csv = to_csv_string(&t).unwrap().unwrap();
        let parsed = parse_csv(&csv).unwrap();

        assert_eq!(parsed.row_count(), t.row_count());
        assert_eq!(parsed.columns(), t.columns());
        assert_eq!(parsed, t);
    }

    #[test]
    fn test_missing_keys_export_as_empty_cells() {
        let t = table(vec![json!({"a": 1, "b": "x"}), json!({"a": 2})]);
        let csv = to_csv_string(&t).unwrap().unwrap();
        let parsed = parse_csv(&csv).unwrap();
        assert_eq!(parsed.rows()[1].get("b"), Some(&Value::Null));
    }

    #[test]
    fn test_fields_with_commas_and_quotes_survive() {
        let t = table(vec![json!({"label": "a,b \"quoted\"", "n": 1})]);
        let csv = to_csv_string(&t).unwrap().unwrap();
        let parsed = parse_csv(&csv).unwrap();
        assert_eq!(
            parsed.rows()[0].get("label"),
            Some(&Value::String("a,b \"quoted\"".to_string()))
        );
    }

    #[test]
    fn test_write_csv_names_file_from_job_id() {
        let dir = tempfile::tempdir().unwrap();
        let t = table(vec![json!({"a": 1})]);
        let path = write_csv(&t, dir.path(), "01JF/../X").unwrap().unwrap();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("query_results_01JF____X.csv")
        );
        assert!(path.exists());
    }

    #[test]
    fn test_write_csv_empty_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&TabularResult::default(), dir.path(), "job").unwrap();
        assert!(path.is_none());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
