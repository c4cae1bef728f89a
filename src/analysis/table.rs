//! Tabular result representation.
//!
//! A result set is an ordered sequence of rows, each row a JSON object mapping
//! column name to a scalar. The header is fixed by the first row: its key
//! order is the column order everywhere downstream (serde_json is built with
//! `preserve_order` so that order survives deserialization).

use serde_json::Value;

/// One result row: column name → scalar value.
pub type Row = serde_json::Map<String, Value>;

/// An in-memory tabular result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularResult {
    rows: Vec<Row>,
}

impl TabularResult {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Build from a raw platform payload.
    ///
    /// Expects a JSON array of objects. Anything else (absent, null, scalar,
    /// or non-object elements) degrades to the empty result — malformed
    /// payloads become "no data", never a fault.
    pub fn from_value(value: &Value) -> Self {
        let Some(items) = value.as_array() else {
            if !value.is_null() {
                tracing::warn!("result payload is not row-shaped, treating as empty");
            }
            return Self::default();
        };

        let rows = items
            .iter()
            .filter_map(|item| item.as_object().cloned())
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in first-row key order. Keys appearing only in later rows
    /// are not part of the header — a documented approximation for
    /// heterogeneous row shapes from the upstream source.
    pub fn columns(&self) -> Vec<String> {
        match self.rows.first() {
            Some(row) => row.keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Cell lookup; rows missing the key read as null.
    pub fn cell<'a>(&'a self, row: &'a Row, column: &str) -> &'a Value {
        row.get(column).unwrap_or(&Value::Null)
    }

    /// Columns where every non-null value is a JSON number (and at least one
    /// value is). Non-numeric columns are excluded from all numeric stats.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns()
            .into_iter()
            .filter(|col| {
                let mut saw_number = false;
                for row in &self.rows {
                    match row.get(col.as_str()) {
                        Some(Value::Number(_)) => saw_number = true,
                        Some(Value::Null) | None => {}
                        Some(_) => return false,
                    }
                }
                saw_number
            })
            .collect()
    }

    /// Numeric values of a column in row order, nulls skipped.
    pub fn numeric_values(&self, column: &str) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(column).and_then(Value::as_f64))
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn table(rows: Vec<Value>) -> TabularResult {
        TabularResult::from_value(&Value::Array(rows))
    }

    #[test]
    fn test_columns_follow_first_row_order() {
        let t = table(vec![
            json!({"day": "2026-01-01", "volume": 10, "chain": "base"}),
            json!({"chain": "op", "volume": 20, "day": "2026-01-02"}),
        ]);
        assert_eq!(t.columns(), vec!["day", "volume", "chain"]);
    }

    #[test]
    fn test_later_row_extra_keys_ignored() {
        let t = table(vec![
            json!({"a": 1}),
            json!({"a": 2, "b": "extra"}),
        ]);
        assert_eq!(t.columns(), vec!["a"]);
    }

    #[test]
    fn test_missing_keys_read_null() {
        let t = table(vec![json!({"a": 1, "b": 2}), json!({"a": 3})]);
        assert_eq!(t.cell(&t.rows()[1], "b"), &Value::Null);
    }

    #[test]
    fn test_malformed_payload_degrades_to_empty() {
        assert!(TabularResult::from_value(&json!(null)).is_empty());
        assert!(TabularResult::from_value(&json!("oops")).is_empty());
        assert!(TabularResult::from_value(&json!({"rows": []})).is_empty());
    }

    #[test]
    fn test_numeric_column_detection() {
        let t = table(vec![
            json!({"amount": 1.5, "label": "a", "mixed": 1, "sparse": null}),
            json!({"amount": 2, "label": "b", "mixed": "x", "sparse": 4}),
        ]);
        assert_eq!(t.numeric_columns(), vec!["amount", "sparse"]);
    }

    #[test]
    fn test_numeric_values_skip_nulls() {
        let t = table(vec![
            json!({"v": 1}),
            json!({"v": null}),
            json!({"v": 3}),
        ]);
        assert_eq!(t.numeric_values("v"), vec![1.0, 3.0]);
    }
}
