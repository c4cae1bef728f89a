//! CSV export properties: parse(export(t)) == t for supported cell types, and
//! the on-disk artifact carries a sanitized, deterministic name.

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use querydeck::analysis::{parse_csv, to_csv_string, write_csv, Row, TabularResult};

/// Cell values that survive a CSV round trip: null, bool, i64, finite f64 with
/// an exact decimal form, and strings without surprises beyond quoting.
fn cell_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        // Halves stay exact through f64 formatting and re-parsing.
        (-1_000_000i64..1_000_000).prop_map(|n| json!(n as f64 + 0.5)),
        // Leading letter keeps the field from re-parsing as a number, bool
        // or empty cell.
        "x[a-zA-Z0-9 ]{0,10}".prop_map(Value::String),
    ]
}

fn table_strategy() -> impl Strategy<Value = TabularResult> {
    let columns = prop::collection::vec("[a-z][a-z0-9_]{0,8}", 1..5).prop_map(|mut names| {
        names.sort_unstable();
        names.dedup();
        names
    });

    (columns, 1usize..20).prop_flat_map(|(names, row_count)| {
        let row = prop::collection::vec(cell_strategy(), names.len()).prop_map(move |cells| {
            let mut row = Row::new();
            for (name, cell) in names.iter().zip(cells) {
                row.insert(name.clone(), cell);
            }
            row
        });
        prop::collection::vec(row, row_count).prop_map(TabularResult::new)
    })
}

proptest! {
    #[test]
    fn roundtrip_preserves_table(table in table_strategy()) {
        let csv = to_csv_string(&table).unwrap().unwrap();
        let parsed = parse_csv(&csv).unwrap();
        prop_assert_eq!(parsed, table);
    }

    #[test]
    fn export_is_deterministic(table in table_strategy()) {
        let first = to_csv_string(&table).unwrap().unwrap();
        let second = to_csv_string(&table).unwrap().unwrap();
        prop_assert_eq!(first, second);
    }
}

#[test]
fn empty_table_exports_nothing() {
    assert!(to_csv_string(&TabularResult::default()).unwrap().is_none());
}

#[test]
fn artifact_name_is_sanitized() {
    let mut row = Map::new();
    row.insert("a".to_string(), json!(1));
    let table = TabularResult::new(vec![row]);

    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&table, dir.path(), "01JF/../X")
        .unwrap()
        .unwrap();

    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("query_results_01JF____X.csv")
    );
    assert!(path.starts_with(dir.path()));

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.trim(), "a\n1");
}

#[test]
fn quoted_fields_roundtrip() {
    let table = TabularResult::from_value(&json!([
        {"label": "has, comma", "note": "says \"hi\""},
        {"label": "plain", "note": null},
    ]));

    let csv = to_csv_string(&table).unwrap().unwrap();
    let parsed = parse_csv(&csv).unwrap();
    assert_eq!(parsed, table);
}
