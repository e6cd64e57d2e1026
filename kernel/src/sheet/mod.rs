// Sheet Data Model
//
// Document shapes persisted by the store and returned to clients.
// Field names follow the JSON wire format (camelCase).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Row count reported for a collection that has no saved table yet.
pub const DEFAULT_ROWS: i64 = 5;

/// Column count reported for a collection that has no saved table yet.
pub const DEFAULT_COLUMNS: i64 = 5;

/// A single non-empty cell. Cells not present in a table are empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEntry {
    pub row: i64,
    pub col: i64,
    #[serde(deserialize_with = "lenient_string")]
    pub value: String,
}

/// Accept any scalar as a cell value, storing its text form.
/// `null` becomes the empty string.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "cell value must be a scalar, got {other}"
        ))),
    }
}

/// Singleton record listing every known sheet, in insertion order.
///
/// Name uniqueness is maintained by the registry, not by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetMetadata {
    #[serde(default)]
    pub sheet_names: Vec<String>,
}

impl SheetMetadata {
    pub fn new(first: impl Into<String>) -> Self {
        Self {
            sheet_names: vec![first.into()],
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sheet_names.iter().any(|n| n == name)
    }

    /// Drop every occurrence of `name`. Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.sheet_names.len();
        self.sheet_names.retain(|n| n != name);
        self.sheet_names.len() != before
    }
}

/// Persisted grid for one sheet, keyed by `collection_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRecord {
    pub collection_name: String,
    pub rows: i64,
    pub columns: i64,
    #[serde(default)]
    pub data: Vec<CellEntry>,
}

/// Declared extent of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridExtent {
    pub rows: i64,
    pub columns: i64,
}

/// Client-facing view of a table: `{ metadata: { rows, columns }, data }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableView {
    pub metadata: GridExtent,
    pub data: Vec<CellEntry>,
}

impl TableView {
    /// Empty 5x5 grid served when a collection has never been saved.
    pub fn placeholder() -> Self {
        Self {
            metadata: GridExtent {
                rows: DEFAULT_ROWS,
                columns: DEFAULT_COLUMNS,
            },
            data: Vec::new(),
        }
    }
}

impl From<TableRecord> for TableView {
    fn from(record: TableRecord) -> Self {
        Self {
            metadata: GridExtent {
                rows: record.rows,
                columns: record.columns,
            },
            data: record.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_uses_camel_case_field_names() {
        let metadata = SheetMetadata::new("Budget");
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json, serde_json::json!({ "sheetNames": ["Budget"] }));
    }

    #[test]
    fn remove_reports_whether_name_was_listed() {
        let mut metadata = SheetMetadata {
            sheet_names: vec!["a".into(), "b".into()],
        };

        assert!(metadata.remove("a"));
        assert!(!metadata.remove("a"));
        assert_eq!(metadata.sheet_names, vec!["b".to_string()]);
    }

    #[test]
    fn table_record_without_data_parses_as_empty_grid() {
        let json = r#"{ "collectionName": "Sheet1", "rows": 2, "columns": 3 }"#;
        let record: TableRecord = serde_json::from_str(json).unwrap();
        assert!(record.data.is_empty());
        assert_eq!(record.columns, 3);
    }

    #[test]
    fn scalar_cell_values_are_stored_as_text() {
        let json = r#"[
            { "row": 0, "col": 0, "value": 42 },
            { "row": 0, "col": 1, "value": 1.5 },
            { "row": 1, "col": 0, "value": true },
            { "row": 1, "col": 1, "value": null }
        ]"#;
        let cells: Vec<CellEntry> = serde_json::from_str(json).unwrap();

        let values: Vec<_> = cells.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["42", "1.5", "true", ""]);
    }

    #[test]
    fn nested_cell_value_is_rejected() {
        let json = r#"{ "row": 0, "col": 0, "value": [1] }"#;
        assert!(serde_json::from_str::<CellEntry>(json).is_err());
    }

    #[test]
    fn placeholder_view_is_five_by_five() {
        let json = serde_json::to_value(TableView::placeholder()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "metadata": { "rows": 5, "columns": 5 }, "data": [] })
        );
    }
}
