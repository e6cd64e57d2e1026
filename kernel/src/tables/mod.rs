// Table Store
//
// Reads and overwrites the grid stored for a collection.

use serde::{Deserialize, Serialize};

use crate::sheet::{CellEntry, TableRecord, TableView, DEFAULT_COLUMNS, DEFAULT_ROWS};
use crate::store::{DocumentStore, StoreError};

/// Replacement contents for a table. Saved as-is, without bounds checks.
///
/// A field left out keeps its stored value, or the placeholder value
/// when the collection has no table yet. Supplied cell data always
/// replaces the stored cells wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableUpdate {
    #[serde(default)]
    pub rows: Option<i64>,
    #[serde(default)]
    pub columns: Option<i64>,
    #[serde(default)]
    pub data: Option<Vec<CellEntry>>,
}

impl TableUpdate {
    pub fn full(rows: i64, columns: i64, data: Vec<CellEntry>) -> Self {
        Self {
            rows: Some(rows),
            columns: Some(columns),
            data: Some(data),
        }
    }

    fn is_complete(&self) -> bool {
        self.rows.is_some() && self.columns.is_some() && self.data.is_some()
    }
}

/// Load the table for `collection`, or the empty placeholder grid.
pub fn get_table<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
) -> Result<TableView, StoreError> {
    match store.find_table(collection)? {
        Some(record) => Ok(record.into()),
        None => {
            tracing::debug!(collection, "no table saved, serving placeholder");
            Ok(TableView::placeholder())
        }
    }
}

/// Replace the whole table for `collection`.
pub fn save_table<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
    update: TableUpdate,
) -> Result<(), StoreError> {
    let previous = if update.is_complete() {
        None
    } else {
        store.find_table(collection)?
    };

    let record = match previous {
        Some(previous) => TableRecord {
            collection_name: previous.collection_name,
            rows: update.rows.unwrap_or(previous.rows),
            columns: update.columns.unwrap_or(previous.columns),
            data: update.data.unwrap_or(previous.data),
        },
        None => TableRecord {
            collection_name: collection.to_string(),
            rows: update.rows.unwrap_or(DEFAULT_ROWS),
            columns: update.columns.unwrap_or(DEFAULT_COLUMNS),
            data: update.data.unwrap_or_default(),
        },
    };

    store.upsert_table(&record)?;
    tracing::debug!(collection, cells = record.data.len(), "table saved");

    Ok(())
}
