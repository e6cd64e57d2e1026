// Document Store Abstraction
//
// Durability contract for sheet metadata and sheet tables.
// The registry and table store only talk to this trait.

pub mod sqlite;

use crate::sheet::{SheetMetadata, TableRecord};

pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store connection lock poisoned")]
    Poisoned,
}

/// Result of registering a sheet name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddSheetOutcome {
    /// No metadata record existed; one was created holding this name.
    Created,

    /// The name was appended to the existing list.
    Appended,

    /// The name was already listed. Nothing was written.
    AlreadyExists,
}

impl AddSheetOutcome {
    pub fn is_added(&self) -> bool {
        !matches!(self, AddSheetOutcome::AlreadyExists)
    }
}

/// Outcome of removing a sheet from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetRemoval {
    /// The name was listed in the metadata record and has been dropped.
    pub unlisted: bool,

    /// Number of table records deleted.
    pub tables_deleted: usize,
}

/// Storage backend for sheets.
///
/// Implementations must:
/// - Keep at most one metadata record
/// - Never list a sheet name twice
/// - Keep at most one table record per collection name after `upsert_table`
/// - Replace a table record wholesale on upsert (no cell merging)
pub trait DocumentStore: Send + Sync {
    /// Load the metadata record, if one has ever been written.
    fn load_metadata(&self) -> Result<Option<SheetMetadata>, StoreError>;

    /// Append `name` to the metadata record unless already listed,
    /// creating the record if needed. The check and the write are atomic
    /// with respect to every other store operation.
    fn register_sheet(&self, name: &str) -> Result<AddSheetOutcome, StoreError>;

    /// Find the table record for `collection`.
    fn find_table(&self, collection: &str) -> Result<Option<TableRecord>, StoreError>;

    /// Insert or fully overwrite the table record keyed by its collection name.
    fn upsert_table(&self, table: &TableRecord) -> Result<(), StoreError>;

    /// Drop `name` from the metadata record and delete its table record.
    ///
    /// Both steps are applied even when no table record exists.
    fn remove_sheet(&self, name: &str) -> Result<SheetRemoval, StoreError>;
}
