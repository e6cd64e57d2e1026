// Sheet Registry
//
// Maintains the list of known sheet names in the metadata record
// and removes sheets together with their table data.

use crate::store::{DocumentStore, SheetRemoval, StoreError};

pub use crate::store::AddSheetOutcome;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("sheet not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

fn require_name(sheet_name: &str) -> Result<&str, RegistryError> {
    if sheet_name.is_empty() {
        return Err(RegistryError::Validation("Sheet name is required!".into()));
    }
    Ok(sheet_name)
}

/// Register `sheet_name` in the metadata record.
pub fn add_sheet<S: DocumentStore + ?Sized>(
    store: &S,
    sheet_name: &str,
) -> Result<AddSheetOutcome, RegistryError> {
    let name = require_name(sheet_name)?;

    let outcome = store.register_sheet(name)?;
    if !outcome.is_added() {
        tracing::debug!(sheet = name, "sheet already registered");
        return Ok(outcome);
    }

    tracing::info!(sheet = name, ?outcome, "sheet registered");

    Ok(outcome)
}

/// All registered sheet names, or none if nothing was ever added.
pub fn list_sheets<S: DocumentStore + ?Sized>(store: &S) -> Result<Vec<String>, RegistryError> {
    Ok(store
        .load_metadata()?
        .map(|m| m.sheet_names)
        .unwrap_or_default())
}

/// Unregister `sheet_name` and delete its table.
///
/// Returns `NotFound` when no table record existed. The name is still
/// removed from the metadata list in that case.
pub fn delete_sheet<S: DocumentStore + ?Sized>(
    store: &S,
    sheet_name: &str,
) -> Result<SheetRemoval, RegistryError> {
    let name = require_name(sheet_name)?;
    let removal = store.remove_sheet(name)?;

    if removal.tables_deleted == 0 {
        tracing::info!(sheet = name, unlisted = removal.unlisted, "no table to delete");
        return Err(RegistryError::NotFound(name.to_string()));
    }

    tracing::info!(sheet = name, unlisted = removal.unlisted, "sheet deleted");
    Ok(removal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::TableRecord;
    use crate::store::SqliteStore;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn first_add_creates_metadata() {
        let store = store();

        let outcome = add_sheet(&store, "Sheet1").unwrap();

        assert_eq!(outcome, AddSheetOutcome::Created);
        assert_eq!(list_sheets(&store).unwrap(), vec!["Sheet1".to_string()]);
    }

    #[test]
    fn duplicate_add_is_reported_and_ignored() {
        let store = store();
        add_sheet(&store, "Sheet1").unwrap();
        add_sheet(&store, "Sheet2").unwrap();

        let outcome = add_sheet(&store, "Sheet1").unwrap();

        assert_eq!(outcome, AddSheetOutcome::AlreadyExists);
        assert!(!outcome.is_added());
        assert_eq!(
            list_sheets(&store).unwrap(),
            vec!["Sheet1".to_string(), "Sheet2".to_string()]
        );
    }

    #[test]
    fn concurrent_adds_keep_every_name() {
        let store = store();

        let handles: Vec<_> = ["A", "B", "C", "D"]
            .into_iter()
            .map(|name| {
                let store = store.clone();
                std::thread::spawn(move || add_sheet(&store, name).unwrap())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_added());
        }

        let mut sheets = list_sheets(&store).unwrap();
        sheets.sort();
        assert_eq!(sheets, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn empty_name_is_rejected_without_writing() {
        let store = store();

        let err = add_sheet(&store, "").unwrap_err();

        assert!(matches!(err, RegistryError::Validation(_)));
        assert!(store.load_metadata().unwrap().is_none());
    }

    #[test]
    fn listing_without_metadata_is_empty() {
        assert!(list_sheets(&store()).unwrap().is_empty());
    }

    #[test]
    fn delete_removes_name_and_table() {
        let store = store();
        add_sheet(&store, "Sheet1").unwrap();
        store
            .upsert_table(&TableRecord {
                collection_name: "Sheet1".into(),
                rows: 1,
                columns: 1,
                data: vec![],
            })
            .unwrap();

        let removal = delete_sheet(&store, "Sheet1").unwrap();

        assert!(removal.unlisted);
        assert_eq!(removal.tables_deleted, 1);
        assert!(list_sheets(&store).unwrap().is_empty());
    }

    #[test]
    fn delete_without_table_is_not_found_but_unlists() {
        let store = store();
        add_sheet(&store, "Sheet1").unwrap();

        let err = delete_sheet(&store, "Sheet1").unwrap_err();

        assert!(matches!(err, RegistryError::NotFound(ref name) if name == "Sheet1"));
        assert!(list_sheets(&store).unwrap().is_empty());
    }

    #[test]
    fn delete_requires_name() {
        let err = delete_sheet(&store(), "").unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }
}
