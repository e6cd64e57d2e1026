// SQLite Document Store
//
// Stores each record as a JSON document in a two-table schema:
// a singleton metadata row and one row per sheet table.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{AddSheetOutcome, DocumentStore, SheetRemoval, StoreError};
use crate::sheet::{SheetMetadata, TableRecord};

/// Location string that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open `location`, which is either a file path or `:memory:`.
    pub fn open(location: &str) -> Result<Self, StoreError> {
        if location == IN_MEMORY {
            Self::open_in_memory()
        } else {
            Self::open_path(location)
        }
    }

    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sheet_metadata (
              id INTEGER PRIMARY KEY CHECK (id = 1),
              doc TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sheet_tables (
              collection_name TEXT PRIMARY KEY,
              doc TEXT NOT NULL
            );
            "#,
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn read_metadata(conn: &Connection) -> Result<Option<SheetMetadata>, StoreError> {
    let doc: Option<String> = conn
        .query_row("SELECT doc FROM sheet_metadata WHERE id = 1", [], |r| r.get(0))
        .optional()?;

    doc.map(|d| serde_json::from_str(&d)).transpose().map_err(Into::into)
}

fn write_metadata(conn: &Connection, metadata: &SheetMetadata) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO sheet_metadata (id, doc) VALUES (1, ?1)
         ON CONFLICT(id) DO UPDATE SET doc = excluded.doc",
        params![serde_json::to_string(metadata)?],
    )?;
    Ok(())
}

impl DocumentStore for SqliteStore {
    fn load_metadata(&self) -> Result<Option<SheetMetadata>, StoreError> {
        let conn = self.lock()?;
        read_metadata(&conn)
    }

    fn register_sheet(&self, name: &str) -> Result<AddSheetOutcome, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (metadata, outcome) = match read_metadata(&tx)? {
            None => (SheetMetadata::new(name), AddSheetOutcome::Created),
            Some(metadata) if metadata.contains(name) => return Ok(AddSheetOutcome::AlreadyExists),
            Some(mut metadata) => {
                metadata.sheet_names.push(name.to_string());
                (metadata, AddSheetOutcome::Appended)
            }
        };

        write_metadata(&tx, &metadata)?;
        tx.commit()?;

        Ok(outcome)
    }

    fn find_table(&self, collection: &str) -> Result<Option<TableRecord>, StoreError> {
        let conn = self.lock()?;
        let doc: Option<String> = conn
            .query_row(
                "SELECT doc FROM sheet_tables WHERE collection_name = ?1",
                params![collection],
                |r| r.get(0),
            )
            .optional()?;

        doc.map(|d| serde_json::from_str(&d)).transpose().map_err(Into::into)
    }

    fn upsert_table(&self, table: &TableRecord) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sheet_tables (collection_name, doc) VALUES (?1, ?2)
             ON CONFLICT(collection_name) DO UPDATE SET doc = excluded.doc",
            params![&table.collection_name, serde_json::to_string(table)?],
        )?;
        Ok(())
    }

    fn remove_sheet(&self, name: &str) -> Result<SheetRemoval, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut unlisted = false;
        if let Some(mut metadata) = read_metadata(&tx)? {
            unlisted = metadata.remove(name);
            write_metadata(&tx, &metadata)?;
        }

        let tables_deleted = tx.execute(
            "DELETE FROM sheet_tables WHERE collection_name = ?1",
            params![name],
        )?;

        tx.commit()?;

        Ok(SheetRemoval {
            unlisted,
            tables_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::CellEntry;

    fn table(collection: &str, rows: i64, value: &str) -> TableRecord {
        TableRecord {
            collection_name: collection.into(),
            rows,
            columns: rows,
            data: vec![CellEntry {
                row: 0,
                col: 0,
                value: value.into(),
            }],
        }
    }

    #[test]
    fn fresh_store_has_no_records() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.load_metadata().unwrap().is_none());
        assert!(store.find_table("Sheet1").unwrap().is_none());
    }

    #[test]
    fn register_sheet_creates_then_appends() {
        let store = SqliteStore::open(IN_MEMORY).unwrap();

        assert_eq!(store.register_sheet("a").unwrap(), AddSheetOutcome::Created);
        assert_eq!(store.register_sheet("b").unwrap(), AddSheetOutcome::Appended);
        assert_eq!(
            store.register_sheet("a").unwrap(),
            AddSheetOutcome::AlreadyExists
        );

        let metadata = store.load_metadata().unwrap().unwrap();
        assert_eq!(metadata.sheet_names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn concurrent_registrations_are_all_kept() {
        let store = SqliteStore::open_in_memory().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        store.register_sheet(&format!("w{worker}-{i}")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let names = store.load_metadata().unwrap().unwrap().sheet_names;
        assert_eq!(names.len(), 8 * 25);
    }

    #[test]
    fn registration_racing_removal_does_not_resurrect_name() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.register_sheet("X").unwrap();

        let remover = {
            let store = store.clone();
            std::thread::spawn(move || store.remove_sheet("X").unwrap())
        };
        let adder = {
            let store = store.clone();
            std::thread::spawn(move || store.register_sheet("Y").unwrap())
        };
        remover.join().unwrap();
        adder.join().unwrap();

        let names = store.load_metadata().unwrap().unwrap().sheet_names;
        assert_eq!(names, vec!["Y".to_string()]);
    }

    #[test]
    fn upsert_overwrites_whole_table() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_table(&table("Sheet1", 3, "x")).unwrap();

        let mut replacement = table("Sheet1", 2, "y");
        replacement.data.clear();
        store.upsert_table(&replacement).unwrap();

        assert_eq!(store.find_table("Sheet1").unwrap(), Some(replacement));
    }

    #[test]
    fn remove_sheet_without_table_still_unlists_name() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.register_sheet("ghost").unwrap();

        let removal = store.remove_sheet("ghost").unwrap();

        assert_eq!(
            removal,
            SheetRemoval {
                unlisted: true,
                tables_deleted: 0
            }
        );
        assert!(store.load_metadata().unwrap().unwrap().sheet_names.is_empty());
    }

    #[test]
    fn remove_sheet_deletes_only_matching_table() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_table(&table("keep", 1, "k")).unwrap();
        store.upsert_table(&table("drop", 1, "d")).unwrap();

        let removal = store.remove_sheet("drop").unwrap();

        assert!(!removal.unlisted);
        assert_eq!(removal.tables_deleted, 1);
        assert!(store.find_table("drop").unwrap().is_none());
        assert!(store.find_table("keep").unwrap().is_some());
    }
}
