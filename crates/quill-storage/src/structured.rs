//! Durable structured store on SQLite.
//!
//! Three tables (documents, settings, samples) managed by `rusqlite_migration`,
//! which tracks the schema version in `PRAGMA user_version`. Opening a database
//! whose documents table is empty seeds document 1 with [`WELCOME_DOCUMENT`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use rusqlite_migration::{M, Migrations};

use crate::backend::BackendKind;
use crate::error::StorageError;
use crate::record::{
    CachedSample, Document, Record, Setting, WELCOME_DOCUMENT, WELCOME_DOCUMENT_ID,
};

#[derive(Debug)]
pub struct StructuredStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl StructuredStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::unavailable(BackendKind::Structured, e))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| StorageError::unavailable(BackendKind::Structured, e))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| StorageError::unavailable(BackendKind::Structured, e))?;

        Self::init(conn, Some(path.to_path_buf()))
    }

    /// A private database that lives as long as the store.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::unavailable(BackendKind::Structured, e))?;
        Self::init(conn, None)
    }

    fn init(mut conn: Connection, path: Option<PathBuf>) -> Result<Self, StorageError> {
        Self::migrations()
            .to_latest(&mut conn)
            .map_err(|e| StorageError::Migration {
                message: e.to_string(),
            })?;
        Self::seed(&conn)?;

        tracing::debug!(path = ?path, "structured store ready");
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    fn migrations() -> Migrations<'static> {
        Migrations::new(vec![M::up(include_str!(
            "structured/migrations/001_initial.sql"
        ))])
    }

    /// Insert the welcome document when there are no documents at all.
    fn seed(conn: &Connection) -> Result<(), StorageError> {
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(|e| StorageError::read_failed(BackendKind::Structured, e))?;
        if count == 0 {
            conn.execute(
                "INSERT INTO documents (id, content) VALUES (?1, ?2)",
                params![WELCOME_DOCUMENT_ID, WELCOME_DOCUMENT],
            )
            .map_err(|e| StorageError::write_failed(BackendKind::Structured, e))?;
            tracing::info!("seeded welcome document");
        }
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned {
            backend: BackendKind::Structured,
        })
    }

    fn read<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self.conn()?;
        f(&conn).map_err(|e| StorageError::read_failed(BackendKind::Structured, e))
    }

    fn write<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self.conn()?;
        f(&conn).map_err(|e| StorageError::write_failed(BackendKind::Structured, e))
    }

    pub fn get(&self, key: &str) -> Result<Option<Setting>, StorageError> {
        self.read(|conn| {
            conn.query_row(
                "SELECT key, value FROM settings WHERE key = ?1",
                params![key],
                |row| {
                    Ok(Setting {
                        key: row.get(0)?,
                        value: row.get(1)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn get_document(&self, id: i64) -> Result<Option<Document>, StorageError> {
        self.read(|conn| {
            conn.query_row(
                "SELECT id, content FROM documents WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Document {
                        id: row.get(0)?,
                        content: row.get(1)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn get_sample(&self, key: &str) -> Result<Option<CachedSample>, StorageError> {
        self.read(|conn| {
            conn.query_row(
                "SELECT key, content FROM samples WHERE key = ?1",
                params![key],
                |row| {
                    Ok(CachedSample {
                        key: row.get(0)?,
                        content: row.get(1)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Upsert into the table for the record's kind. Last write wins.
    pub fn put(&self, record: Record) -> Result<Record, StorageError> {
        self.write(|conn| match &record {
            Record::Setting(setting) => conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![setting.key, setting.value],
            ),
            Record::Document(document) => conn.execute(
                "INSERT INTO documents (id, content) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET content = excluded.content",
                params![document.id, document.content],
            ),
            Record::Sample(sample) => conn.execute(
                "INSERT INTO samples (key, content) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET content = excluded.content",
                params![sample.key, sample.content],
            ),
        })?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_valid() {
        assert!(StructuredStore::migrations().validate().is_ok());
    }

    #[test]
    fn fresh_database_seeds_welcome_document() {
        let store = StructuredStore::open_in_memory().unwrap();
        let doc = store.get_document(WELCOME_DOCUMENT_ID).unwrap().unwrap();
        assert_eq!(doc.content, WELCOME_DOCUMENT);
    }

    #[test]
    fn reopening_never_overwrites_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("quill.sqlite");

        {
            let store = StructuredStore::open(&path).unwrap();
            store.put(Document::new(1, "# Mine").into()).unwrap();
        }

        let store = StructuredStore::open(&path).unwrap();
        assert_eq!(store.get_document(1).unwrap().unwrap().content, "# Mine");
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn seeding_checks_count_not_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quill.sqlite");

        {
            let store = StructuredStore::open(&path).unwrap();
            let conn = store.conn().unwrap();
            conn.execute("DELETE FROM documents", []).unwrap();
            conn.execute(
                "INSERT INTO documents (id, content) VALUES (2, 'other')",
                [],
            )
            .unwrap();
        }

        let store = StructuredStore::open(&path).unwrap();
        assert_eq!(store.get_document(1).unwrap(), None);
        assert_eq!(store.get_document(2).unwrap().unwrap().content, "other");
    }

    #[test]
    fn settings_upsert_last_write_wins() {
        let store = StructuredStore::open_in_memory().unwrap();
        store.put(Setting::new("theme", "light").into()).unwrap();
        store.put(Setting::new("theme", "dark").into()).unwrap();
        assert_eq!(store.get("theme").unwrap(), Some(Setting::new("theme", "dark")));
    }

    #[test]
    fn tables_are_separate_namespaces() {
        let store = StructuredStore::open_in_memory().unwrap();
        store.put(CachedSample::new("hello", "# Sample").into()).unwrap();

        // `get` only ever reads the settings table.
        assert_eq!(store.get("hello").unwrap(), None);
        assert_eq!(
            store.get_sample("hello").unwrap(),
            Some(CachedSample::new("hello", "# Sample"))
        );
    }

    #[test]
    fn put_returns_the_stored_record() {
        let store = StructuredStore::open_in_memory().unwrap();
        let record = Record::from(Document::new(9, "nine"));
        assert_eq!(store.put(record.clone()).unwrap(), record);
    }
}
