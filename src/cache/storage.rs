//! Durable document storage for the dedup journals
//!
//! Journals are read and written as whole documents keyed by name. Two
//! backends are provided: a single SQLite database (default) and plain JSON
//! files laid out the way earlier deployments wrote them.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::CacheError;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

const DB_FILE: &str = "journal.db";

type Result<T> = std::result::Result<T, CacheError>;

/// Read-whole / write-whole storage for named documents.
///
/// Implementations are synchronous; async callers go through the blocking
/// pool. Writes to the same store never interleave.
pub trait DocumentStore: Send + Sync {
    /// The stored document, or `None` if it was never written.
    fn read(&self, name: &str) -> Result<Option<String>>;

    /// Replace a document with `body`.
    fn write(&self, name: &str, body: &str) -> Result<()>;

    /// Human-readable location for status output.
    fn location(&self) -> String;
}

fn lock_poisoned<T>(_: std::sync::PoisonError<T>) -> CacheError {
    CacheError::Io("Store lock poisoned by a panicked writer".to_string())
}

/// SQLite-backed document store
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open or create the store inside `dir`
    pub fn open_at(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| CacheError::Io(format!("Failed to create data dir: {}", e)))?;

        let db_path = dir.join(DB_FILE);
        let conn = Connection::open(&db_path)?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Journal schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            Self::nuke(&db_path)?;
            return Self::open_at(dir);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                name TEXT PRIMARY KEY NOT NULL,
                body TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    fn nuke(db_path: &Path) -> Result<()> {
        if db_path.exists() {
            std::fs::remove_file(db_path)
                .map_err(|e| CacheError::Io(format!("Failed to remove journal DB: {}", e)))?;
        }
        Ok(())
    }
}

impl DocumentStore for SqliteStore {
    fn read(&self, name: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().map_err(lock_poisoned)?;
        let body = conn
            .query_row(
                "SELECT body FROM documents WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(body)
    }

    fn write(&self, name: &str, body: &str) -> Result<()> {
        let conn = self.conn.lock().map_err(lock_poisoned)?;
        conn.execute(
            "INSERT OR REPLACE INTO documents (name, body, updated_at) VALUES (?1, ?2, ?3)",
            params![name, body, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn location(&self) -> String {
        self.db_path.display().to_string()
    }
}

/// One pretty-printed JSON file per document
pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn open_at(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| CacheError::Io(format!("Failed to create data dir: {}", e)))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }
}

impl DocumentStore for JsonFileStore {
    fn read(&self, name: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(name)) {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Io(format!("Failed to read {}: {}", name, e))),
        }
    }

    fn write(&self, name: &str, body: &str) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(lock_poisoned)?;

        // Write then rename so a crash never leaves a truncated journal
        let path = self.path_for(name);
        let tmp = path.with_extension("json.tmp");
        let write_err = |e: std::io::Error| CacheError::Io(format!("Failed to write {}: {}", name, e));
        let mut file = std::fs::File::create(&tmp).map_err(write_err)?;
        file.write_all(body.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);
        std::fs::rename(&tmp, &path)
            .map_err(|e| CacheError::Io(format!("Failed to replace {}: {}", name, e)))?;
        Ok(())
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn stores(dir: &TempDir) -> Vec<Box<dyn DocumentStore>> {
        vec![
            Box::new(SqliteStore::open_at(&dir.path().join("sqlite")).unwrap()),
            Box::new(JsonFileStore::open_at(&dir.path().join("json")).unwrap()),
        ]
    }

    #[test]
    fn test_missing_document_reads_none() {
        let dir = TempDir::new().unwrap();
        for store in stores(&dir) {
            assert_eq!(store.read("sms_cache").unwrap(), None);
        }
    }

    #[test]
    fn test_write_replaces_whole_document() {
        let dir = TempDir::new().unwrap();
        for store in stores(&dir) {
            store.write("sms_cache", r#"{"a":1}"#).unwrap();
            store.write("sms_cache", r#"{"b":2}"#).unwrap();
            assert_eq!(
                store.read("sms_cache").unwrap().as_deref(),
                Some(r#"{"b":2}"#)
            );
        }
    }

    #[test]
    fn test_documents_are_independent() {
        let dir = TempDir::new().unwrap();
        for store in stores(&dir) {
            store.write("sms_cache", "{}").unwrap();
            assert_eq!(store.read("otp_history").unwrap(), None);
        }
    }

    #[test]
    fn test_json_store_uses_legacy_file_names() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open_at(dir.path()).unwrap();
        store.write("otp_history", "{}").unwrap();

        assert!(dir.path().join("otp_history.json").exists());
        assert!(!dir.path().join("otp_history.json.tmp").exists());
    }

    #[test]
    fn test_json_store_replaces_file_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open_at(dir.path()).unwrap();
        store.write("sms_cache", r#"{"a":"1"}"#).unwrap();
        store.write("sms_cache", r#"{"b":"2"}"#).unwrap();

        let on_disk = std::fs::read_to_string(dir.path().join("sms_cache.json")).unwrap();
        assert_eq!(on_disk, r#"{"b":"2"}"#);
        assert!(!dir.path().join("sms_cache.json.tmp").exists());
    }

    #[test]
    fn test_sqlite_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = SqliteStore::open_at(dir.path()).unwrap();
            store.write("sms_cache", "{}").unwrap();
        }
        let store = SqliteStore::open_at(dir.path()).unwrap();
        assert_eq!(store.read("sms_cache").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_sqlite_schema_mismatch_rebuilds() {
        let dir = TempDir::new().unwrap();
        {
            let store = SqliteStore::open_at(dir.path()).unwrap();
            store.write("sms_cache", "{}").unwrap();
            let conn = store.conn.lock().unwrap();
            conn.pragma_update(None, "user_version", 99).unwrap();
        }
        let store = SqliteStore::open_at(dir.path()).unwrap();
        assert_eq!(store.read("sms_cache").unwrap(), None);
    }
}
