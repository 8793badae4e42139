//! Persistent dedup journals
//!
//! [`DedupCache`] keeps the message cache and OTP history in memory and
//! rewrites the affected document through a [`DocumentStore`] after every
//! mutation.

pub mod journal;
pub mod storage;

use std::sync::Arc;

use log::debug;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;

pub use journal::{DedupCache, JournalStats, PruneStats, RecordOutcome};
pub use storage::{DocumentStore, JsonFileStore, SqliteStore};

/// Open the configured backend.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn DocumentStore>> {
    let dir = config.resolve_dir()?;
    debug!("Opening {:?} journal store in {}", config.backend, dir.display());

    let store: Arc<dyn DocumentStore> = match config.backend {
        StorageBackend::Sqlite => Arc::new(SqliteStore::open_at(&dir)?),
        StorageBackend::Json => Arc::new(JsonFileStore::open_at(&dir)?),
    };
    Ok(store)
}
