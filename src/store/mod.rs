//! Persistent store adapters
//!
//! The registry persists one JSON blob per scope through the `PersistentStore`
//! trait. Hosts provide an implementation; without one the registry runs
//! in-memory only.

use parking_lot::Mutex;
use std::collections::HashMap;

mod sqlite;

pub use sqlite::SqliteStore;

/// Default prefix for persisted dial records
pub const DEFAULT_STORAGE_PREFIX: &str = "dials";

/// Version suffix of the persisted record format
pub const STORAGE_VERSION: u32 = 1;

/// Errors raised by store adapters
///
/// The registry logs these and carries on; they never reach registry callers.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A string-keyed, string-valued store scoped to the hosting session
pub trait PersistentStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Build the persisted record key: `<prefix>[-<scope>]-v<version>`
pub fn storage_key(prefix: &str, scope: Option<&str>, version: u32) -> String {
    match scope {
        Some(scope) if !scope.is_empty() => format!("{}-{}-v{}", prefix, scope, version),
        _ => format!("{}-v{}", prefix, version),
    }
}

/// In-memory store
///
/// Shared between registries (via `Arc`) it stands in for a session's local
/// storage, which is how the tests simulate a browser reload.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
