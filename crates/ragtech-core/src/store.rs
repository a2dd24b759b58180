//! Durable key-value slots and the history adapter on top of them.
//!
//! History is a convenience: `History::load` turns every failure into an
//! empty collection and `History::save` drops failed writes after logging.

use rusqlite::{Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::state::Session;

/// Storage key the session list is kept under.
pub const HISTORY_KEY: &str = "rag_tech_history_v1";

/// A synchronous string-to-string store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Key-value slots in a single SQLite table.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!("History database opened at {}", path.display());
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             CREATE TABLE IF NOT EXISTS kv (
                 key   TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );",
        )?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }
}

/// Process-local slots; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.slots.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// Loads and saves the session list as one JSON array in one slot.
pub struct History<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> History<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, HISTORY_KEY)
    }

    pub fn with_key(store: S, key: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the collection, or an empty one if it is missing or unreadable.
    pub fn load(&self) -> Vec<Session> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to read history, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Session>>(&raw) {
            Ok(mut sessions) => {
                for session in &mut sessions {
                    session.refresh_title();
                }
                sessions
            }
            Err(e) => {
                warn!(error = %e, "history is corrupted, starting empty");
                Vec::new()
            }
        }
    }

    /// Write the collection; failures are logged and dropped.
    pub fn save(&self, sessions: &[Session]) {
        let result = serde_json::to_string(sessions)
            .map_err(StoreError::from)
            .and_then(|raw| self.store.set(&self.key, &raw));
        if let Err(e) = result {
            warn!(error = %e, "failed to save history");
        }
    }
}
