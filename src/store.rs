use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

use crate::app_dirs::AppDirs;
use crate::error::StoreError;
use crate::lesson::Mode;

/// Key holding the global coin balance
pub const COINS_KEY: &str = "coins";

/// Key holding the lesson position for `mode`
pub fn lesson_index_key(mode: Mode) -> String {
    format!("lesson_index.{}", mode.storage_name())
}

/// Durable integer key-value storage for progress
pub trait ProgressStore {
    fn get(&self, key: &str) -> Option<i64>;
    fn set(&mut self, key: &str, value: i64) -> Result<(), StoreError>;
}

impl<P: ProgressStore + ?Sized> ProgressStore for Box<P> {
    fn get(&self, key: &str) -> Option<i64> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: i64) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// Volatile store for tests and throwaway sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<'a>(values: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

impl ProgressStore for MemoryStore {
    fn get(&self, key: &str) -> Option<i64> {
        self.values.get(key).copied()
    }

    fn set(&mut self, key: &str, value: i64) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// SQLite-backed progress store
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open the store at the default state location, creating it if needed
    pub fn open_default() -> Result<Self, StoreError> {
        let path = AppDirs::db_path().ok_or(StoreError::NoStateDir)?;
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened progress store");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS progress (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        Ok(Self { conn })
    }

    /// Underlying connection, shared with the results history
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn read(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM progress WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

impl ProgressStore for SqliteStore {
    fn get(&self, key: &str) -> Option<i64> {
        match self.read(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read progress");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: i64) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO progress (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
            params![key, value],
        )?;
        Ok(())
    }
}
