use chrono::{DateTime, Utc};
use layermap_graph::GraphDocument;
use parking_lot::RwLock;
use rusqlite::{Connection, OptionalExtension, Result, params};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod schema;

const SCHEMA_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Other error: {0}")]
    Other(String),
}

/// Keyed persistence for interchange documents.
///
/// Stores hand documents back verbatim; validating them is the importer's job.
pub trait SnapshotStore {
    /// Stores `document` under `key`, replacing any previous snapshot.
    fn save(&self, key: &str, document: &GraphDocument) -> Result<(), StorageError>;
    fn load(&self, key: &str) -> Result<Option<GraphDocument>, StorageError>;
    /// Returns whether a snapshot existed.
    fn delete(&self, key: &str) -> Result<bool, StorageError>;
    /// Stored keys in ascending order.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Process-local store holding serialized documents, like a browser's key/value storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Stores raw JSON under `key` without checking it.
    pub fn insert_raw(&self, key: impl Into<String>, json: impl Into<String>) {
        self.entries.write().insert(key.into(), json.into());
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&self, key: &str, document: &GraphDocument) -> Result<(), StorageError> {
        let json = serde_json::to_string(document)?;
        self.entries.write().insert(key.to_string(), json);
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<GraphDocument>, StorageError> {
        let entries = self.entries.read();
        match entries.get(key) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub key: String,
    pub node_count: i64,
    pub edge_count: i64,
    pub version: Option<String>,
    pub saved_at: DateTime<Utc>,
}

/// SQLite-backed snapshot store.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        // Boards can be saved from a CLI while an editor holds the file open.
        let _ = conn.busy_timeout(Duration::from_millis(2_500));
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.pragma_update(None, "synchronous", "NORMAL");
        let storage = Self { conn };
        storage.init()?;
        Ok(storage)
    }

    pub fn new_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.init()?;
        Ok(storage)
    }

    /// Expose raw connection for advanced operations.
    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.conn.execute("DELETE FROM snapshot", [])?;
        Ok(())
    }

    fn init(&self) -> Result<(), StorageError> {
        schema::create_tables(&self.conn)?;
        schema::create_indexes(&self.conn)?;
        schema::apply_schema_migrations(self)
    }

    fn schema_version(&self) -> Result<u32, StorageError> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version.max(0) as u32)
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StorageError> {
        self.conn
            .pragma_update(None, "user_version", version.to_string())?;
        Ok(())
    }

    /// Summary rows for every stored snapshot, newest first.
    pub fn list(&self) -> Result<Vec<SnapshotInfo>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT key, node_count, edge_count, version, saved_at
             FROM snapshot ORDER BY saved_at DESC, key ASC",
        )?;
        let mut infos = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let saved_at: String = row.get(4)?;
            infos.push(SnapshotInfo {
                key: row.get(0)?,
                node_count: row.get(1)?,
                edge_count: row.get(2)?,
                version: row.get(3)?,
                saved_at: parse_timestamp(&saved_at)?,
            });
        }
        Ok(infos)
    }

    pub fn snapshot_info(&self, key: &str) -> Result<Option<SnapshotInfo>, StorageError> {
        Ok(self.list()?.into_iter().find(|info| info.key == key))
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::Other(format!("Invalid snapshot timestamp `{value}`: {e}")))
}

impl SnapshotStore for Storage {
    fn save(&self, key: &str, document: &GraphDocument) -> Result<(), StorageError> {
        let json = serde_json::to_string(document)?;
        let version = document.metadata.as_ref().map(|m| m.version.as_str());
        self.conn.execute(
            "INSERT INTO snapshot (key, document, node_count, edge_count, version, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(key) DO UPDATE SET
                document = excluded.document,
                node_count = excluded.node_count,
                edge_count = excluded.edge_count,
                version = excluded.version,
                saved_at = excluded.saved_at",
            params![
                key,
                json,
                document.node_count() as i64,
                document.edge_count() as i64,
                version,
                Utc::now().to_rfc3339(),
            ],
        )?;
        tracing::debug!(
            "Saved snapshot `{}` ({} nodes, {} edges)",
            key,
            document.node_count(),
            document.edge_count()
        );
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<GraphDocument>, StorageError> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT document FROM snapshot WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let removed = self
            .conn
            .execute("DELETE FROM snapshot WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM snapshot ORDER BY key ASC")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests;
