use super::*;

const TABLE_STATEMENTS: &[&str] = &["CREATE TABLE IF NOT EXISTS snapshot (
        key TEXT PRIMARY KEY,
        document TEXT NOT NULL,
        node_count INTEGER NOT NULL DEFAULT 0,
        edge_count INTEGER NOT NULL DEFAULT 0,
        version TEXT,
        saved_at TEXT NOT NULL
    )"];

const INDEX_STATEMENTS: &[&str] =
    &["CREATE INDEX IF NOT EXISTS idx_snapshot_saved_at ON snapshot(saved_at)"];

pub(super) fn create_tables(conn: &Connection) -> Result<(), StorageError> {
    for statement in TABLE_STATEMENTS {
        conn.execute(statement, [])?;
    }
    Ok(())
}

pub(super) fn create_indexes(conn: &Connection) -> Result<(), StorageError> {
    for statement in INDEX_STATEMENTS {
        conn.execute(statement, [])?;
    }
    Ok(())
}

pub(super) fn apply_schema_migrations(storage: &Storage) -> Result<(), StorageError> {
    let stored_version = storage.schema_version()?;

    if stored_version > SCHEMA_VERSION {
        return Err(StorageError::Other(format!(
            "Unsupported database schema version: {stored_version} (max supported: {SCHEMA_VERSION})"
        )));
    }

    if stored_version < SCHEMA_VERSION {
        tracing::debug!(
            "Upgrading snapshot schema from version {} to {}",
            stored_version,
            SCHEMA_VERSION
        );
        storage.set_schema_version(SCHEMA_VERSION)?;
    }
    Ok(())
}
