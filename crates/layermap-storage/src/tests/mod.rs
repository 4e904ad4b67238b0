use super::*;
use layermap_core::{EdgeMeta, NodeDraft, NodeStatus, Position};
use layermap_graph::{GraphModel, serializer};

fn sample_document() -> GraphDocument {
    let mut model = GraphModel::new();
    model
        .add_node(
            NodeDraft::new("feature", "Onboarding")
                .with_id("onboarding")
                .at(Position::new(0.0, 0.0)),
        )
        .unwrap();
    model
        .add_node(
            NodeDraft::new("screen", "Welcome")
                .with_id("welcome")
                .with_status(NodeStatus::Completed)
                .at(Position::new(0.0, 150.0)),
        )
        .unwrap();
    model
        .add_edge(&"onboarding".into(), &"welcome".into(), EdgeMeta::default())
        .unwrap();
    serializer::export(&model)
}

#[test]
fn test_schema_version_is_recorded() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    assert_eq!(storage.schema_version()?, SCHEMA_VERSION);

    let mut stmt = storage.conn.prepare("PRAGMA index_list('snapshot')")?;
    let indexes = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    assert!(indexes.iter().any(|name| name == "idx_snapshot_saved_at"));
    Ok(())
}

#[test]
fn test_save_and_load_snapshot() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    let document = sample_document();

    assert!(storage.load("board")?.is_none());
    storage.save("board", &document)?;

    let loaded = storage.load("board")?.expect("snapshot should exist");
    assert_eq!(loaded, document);
    Ok(())
}

#[test]
fn test_save_overwrites_existing_key() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    let mut document = sample_document();
    storage.save("board", &document)?;

    document.edges.clear();
    storage.save("board", &document)?;

    let info = storage.snapshot_info("board")?.expect("info should exist");
    assert_eq!(info.node_count, 2);
    assert_eq!(info.edge_count, 0);
    assert_eq!(info.version.as_deref(), Some(layermap_graph::DOCUMENT_VERSION));
    assert_eq!(storage.keys()?, vec!["board".to_string()]);
    Ok(())
}

#[test]
fn test_delete_and_keys() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    let document = sample_document();
    storage.save("screens", &document)?;
    storage.save("architecture", &document)?;

    assert_eq!(
        storage.keys()?,
        vec!["architecture".to_string(), "screens".to_string()]
    );
    assert!(storage.delete("screens")?);
    assert!(!storage.delete("screens")?);
    assert_eq!(storage.keys()?, vec!["architecture".to_string()]);

    storage.clear()?;
    assert!(storage.keys()?.is_empty());
    Ok(())
}

#[test]
fn test_corrupt_row_surfaces_json_error() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    storage.conn.execute(
        "INSERT INTO snapshot (key, document, saved_at) VALUES (?1, ?2, ?3)",
        params!["broken", "{\"nodes\": 3}", Utc::now().to_rfc3339()],
    )?;

    assert!(matches!(storage.load("broken"), Err(StorageError::Json(_))));
    Ok(())
}

#[test]
fn test_snapshots_survive_reopen() -> Result<(), StorageError> {
    let dir = tempfile::tempdir().map_err(|e| StorageError::Other(e.to_string()))?;
    let path = dir.path().join("boards.db");
    let document = sample_document();

    {
        let storage = Storage::open(&path)?;
        storage.save("board", &document)?;
    }

    let storage = Storage::open(&path)?;
    assert_eq!(storage.load("board")?, Some(document));
    assert_eq!(storage.list()?.len(), 1);
    Ok(())
}

#[test]
fn test_newer_schema_is_rejected() -> Result<(), StorageError> {
    let dir = tempfile::tempdir().map_err(|e| StorageError::Other(e.to_string()))?;
    let path = dir.path().join("future.db");

    {
        let storage = Storage::open(&path)?;
        storage.set_schema_version(SCHEMA_VERSION + 1)?;
    }

    match Storage::open(&path) {
        Err(StorageError::Other(message)) => assert!(message.contains("schema version")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("newer schema should be rejected"),
    }
    Ok(())
}

#[test]
fn test_memory_store() -> Result<(), StorageError> {
    let store = MemoryStore::new();
    let document = sample_document();

    store.save("b", &document)?;
    store.save("a", &document)?;
    assert_eq!(store.len(), 2);
    assert_eq!(store.keys()?, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(store.load("a")?, Some(document));
    assert!(store.load("missing")?.is_none());

    assert!(store.delete("a")?);
    assert!(!store.delete("a")?);

    store.insert_raw("legacy", r#"{"nodes": [], "edges": []}"#);
    let legacy = store.load("legacy")?.expect("legacy snapshot should parse");
    assert!(legacy.metadata.is_none());

    store.insert_raw("garbage", "not json");
    assert!(matches!(store.load("garbage"), Err(StorageError::Json(_))));
    Ok(())
}
