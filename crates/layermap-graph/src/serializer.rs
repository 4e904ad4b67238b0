//! Interchange document: the export/import shape of a [`GraphModel`].
//!
//! The same document is what persistence collaborators store, so importing is the only
//! way a graph re-enters the process and it is validated as a whole.

use crate::graph::GraphModel;
use chrono::{DateTime, Utc};
use layermap_core::{DocumentError, Edge, GraphError, KindSet, Node, NodeDraft};
use serde::{Deserialize, Serialize};

pub const DOCUMENT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

impl DocumentMetadata {
    pub fn current(exported_at: DateTime<Utc>) -> Self {
        Self {
            exported_at,
            version: DOCUMENT_VERSION.to_string(),
        }
    }

    /// Documents of the same major version are readable.
    pub fn is_supported(&self) -> bool {
        let major = |version: &str| version.split('.').next().map(str::to_string);
        major(&self.version).is_some_and(|m| Some(m) == major(DOCUMENT_VERSION))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// Absent in snapshots persisted before documents were versioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
}

impl GraphDocument {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

pub fn export(model: &GraphModel) -> GraphDocument {
    export_at(model, Utc::now())
}

pub fn export_at(model: &GraphModel, exported_at: DateTime<Utc>) -> GraphDocument {
    GraphDocument {
        nodes: model.nodes().to_vec(),
        edges: model.edges().to_vec(),
        metadata: Some(DocumentMetadata::current(exported_at)),
    }
}

pub fn to_json(document: &GraphDocument) -> Result<String, DocumentError> {
    Ok(serde_json::to_string(document)?)
}

pub fn to_json_pretty(document: &GraphDocument) -> Result<String, DocumentError> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Parses a document. Missing `nodes`/`edges` arrays or mistyped fields are `Malformed`.
pub fn from_json(json: &str) -> Result<GraphDocument, DocumentError> {
    Ok(serde_json::from_str(json)?)
}

pub fn import(document: GraphDocument) -> Result<GraphModel, DocumentError> {
    import_with_kinds(document, None)
}

/// Rebuilds a model from `document`, enforcing `kinds` when given.
///
/// The first offending node or edge aborts the import; no partially built model escapes.
pub fn import_with_kinds(
    document: GraphDocument,
    kinds: Option<KindSet>,
) -> Result<GraphModel, DocumentError> {
    if let Some(metadata) = &document.metadata {
        if !metadata.is_supported() {
            return Err(DocumentError::UnsupportedVersion(metadata.version.clone()));
        }
    }

    let mut model = match kinds {
        Some(kinds) => GraphModel::with_kinds(kinds),
        None => GraphModel::new(),
    };

    for node in document.nodes {
        let id = node.id.clone();
        let draft = NodeDraft {
            id: Some(node.id),
            kind: node.kind,
            position: Some(node.position),
            data: node.data,
        };
        model.add_node(draft).map_err(|err| match err {
            GraphError::UnknownKind { kind, set } => DocumentError::UnknownKind {
                node: id.clone(),
                kind,
                set,
            },
            other => document_error(other),
        })?;
    }

    for edge in document.edges {
        let id = edge.id.clone();
        model.insert_edge(edge).map_err(|err| match err {
            GraphError::InvalidEndpoint { role, node } => DocumentError::DanglingEdge {
                edge: id.clone(),
                role,
                node,
            },
            other => document_error(other),
        })?;
    }

    tracing::debug!(
        "Imported document with {} node(s) and {} edge(s)",
        model.node_count(),
        model.edge_count()
    );
    Ok(model)
}

pub fn import_json(json: &str) -> Result<GraphModel, DocumentError> {
    import(from_json(json)?)
}

fn document_error(err: GraphError) -> DocumentError {
    match err {
        GraphError::DuplicateId { entity, id } => DocumentError::DuplicateId { entity, id },
        other => DocumentError::Malformed {
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LayeredLayouter, Layouter};
    use chrono::TimeZone;
    use layermap_core::{EdgeMeta, Endpoint, EntityKind, NodeId, NodeStatus, Position, Priority};
    use proptest::prelude::*;

    fn sample_model() -> GraphModel {
        let mut model = GraphModel::with_kinds(KindSet::architecture());
        for (id, kind) in [("auth", "feature"), ("login", "screen"), ("session", "api")] {
            model
                .add_node(
                    NodeDraft::new(kind, id)
                        .with_id(id)
                        .with_priority(Priority::High)
                        .with_tag("mvp"),
                )
                .unwrap();
        }
        model
            .add_edge(&"auth".into(), &"login".into(), EdgeMeta::labeled("shows"))
            .unwrap();
        model
            .add_edge(&"login".into(), &"session".into(), EdgeMeta::default())
            .unwrap();
        model
            .add_edge(&"session".into(), &"auth".into(), EdgeMeta::default())
            .unwrap();
        let layout = LayeredLayouter::default().execute(&model);
        model.apply_positions(&layout);
        model
    }

    #[test]
    fn test_export_shape() {
        let model = sample_model();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let doc = export_at(&model, at);
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(value["edges"][0]["label"], "shows");
        assert!(value["edges"][1].get("label").is_none());
        assert_eq!(value["metadata"]["version"], DOCUMENT_VERSION);
        assert_eq!(value["metadata"]["exportedAt"], "2024-05-01T12:00:00Z");
        assert_eq!(value["nodes"][0]["data"]["tags"][0], "mvp");
    }

    #[test]
    fn test_json_round_trip() {
        let model = sample_model();
        let json = to_json_pretty(&export(&model)).unwrap();
        let imported = import_json(&json).unwrap();
        assert_eq!(imported, model);
        assert_eq!(imported.nodes()[1].position, model.nodes()[1].position);
    }

    #[test]
    fn test_dangling_edge_is_named() {
        let json = r#"{
            "nodes": [{"id": "a", "kind": "feature", "data": {"name": "A"}}],
            "edges": [{"id": "e9", "source": "a", "target": "ghost"}]
        }"#;
        let err = import_json(json).unwrap_err();
        assert_eq!(
            err,
            DocumentError::DanglingEdge {
                edge: "e9".into(),
                role: Endpoint::Target,
                node: NodeId::from("ghost"),
            }
        );
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let json = r#"{
            "nodes": [
                {"id": "a", "kind": "feature", "data": {"name": "A"}},
                {"id": "a", "kind": "api", "data": {"name": "A again"}}
            ],
            "edges": []
        }"#;
        assert_eq!(
            import_json(json).unwrap_err(),
            DocumentError::DuplicateId {
                entity: EntityKind::Node,
                id: "a".to_string()
            }
        );

        let json = r#"{
            "nodes": [{"id": "a", "kind": "feature", "data": {"name": "A"}}],
            "edges": [
                {"id": "e", "source": "a", "target": "a"},
                {"id": "e", "source": "a", "target": "a"}
            ]
        }"#;
        assert!(matches!(
            import_json(json),
            Err(DocumentError::DuplicateId {
                entity: EntityKind::Edge,
                ..
            })
        ));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            import_json(r#"{"nodes": []}"#),
            Err(DocumentError::Malformed { .. })
        ));
        assert!(matches!(
            import_json(r#"{"nodes": {}, "edges": []}"#),
            Err(DocumentError::Malformed { .. })
        ));
        assert!(matches!(
            import_json(
                r#"{"nodes": [{"id": "a", "kind": "feature", "data": {"name": "A", "status": "maybe"}}], "edges": []}"#
            ),
            Err(DocumentError::Malformed { .. })
        ));
        assert!(matches!(import_json("not json"), Err(DocumentError::Malformed { .. })));
    }

    #[test]
    fn test_legacy_document_without_metadata() {
        let json = r#"{
            "nodes": [
                {"id": "1", "kind": "auth", "position": {"x": 250, "y": 0},
                 "data": {"name": "Login", "status": "in-progress"}}
            ],
            "edges": []
        }"#;
        let model = import_json(json).unwrap();
        let node = model.node(&"1".into()).unwrap();
        assert_eq!(node.position, Position::new(250.0, 0.0));
        assert_eq!(node.data.status, NodeStatus::InProgress);
    }

    #[test]
    fn test_version_check() {
        let mut doc = export(&sample_model());
        if let Some(metadata) = doc.metadata.as_mut() {
            metadata.version = "1.4".to_string();
        }
        assert!(import(doc.clone()).is_ok());

        if let Some(metadata) = doc.metadata.as_mut() {
            metadata.version = "2.0".to_string();
        }
        assert_eq!(
            import(doc).unwrap_err(),
            DocumentError::UnsupportedVersion("2.0".to_string())
        );
    }

    #[test]
    fn test_kind_set_enforced_on_import() {
        let doc = export(&sample_model());
        let err = import_with_kinds(doc.clone(), Some(KindSet::screen())).unwrap_err();
        assert!(matches!(err, DocumentError::UnknownKind { ref node, .. } if node.as_str() == "auth"));
        assert!(import_with_kinds(doc, Some(KindSet::architecture())).is_ok());
    }

    fn arbitrary_model() -> impl Strategy<Value = GraphModel> {
        let node = (
            prop_oneof![Just("feature"), Just("api"), Just("screen")],
            proptest::sample::select(NodeStatus::ALL.to_vec()),
            proptest::collection::btree_set("[a-z]{1,4}", 0..3),
            (-500i32..500, -500i32..500),
        );
        (
            proptest::collection::vec(node, 0..10),
            proptest::collection::vec((0usize..10, 0usize..10, any::<bool>()), 0..20),
        )
            .prop_map(|(nodes, edges)| {
                let mut model = GraphModel::new();
                for (i, (kind, status, tags, (x, y))) in nodes.into_iter().enumerate() {
                    let mut draft = NodeDraft::new(kind, format!("Node {i}"))
                        .with_status(status)
                        .at(Position::new(x as f64, y as f64));
                    draft.data.tags = tags;
                    model.add_node(draft).unwrap();
                }
                if model.is_empty() {
                    return model;
                }
                let count = model.node_count();
                for (source, target, labeled) in edges {
                    let source = model.nodes()[source % count].id.clone();
                    let target = model.nodes()[target % count].id.clone();
                    let meta = if labeled {
                        EdgeMeta::labeled("depends on")
                    } else {
                        EdgeMeta::default()
                    };
                    model.add_edge(&source, &target, meta).unwrap();
                }
                model
            })
    }

    proptest! {
        /// Import of an export reproduces nodes, edges, positions and order.
        #[test]
        fn prop_round_trip(model in arbitrary_model()) {
            let imported = import(export(&model)).unwrap();
            prop_assert_eq!(&imported, &model);

            let json = to_json(&export(&model)).unwrap();
            prop_assert_eq!(import_json(&json).unwrap(), model);
        }
    }
}
