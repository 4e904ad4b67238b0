use crate::{Edge, Node, NodeData, NodeId, NodeKind, NodeStatus, Position, Priority};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Everything needed to create a node. The model fills in the id when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDraft {
    #[serde(default)]
    pub id: Option<NodeId>,
    pub kind: NodeKind,
    #[serde(default)]
    pub position: Option<Position>,
    pub data: NodeData,
}

impl NodeDraft {
    pub fn new(kind: impl Into<NodeKind>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: kind.into(),
            position: None,
            data: NodeData::named(name),
        }
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.data.status = status;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.data.priority = priority;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.data.tags.insert(tag.into());
        self
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

/// Partial update for a node. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodePatch {
    pub kind: Option<NodeKind>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<NodeStatus>,
    pub priority: Option<Priority>,
    pub tags: Option<BTreeSet<String>>,
    pub position: Option<Position>,
}

impl NodePatch {
    pub fn position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn status(status: NodeStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply(&self, node: &mut Node) {
        if let Some(kind) = &self.kind {
            node.kind = kind.clone();
        }
        if let Some(name) = &self.name {
            node.data.name = name.clone();
        }
        if let Some(description) = &self.description {
            node.data.description = description.clone();
        }
        if let Some(status) = self.status {
            node.data.status = status;
        }
        if let Some(priority) = self.priority {
            node.data.priority = priority;
        }
        if let Some(tags) = &self.tags {
            node.data.tags = tags.clone();
        }
        if let Some(position) = self.position {
            node.position = position;
        }
    }
}

/// Optional display metadata supplied when connecting two nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeMeta {
    pub label: Option<String>,
    pub kind: Option<String>,
}

impl EdgeMeta {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            kind: None,
        }
    }
}

/// Partial update for an edge. `Some(None)` clears a field, `None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgePatch {
    pub label: Option<Option<String>>,
    pub kind: Option<Option<String>>,
}

impl EdgePatch {
    pub fn apply(&self, edge: &mut Edge) {
        if let Some(label) = &self.label {
            edge.label = label.clone();
        }
        if let Some(kind) = &self.kind {
            edge.kind = kind.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EdgeId;

    fn sample_node() -> Node {
        Node {
            id: NodeId::from("n1"),
            kind: NodeKind::from("feature"),
            position: Position::default(),
            data: NodeData::named("Checkout"),
        }
    }

    #[test]
    fn test_node_patch_merges_only_present_fields() {
        let mut node = sample_node();
        let patch = NodePatch {
            description: Some("Cart to payment".to_string()),
            priority: Some(Priority::Critical),
            ..Default::default()
        };
        patch.apply(&mut node);

        assert_eq!(node.data.name, "Checkout");
        assert_eq!(node.data.description, "Cart to payment");
        assert_eq!(node.data.priority, Priority::Critical);
        assert_eq!(node.data.status, NodeStatus::Planned);
    }

    #[test]
    fn test_empty_patch() {
        assert!(NodePatch::default().is_empty());
        assert!(!NodePatch::status(NodeStatus::Blocked).is_empty());
    }

    #[test]
    fn test_edge_patch_can_clear_label() {
        let mut edge = Edge {
            id: EdgeId::from("e1"),
            source: NodeId::from("a"),
            target: NodeId::from("b"),
            label: Some("uses".to_string()),
            kind: None,
        };

        EdgePatch::default().apply(&mut edge);
        assert_eq!(edge.label.as_deref(), Some("uses"));

        EdgePatch {
            label: Some(None),
            kind: Some(Some("depends-on".to_string())),
        }
        .apply(&mut edge);
        assert_eq!(edge.label, None);
        assert_eq!(edge.kind.as_deref(), Some("depends-on"));
    }

    #[test]
    fn test_draft_builder() {
        let draft = NodeDraft::new("screen", "Login")
            .with_id("login")
            .with_tag("auth")
            .at(Position::new(5.0, 5.0));
        assert_eq!(draft.id, Some(NodeId::from("login")));
        assert!(draft.data.tags.contains("auth"));
        assert_eq!(draft.position, Some(Position::new(5.0, 5.0)));
    }
}
