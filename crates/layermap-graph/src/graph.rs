use crate::layout::LayoutResult;
use layermap_core::{
    Edge, EdgeId, EdgeMeta, EdgePatch, Endpoint, EntityKind, GraphError, KindSet, Node, NodeDraft,
    NodeId, NodeKind, NodePatch, NodeStatus, Position,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeIndex(pub usize);

/// Dense storage of nodes and edges in insertion order.
///
/// Indices are only valid until the next removal; callers holding on to an element across
/// mutations should keep its id instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl Graph {
    fn push_node(&mut self, node: Node) -> NodeIndex {
        let idx = NodeIndex(self.nodes.len());
        self.nodes.push(node);
        idx
    }

    fn push_edge(&mut self, edge: Edge) -> EdgeIndex {
        let idx = EdgeIndex(self.edges.len());
        self.edges.push(edge);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex)
    }

    pub fn edge_indices(&self) -> impl Iterator<Item = EdgeIndex> {
        (0..self.edges.len()).map(EdgeIndex)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }
}

impl Index<NodeIndex> for Graph {
    type Output = Node;
    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index.0]
    }
}

impl IndexMut<NodeIndex> for Graph {
    fn index_mut(&mut self, index: NodeIndex) -> &mut Self::Output {
        &mut self.nodes[index.0]
    }
}

impl Index<EdgeIndex> for Graph {
    type Output = Edge;
    fn index(&self, index: EdgeIndex) -> &Self::Output {
        &self.edges[index.0]
    }
}

impl IndexMut<EdgeIndex> for Graph {
    fn index_mut(&mut self, index: EdgeIndex) -> &mut Self::Output {
        &mut self.edges[index.0]
    }
}

/// A node taken out of the model together with the edges its removal cascaded to.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedNode {
    pub node: Node,
    pub edges: Vec<Edge>,
}

/// Source of fresh ids. Sequences only move forward, so an id is never handed out twice
/// by the same model even after the element carrying it was removed.
#[derive(Debug, Clone, Default)]
struct IdAllocator {
    next_node: u64,
    next_edge: u64,
}

impl IdAllocator {
    fn next_node_id(&mut self, taken: impl Fn(&NodeId) -> bool) -> NodeId {
        loop {
            self.next_node += 1;
            let id = NodeId(format!("node-{}", self.next_node));
            if !taken(&id) {
                return id;
            }
        }
    }

    fn next_edge_id(&mut self, taken: impl Fn(&EdgeId) -> bool) -> EdgeId {
        loop {
            self.next_edge += 1;
            let id = EdgeId(format!("edge-{}", self.next_edge));
            if !taken(&id) {
                return id;
            }
        }
    }
}

/// Owns the nodes and edges of one graph and keeps them referentially consistent.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    pub(crate) graph: Graph,
    node_map: HashMap<NodeId, NodeIndex>,
    edge_map: HashMap<EdgeId, EdgeIndex>,
    kinds: Option<KindSet>,
    ids: IdAllocator,
    revision: u64,
}

impl PartialEq for GraphModel {
    fn eq(&self, other: &Self) -> bool {
        self.graph == other.graph
    }
}

impl GraphModel {
    /// A model that accepts any node kind.
    pub fn new() -> Self {
        Self::default()
    }

    /// A model restricted to the kinds of `kinds`.
    pub fn with_kinds(kinds: KindSet) -> Self {
        Self {
            kinds: Some(kinds),
            ..Self::default()
        }
    }

    pub fn kind_set(&self) -> Option<&KindSet> {
        self.kinds.as_ref()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Bumped by every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Moves the revision past `previous`, the revision of a model this one replaces.
    /// Revisions then keep increasing across the replacement.
    pub fn advance_revision_past(&mut self, previous: u64) {
        self.revision = self.revision.max(previous) + 1;
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn nodes(&self) -> &[Node] {
        self.graph.nodes()
    }

    pub fn edges(&self) -> &[Edge] {
        self.graph.edges()
    }

    pub fn node_index(&self, id: &NodeId) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    pub fn edge_index(&self, id: &EdgeId) -> Option<EdgeIndex> {
        self.edge_map.get(id).copied()
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node_map.contains_key(id)
    }

    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edge_map.contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.node_map.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edge_map.get(id).map(|&idx| &self.graph[idx])
    }

    fn check_kind(&self, kind: &NodeKind) -> Result<(), GraphError> {
        match &self.kinds {
            Some(set) if !set.contains(kind) => Err(GraphError::UnknownKind {
                kind: kind.clone(),
                set: set.name.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn check_endpoints(&self, source: &NodeId, target: &NodeId) -> Result<(), GraphError> {
        if !self.node_map.contains_key(source) {
            return Err(GraphError::InvalidEndpoint {
                role: Endpoint::Source,
                node: source.clone(),
            });
        }
        if !self.node_map.contains_key(target) {
            return Err(GraphError::InvalidEndpoint {
                role: Endpoint::Target,
                node: target.clone(),
            });
        }
        Ok(())
    }

    /// Stores a new node. A draft without id gets a fresh one; a draft whose id is already
    /// taken is rejected with [`GraphError::DuplicateId`].
    pub fn add_node(&mut self, draft: NodeDraft) -> Result<&Node, GraphError> {
        self.check_kind(&draft.kind)?;
        if draft.position.is_some_and(|position| !position.is_finite()) {
            return Err(GraphError::NonFinitePosition);
        }

        let id = match draft.id {
            Some(id) => {
                if self.node_map.contains_key(&id) {
                    return Err(GraphError::DuplicateId {
                        entity: EntityKind::Node,
                        id: id.0,
                    });
                }
                id
            }
            None => {
                let node_map = &self.node_map;
                self.ids.next_node_id(|candidate| node_map.contains_key(candidate))
            }
        };

        let node = Node {
            id: id.clone(),
            kind: draft.kind,
            position: draft.position.unwrap_or_default(),
            data: draft.data,
        };
        let idx = self.graph.push_node(node);
        self.node_map.insert(id, idx);
        self.revision += 1;
        Ok(&self.graph[idx])
    }

    /// Connects two existing nodes. Nothing is stored when either endpoint is missing.
    pub fn add_edge(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        meta: EdgeMeta,
    ) -> Result<&Edge, GraphError> {
        self.check_endpoints(source, target)?;

        let edge_map = &self.edge_map;
        let id = self
            .ids
            .next_edge_id(|candidate| edge_map.contains_key(candidate));
        let edge = Edge {
            id,
            source: source.clone(),
            target: target.clone(),
            label: meta.label,
            kind: meta.kind,
        };
        Ok(self.store_edge(edge))
    }

    /// Adds an edge that already carries its id, as importers do.
    pub fn insert_edge(&mut self, edge: Edge) -> Result<&Edge, GraphError> {
        if self.edge_map.contains_key(&edge.id) {
            return Err(GraphError::DuplicateId {
                entity: EntityKind::Edge,
                id: edge.id.0,
            });
        }
        self.check_endpoints(&edge.source, &edge.target)?;
        Ok(self.store_edge(edge))
    }

    fn store_edge(&mut self, edge: Edge) -> &Edge {
        let id = edge.id.clone();
        let idx = self.graph.push_edge(edge);
        self.edge_map.insert(id, idx);
        self.revision += 1;
        &self.graph[idx]
    }

    /// Removes a node and every edge touching it in one step. Absent ids are a no-op.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<RemovedNode> {
        let idx = self.node_map.get(id).copied()?;
        let node = self.graph.nodes.remove(idx.0);

        let (removed, kept): (Vec<Edge>, Vec<Edge>) = std::mem::take(&mut self.graph.edges)
            .into_iter()
            .partition(|edge| edge.touches(id));
        self.graph.edges = kept;

        self.rebuild_node_map();
        if !removed.is_empty() {
            self.rebuild_edge_map();
        }
        self.revision += 1;

        tracing::debug!(
            "Removed node {} and {} attached edge(s)",
            node.id,
            removed.len()
        );
        Some(RemovedNode {
            node,
            edges: removed,
        })
    }

    /// Removes a single edge. Absent ids are a no-op.
    pub fn remove_edge(&mut self, id: &EdgeId) -> Option<Edge> {
        let idx = self.edge_map.get(id).copied()?;
        let edge = self.graph.edges.remove(idx.0);
        self.rebuild_edge_map();
        self.revision += 1;
        Some(edge)
    }

    /// Merges `patch` into the node. Returns `false` for unknown ids, a kind outside the
    /// model's kind set or a non-finite position; nothing changes in any of these cases.
    pub fn update_node(&mut self, id: &NodeId, patch: &NodePatch) -> bool {
        self.try_update_node(id, patch).is_ok()
    }

    /// Like [`GraphModel::update_node`] but reports why the update could not be applied.
    pub fn try_update_node(&mut self, id: &NodeId, patch: &NodePatch) -> Result<(), GraphError> {
        let idx = self
            .node_map
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::UnknownNode(id.clone()))?;
        if let Some(kind) = &patch.kind {
            self.check_kind(kind)?;
        }
        if patch.position.is_some_and(|position| !position.is_finite()) {
            return Err(GraphError::NonFinitePosition);
        }
        patch.apply(&mut self.graph[idx]);
        self.revision += 1;
        Ok(())
    }

    pub fn update_edge(&mut self, id: &EdgeId, patch: &EdgePatch) -> bool {
        self.try_update_edge(id, patch).is_ok()
    }

    pub fn try_update_edge(&mut self, id: &EdgeId, patch: &EdgePatch) -> Result<(), GraphError> {
        let idx = self
            .edge_map
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::UnknownEdge(id.clone()))?;
        patch.apply(&mut self.graph[idx]);
        self.revision += 1;
        Ok(())
    }

    pub fn nodes_by_kind<'a>(&'a self, kind: &'a NodeKind) -> impl Iterator<Item = &'a Node> {
        self.graph.nodes.iter().filter(move |node| &node.kind == kind)
    }

    pub fn nodes_by_status(&self, status: NodeStatus) -> impl Iterator<Item = &Node> {
        self.graph
            .nodes
            .iter()
            .filter(move |node| node.data.status == status)
    }

    /// Edges with `node` as source or target, in insertion order.
    pub fn edges_of<'a>(&'a self, node: &'a NodeId) -> impl Iterator<Item = &'a Edge> {
        self.graph.edges.iter().filter(move |edge| edge.touches(node))
    }

    /// The first edge going exactly from `source` to `target`, if any.
    pub fn edge_between(&self, source: &NodeId, target: &NodeId) -> Option<&Edge> {
        self.graph
            .edges
            .iter()
            .find(|edge| &edge.source == source && &edge.target == target)
    }

    pub fn has_edge_between(&self, source: &NodeId, target: &NodeId) -> bool {
        self.edge_between(source, target).is_some()
    }

    /// Writes every position of `layout` back in one step. Ids the model no longer knows
    /// are skipped. Returns how many nodes moved.
    pub fn apply_positions(&mut self, layout: &LayoutResult) -> usize {
        let mut applied = 0;
        for (id, position) in layout.positions() {
            if let Some(&idx) = self.node_map.get(id) {
                self.graph[idx].position = *position;
                applied += 1;
            }
        }
        if applied > 0 {
            self.revision += 1;
        }
        applied
    }

    /// Moves one node. Non-finite coordinates are refused.
    pub fn set_position(&mut self, id: &NodeId, position: Position) -> bool {
        self.update_node(id, &NodePatch::position(position))
    }

    fn rebuild_node_map(&mut self) {
        self.node_map.clear();
        for idx in self.graph.node_indices() {
            self.node_map.insert(self.graph[idx].id.clone(), idx);
        }
    }

    fn rebuild_edge_map(&mut self) {
        self.edge_map.clear();
        for idx in self.graph.edge_indices() {
            self.edge_map.insert(self.graph[idx].id.clone(), idx);
        }
    }
}
