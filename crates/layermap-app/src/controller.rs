use crate::job::{LayoutJob, LayoutOutcome};
use crate::{ControllerError, NodeFilter};
use layermap_core::{
    Edge, EdgeId, EdgeMeta, EdgePatch, Endpoint, GraphError, LayoutDirection, Node, NodeDraft,
    NodeId, NodePatch, Position,
};
use layermap_events::{ConnectRejection, Event, EventBus};
use layermap_graph::{
    GraphDocument, GraphModel, LayeredLayouter, LayoutConfig, LayoutResult, Layouter,
    RemovedNode, serializer,
};
use layermap_storage::SnapshotStore;
use serde::{Deserialize, Serialize};

/// Product rules applied by [`InteractionController::connect`] before the model sees an edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectPolicy {
    pub allow_self_loops: bool,
    pub allow_duplicates: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selection {
    Node(NodeId),
    Edge(EdgeId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Deleted {
    Node(RemovedNode),
    Edge(Edge),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSummary {
    pub direction: LayoutDirection,
    pub nodes: usize,
    pub layers: usize,
    pub back_edges: usize,
    pub crossings: usize,
    pub sweeps: usize,
    pub converged: bool,
}

impl LayoutSummary {
    fn of(result: &LayoutResult) -> Self {
        Self {
            direction: result.direction(),
            nodes: result.len(),
            layers: result.layer_count(),
            back_edges: result.back_edges().len(),
            crossings: result.crossings(),
            sweeps: result.sweeps(),
            converged: result.converged(),
        }
    }
}

/// Editing surface bound to exactly one graph.
///
/// Every operation runs to completion before returning. Filters and selection are view state
/// and never touch the stored graph.
pub struct InteractionController {
    model: GraphModel,
    layouter: LayeredLayouter,
    policy: ConnectPolicy,
    selection: Option<Selection>,
    filter: Option<NodeFilter>,
    events: Option<EventBus>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(GraphModel::new())
    }
}

fn emit(events: &Option<EventBus>, event: Event) {
    if let Some(bus) = events {
        bus.publish(event);
    }
}

impl InteractionController {
    pub fn new(model: GraphModel) -> Self {
        Self {
            model,
            layouter: LayeredLayouter::default(),
            policy: ConnectPolicy::default(),
            selection: None,
            filter: None,
            events: None,
        }
    }

    pub fn with_layout_config(mut self, config: LayoutConfig) -> Self {
        self.layouter = LayeredLayouter::new(config);
        self
    }

    pub fn with_policy(mut self, policy: ConnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn into_model(self) -> GraphModel {
        self.model
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layouter.config
    }

    pub fn policy(&self) -> ConnectPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ConnectPolicy) {
        self.policy = policy;
    }

    // ------------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------------

    pub fn add_node(&mut self, draft: NodeDraft) -> Result<&Node, ControllerError> {
        let node = self.model.add_node(draft)?;
        emit(
            &self.events,
            Event::NodeAdded {
                id: node.id.clone(),
                kind: node.kind.clone(),
            },
        );
        Ok(node)
    }

    /// Unknown ids are a no-op returning `false`.
    pub fn update_node(&mut self, id: &NodeId, patch: &NodePatch) -> bool {
        let updated = self.model.update_node(id, patch);
        if updated {
            emit(&self.events, Event::NodeUpdated { id: id.clone() });
        }
        updated
    }

    pub fn update_edge(&mut self, id: &EdgeId, patch: &EdgePatch) -> bool {
        let updated = self.model.update_edge(id, patch);
        if updated {
            emit(&self.events, Event::EdgeUpdated { id: id.clone() });
        }
        updated
    }

    pub fn connect(&mut self, source: &NodeId, target: &NodeId) -> Result<&Edge, ControllerError> {
        self.connect_with(source, target, EdgeMeta::default())
    }

    /// Applies the connect policy, then delegates to the model.
    pub fn connect_with(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        meta: EdgeMeta,
    ) -> Result<&Edge, ControllerError> {
        if let Err((err, reason)) = self.check_connect(source, target) {
            tracing::warn!("Rejected connect {} -> {}: {}", source, target, err);
            emit(
                &self.events,
                Event::ConnectRejected {
                    source: source.clone(),
                    target: target.clone(),
                    reason,
                },
            );
            return Err(err);
        }

        let edge = self.model.add_edge(source, target, meta)?;
        emit(
            &self.events,
            Event::EdgeAdded {
                id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
            },
        );
        Ok(edge)
    }

    fn check_connect(
        &self,
        source: &NodeId,
        target: &NodeId,
    ) -> Result<(), (ControllerError, ConnectRejection)> {
        let missing = [(Endpoint::Source, source), (Endpoint::Target, target)]
            .into_iter()
            .find(|(_, id)| !self.model.contains_node(id));
        if let Some((role, node)) = missing {
            return Err((
                GraphError::InvalidEndpoint {
                    role,
                    node: node.clone(),
                }
                .into(),
                ConnectRejection::MissingEndpoint,
            ));
        }
        if source == target && !self.policy.allow_self_loops {
            return Err((
                ControllerError::SelfLoop(source.clone()),
                ConnectRejection::SelfLoop,
            ));
        }
        if !self.policy.allow_duplicates {
            if let Some(existing) = self.model.edge_between(source, target) {
                return Err((
                    ControllerError::DuplicateEdge {
                        existing: existing.id.clone(),
                    },
                    ConnectRejection::Duplicate,
                ));
            }
        }
        Ok(())
    }

    /// Deletes whatever is selected. `None` when nothing was selected or it no longer exists.
    pub fn delete_selected(&mut self) -> Option<Deleted> {
        let target = self.selection.clone()?;
        self.delete(&target)
    }

    pub fn delete(&mut self, target: &Selection) -> Option<Deleted> {
        let deleted = match target {
            Selection::Node(id) => {
                let removed = self.model.remove_node(id)?;
                emit(
                    &self.events,
                    Event::NodeRemoved {
                        id: id.clone(),
                        cascaded_edges: removed.edges.iter().map(|e| e.id.clone()).collect(),
                    },
                );
                Deleted::Node(removed)
            }
            Selection::Edge(id) => {
                let removed = self.model.remove_edge(id)?;
                emit(&self.events, Event::EdgeRemoved { id: id.clone() });
                Deleted::Edge(removed)
            }
        };
        self.forget_dangling_selection();
        Some(deleted)
    }

    fn forget_dangling_selection(&mut self) {
        let alive = match &self.selection {
            Some(Selection::Node(id)) => self.model.contains_node(id),
            Some(Selection::Edge(id)) => self.model.contains_edge(id),
            None => true,
        };
        if !alive {
            self.selection = None;
            emit(&self.events, Event::SelectionCleared);
        }
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Selects a node. An unknown id clears the selection and yields `None`.
    pub fn select(&mut self, id: &NodeId) -> Option<&Node> {
        if !self.model.contains_node(id) {
            self.clear_selection();
            return None;
        }
        self.selection = Some(Selection::Node(id.clone()));
        emit(&self.events, Event::NodeSelected { id: id.clone() });
        self.model.node(id)
    }

    pub fn select_edge(&mut self, id: &EdgeId) -> Option<&Edge> {
        if !self.model.contains_edge(id) {
            self.clear_selection();
            return None;
        }
        self.selection = Some(Selection::Edge(id.clone()));
        emit(&self.events, Event::EdgeSelected { id: id.clone() });
        self.model.edge(id)
    }

    pub fn clear_selection(&mut self) {
        if self.selection.take().is_some() {
            emit(&self.events, Event::SelectionCleared);
        }
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn selected_node(&self) -> Option<&Node> {
        match &self.selection {
            Some(Selection::Node(id)) => self.model.node(id),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Filtering
    // ------------------------------------------------------------------------

    /// Pure projection of the stored nodes through `filter`, in insertion order.
    pub fn apply_filter(&self, filter: &NodeFilter) -> Vec<&Node> {
        self.model
            .nodes()
            .iter()
            .filter(|node| filter.matches(node))
            .collect()
    }

    pub fn set_filter(&mut self, filter: NodeFilter) {
        let active = !filter.is_empty();
        self.filter = active.then_some(filter);
        emit(
            &self.events,
            Event::FilterChanged {
                active,
                visible_nodes: self.visible_nodes().len(),
            },
        );
    }

    pub fn clear_filter(&mut self) {
        if self.filter.take().is_some() {
            emit(
                &self.events,
                Event::FilterChanged {
                    active: false,
                    visible_nodes: self.model.node_count(),
                },
            );
        }
    }

    pub fn filter(&self) -> Option<&NodeFilter> {
        self.filter.as_ref()
    }

    pub fn visible_nodes(&self) -> Vec<&Node> {
        match &self.filter {
            Some(filter) => self.apply_filter(filter),
            None => self.model.nodes().iter().collect(),
        }
    }

    /// Edges whose endpoints are both visible.
    pub fn visible_edges(&self) -> Vec<&Edge> {
        let Some(filter) = &self.filter else {
            return self.model.edges().iter().collect();
        };
        let visible = |id: &NodeId| self.model.node(id).is_some_and(|n| filter.matches(n));
        self.model
            .edges()
            .iter()
            .filter(|edge| visible(&edge.source) && visible(&edge.target))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------------

    /// Lays out the whole graph and commits every position in one step.
    pub fn relayout(&mut self, direction: LayoutDirection) -> LayoutSummary {
        self.layouter.config.direction = direction;
        let result = self.layouter.execute(&self.model);
        self.commit(&result)
    }

    fn commit(&mut self, result: &LayoutResult) -> LayoutSummary {
        self.model.apply_positions(result);
        let summary = LayoutSummary::of(result);
        emit(
            &self.events,
            Event::LayoutApplied {
                direction: summary.direction,
                nodes: summary.nodes,
                crossings: summary.crossings,
            },
        );
        summary
    }

    /// Starts a layout of the current graph on a worker thread.
    pub fn spawn_relayout(&mut self, direction: LayoutDirection) -> LayoutJob {
        self.layouter.config.direction = direction;
        LayoutJob::spawn(self.model.clone(), self.layouter.clone())
    }

    /// Applies a background layout, unless the graph changed after the job was spawned.
    pub fn commit_layout(&mut self, outcome: LayoutOutcome) -> Result<LayoutSummary, ControllerError> {
        let actual = self.model.revision();
        if outcome.revision != actual {
            tracing::warn!(
                "Discarding layout computed at revision {} (graph is at {})",
                outcome.revision,
                actual
            );
            emit(
                &self.events,
                Event::LayoutDiscarded {
                    expected_revision: outcome.revision,
                    actual_revision: actual,
                },
            );
            return Err(ControllerError::StaleLayout {
                expected: outcome.revision,
                actual,
            });
        }
        Ok(self.commit(&outcome.result))
    }

    /// Manual position override. The next relayout overwrites it.
    pub fn drag_node(&mut self, id: &NodeId, position: Position) -> bool {
        let moved = self.model.set_position(id, position);
        if moved {
            emit(
                &self.events,
                Event::NodeMoved {
                    id: id.clone(),
                    x: position.x,
                    y: position.y,
                },
            );
        }
        moved
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    pub fn export(&self) -> GraphDocument {
        serializer::export(&self.model)
    }

    /// Replaces the graph wholesale. On error the current graph is left untouched.
    ///
    /// The new graph continues the old revision sequence, so layouts spawned before the
    /// replacement are always stale.
    pub fn import(&mut self, document: GraphDocument) -> Result<(), ControllerError> {
        let mut model = serializer::import_with_kinds(document, self.model.kind_set().cloned())?;
        model.advance_revision_past(self.model.revision());
        emit(
            &self.events,
            Event::GraphImported {
                nodes: model.node_count(),
                edges: model.edge_count(),
            },
        );
        self.model = model;
        self.selection = None;
        Ok(())
    }

    pub fn save<S: SnapshotStore + ?Sized>(
        &self,
        store: &S,
        key: &str,
    ) -> Result<(), ControllerError> {
        store.save(key, &self.export())?;
        emit(
            &self.events,
            Event::SnapshotSaved {
                key: key.to_string(),
            },
        );
        Ok(())
    }

    /// Loads the snapshot stored under `key`. `Ok(false)` when there is none.
    pub fn load<S: SnapshotStore + ?Sized>(
        &mut self,
        store: &S,
        key: &str,
    ) -> Result<bool, ControllerError> {
        let Some(document) = store.load(key)? else {
            return Ok(false);
        };
        self.import(document)?;
        emit(
            &self.events,
            Event::SnapshotLoaded {
                key: key.to_string(),
            },
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layermap_core::{KindSet, NodeStatus};
    use layermap_storage::MemoryStore;
    use proptest::prelude::*;

    fn diamond() -> InteractionController {
        let mut controller = InteractionController::default();
        for id in ["A", "B", "C", "D"] {
            controller
                .add_node(NodeDraft::new("feature", id).with_id(id))
                .unwrap();
        }
        for (source, target) in [("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")] {
            controller.connect(&source.into(), &target.into()).unwrap();
        }
        controller
    }

    #[test]
    fn test_select_returns_node_or_none() {
        let mut controller = diamond();
        assert_eq!(
            controller.select(&"B".into()).map(|n| n.data.name.clone()),
            Some("B".to_string())
        );
        assert_eq!(controller.selection(), Some(&Selection::Node("B".into())));

        assert!(controller.select(&"nope".into()).is_none());
        assert!(controller.selection().is_none());
    }

    #[test]
    fn test_connect_policy_rejects_self_loops_and_duplicates() {
        let mut controller = diamond();
        let edges_before = controller.model().edge_count();

        assert!(matches!(
            controller.connect(&"A".into(), &"A".into()),
            Err(ControllerError::SelfLoop(_))
        ));
        assert!(matches!(
            controller.connect(&"A".into(), &"B".into()),
            Err(ControllerError::DuplicateEdge { .. })
        ));
        assert_eq!(controller.model().edge_count(), edges_before);

        controller.set_policy(ConnectPolicy {
            allow_self_loops: true,
            allow_duplicates: true,
        });
        assert!(controller.connect(&"A".into(), &"A".into()).is_ok());
        assert!(controller.connect(&"A".into(), &"B".into()).is_ok());
        assert_eq!(controller.model().edge_count(), edges_before + 2);
    }

    #[test]
    fn test_reverse_edge_is_not_a_duplicate() {
        let mut controller = diamond();
        assert!(controller.connect(&"B".into(), &"A".into()).is_ok());
    }

    #[test]
    fn test_connect_to_missing_node() {
        let mut controller = InteractionController::default();
        controller
            .add_node(NodeDraft::new("feature", "X").with_id("X"))
            .unwrap();
        let err = controller.connect(&"X".into(), &"Y".into()).unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Graph(GraphError::InvalidEndpoint { ref node, .. }) if node.as_str() == "Y"
        ));
        assert_eq!(controller.model().edge_count(), 0);
    }

    #[test]
    fn test_delete_selected_node_cascades_and_clears_selection() {
        let mut controller = diamond();
        controller.select(&"B".into());

        let Some(Deleted::Node(removed)) = controller.delete_selected() else {
            panic!("expected a node deletion");
        };
        assert_eq!(removed.edges.len(), 2);
        assert!(controller.selection().is_none());
        assert_eq!(controller.model().edge_count(), 2);
        assert!(controller.delete_selected().is_none());
    }

    #[test]
    fn test_cascade_clears_selected_edge() {
        let mut controller = diamond();
        let edge = controller
            .model()
            .edge_between(&"A".into(), &"B".into())
            .unwrap()
            .id
            .clone();
        controller.select_edge(&edge);

        controller.delete(&Selection::Node("A".into()));
        assert!(controller.selection().is_none());
    }

    #[test]
    fn test_relayout_commits_positions_and_drag_is_overwritten() {
        let mut controller = diamond();
        let summary = controller.relayout(LayoutDirection::TopToBottom);
        assert_eq!(summary.layers, 3);
        assert_eq!(summary.crossings, 0);

        let node = |c: &InteractionController, id: &str| c.model().node(&id.into()).unwrap().position;
        let b = node(&controller, "B");
        let c = node(&controller, "C");
        assert_eq!(b.y, c.y);
        assert!((b.x - c.x).abs() >= controller.layout_config().node_separation);

        assert!(controller.drag_node(&"B".into(), Position::new(-40.0, 999.0)));
        assert_eq!(node(&controller, "B"), Position::new(-40.0, 999.0));
        assert!(!controller.drag_node(&"ghost".into(), Position::new(1.0, 1.0)));

        controller.relayout(LayoutDirection::TopToBottom);
        assert_eq!(node(&controller, "B"), b);
    }

    #[test]
    fn test_relayout_is_deterministic() {
        let mut controller = diamond();
        controller.relayout(LayoutDirection::RightToLeft);
        let first = controller.model().nodes().to_vec();
        controller.relayout(LayoutDirection::RightToLeft);
        assert_eq!(controller.model().nodes(), first.as_slice());
    }

    #[test]
    fn test_background_layout_commits_when_fresh() {
        let mut controller = diamond();
        let job = controller.spawn_relayout(LayoutDirection::LeftToRight);
        let outcome = job.wait().unwrap();
        let summary = controller.commit_layout(outcome).unwrap();

        assert_eq!(summary.direction, LayoutDirection::LeftToRight);
        let a = controller.model().node(&"A".into()).unwrap().position;
        let d = controller.model().node(&"D".into()).unwrap().position;
        assert!(d.x > a.x);
    }

    #[test]
    fn test_background_layout_is_rejected_when_stale() {
        let mut controller = diamond();
        let job = controller.spawn_relayout(LayoutDirection::TopToBottom);
        controller
            .add_node(NodeDraft::new("feature", "late"))
            .unwrap();

        let outcome = job.wait().unwrap();
        let before = controller.model().nodes().to_vec();
        assert!(matches!(
            controller.commit_layout(outcome),
            Err(ControllerError::StaleLayout { .. })
        ));
        assert_eq!(controller.model().nodes(), before.as_slice());
    }

    fn chain(ids: [&str; 3]) -> InteractionController {
        let mut controller = InteractionController::default();
        for id in ["A", "B", "C"] {
            controller
                .add_node(NodeDraft::new("feature", id).with_id(id))
                .unwrap();
        }
        controller.connect(&ids[0].into(), &ids[1].into()).unwrap();
        controller.connect(&ids[1].into(), &ids[2].into()).unwrap();
        controller
    }

    #[test]
    fn test_background_layout_is_rejected_after_import() {
        let mut controller = chain(["A", "B", "C"]);
        let job = controller.spawn_relayout(LayoutDirection::TopToBottom);
        let spawned_at = job.revision();

        // Same node and edge count, so a fresh import reaches the same mutation count.
        let reversed = chain(["C", "B", "A"]);
        assert_eq!(reversed.model().revision(), spawned_at);
        controller.import(reversed.export()).unwrap();
        assert!(controller.model().revision() > spawned_at);

        let outcome = job.wait().unwrap();
        let before = controller.model().nodes().to_vec();
        assert!(matches!(
            controller.commit_layout(outcome),
            Err(ControllerError::StaleLayout { .. })
        ));
        assert_eq!(controller.model().nodes(), before.as_slice());

        controller.relayout(LayoutDirection::TopToBottom);
        let y = |id: &str| controller.model().node(&id.into()).unwrap().position.y;
        assert!(y("C") < y("A"));
    }

    #[test]
    fn test_load_also_invalidates_pending_layouts() {
        let store = MemoryStore::new();
        chain(["C", "B", "A"]).save(&store, "board").unwrap();

        let mut controller = chain(["A", "B", "C"]);
        let job = controller.spawn_relayout(LayoutDirection::TopToBottom);
        assert!(controller.load(&store, "board").unwrap());
        assert!(matches!(
            controller.commit_layout(job.wait().unwrap()),
            Err(ControllerError::StaleLayout { .. })
        ));
    }

    #[test]
    fn test_drag_refuses_non_finite_positions() {
        let mut controller = diamond();
        assert!(!controller.drag_node(&"A".into(), Position::new(f64::NAN, 1.0)));
        assert!(!controller.drag_node(&"A".into(), Position::new(1.0, f64::INFINITY)));
        assert!(
            controller
                .add_node(NodeDraft::new("feature", "X").at(Position::new(f64::NAN, 0.0)))
                .is_err()
        );

        let json = serializer::to_json(&controller.export()).unwrap();
        let restored = serializer::import_json(&json).unwrap();
        assert_eq!(&restored, controller.model());
    }

    #[test]
    fn test_import_replaces_graph_and_failure_keeps_it() {
        let mut controller = diamond();
        controller.select(&"A".into());
        let document = controller.export();

        let mut bad = document.clone();
        bad.edges[0].target = "ghost".into();
        let before = controller.model().clone();
        assert!(matches!(
            controller.import(bad),
            Err(ControllerError::Document(_))
        ));
        assert_eq!(controller.model(), &before);
        assert!(controller.selection().is_some());

        let mut other = InteractionController::default();
        other.import(document).unwrap();
        assert_eq!(other.model(), controller.model());
    }

    #[test]
    fn test_import_enforces_kind_set() {
        let mut controller = InteractionController::new(GraphModel::with_kinds(KindSet::screen()));
        let document = diamond().export();
        assert!(controller.import(document).is_err());
        assert!(controller.model().is_empty());
    }

    #[test]
    fn test_save_and_load_through_store() {
        let store = MemoryStore::new();
        let controller = diamond();
        controller.save(&store, "board").unwrap();

        let mut restored = InteractionController::default();
        assert!(!restored.load(&store, "missing").unwrap());
        assert!(restored.load(&store, "board").unwrap());
        assert_eq!(restored.model(), controller.model());
    }

    #[test]
    fn test_filters_project_without_mutating() {
        let mut controller = diamond();
        controller.update_node(&"B".into(), &NodePatch::status(NodeStatus::Blocked));
        controller.update_node(&"D".into(), &NodePatch::status(NodeStatus::Blocked));

        let blocked = NodeFilter::new().status(NodeStatus::Blocked);
        let ids: Vec<_> = controller
            .apply_filter(&blocked)
            .iter()
            .map(|n| n.id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["B", "D"]);

        controller.set_filter(blocked);
        assert_eq!(controller.visible_nodes().len(), 2);
        assert_eq!(controller.visible_edges().len(), 1);

        controller.clear_filter();
        assert_eq!(controller.visible_nodes().len(), 4);
        assert_eq!(controller.visible_edges().len(), 4);
    }

    #[test]
    fn test_events_are_published() {
        let bus = EventBus::new();
        let mut controller = InteractionController::default().with_event_bus(bus.clone());
        controller
            .add_node(NodeDraft::new("feature", "A").with_id("A"))
            .unwrap();
        let _ = controller.connect(&"A".into(), &"A".into());
        controller.relayout(LayoutDirection::TopToBottom);

        let events = bus.drain();
        assert!(matches!(events[0], Event::NodeAdded { .. }));
        assert!(matches!(
            events[1],
            Event::ConnectRejected {
                reason: ConnectRejection::SelfLoop,
                ..
            }
        ));
        assert!(matches!(events[2], Event::LayoutApplied { nodes: 1, .. }));
    }

    fn snapshot(controller: &InteractionController) -> String {
        let mut document = controller.export();
        document.metadata = None;
        serializer::to_json(&document).unwrap()
    }

    proptest! {
        /// Setting and clearing a filter leaves the stored graph byte-for-byte unchanged.
        #[test]
        fn prop_filter_purity(
            statuses in proptest::collection::vec(0usize..4, 1..12),
            pick in 0usize..4,
            text in "[a-c]{0,2}",
        ) {
            let mut controller = InteractionController::default();
            for (i, status) in statuses.iter().enumerate() {
                controller
                    .add_node(
                        NodeDraft::new("feature", format!("node {i} abc"))
                            .with_status(NodeStatus::ALL[*status]),
                    )
                    .unwrap();
            }
            let before = snapshot(&controller);
            let revision = controller.model().revision();

            let filter = NodeFilter::new().status(NodeStatus::ALL[pick]).text(text);
            let visible = controller.apply_filter(&filter).len();
            controller.set_filter(filter);
            prop_assert_eq!(controller.visible_nodes().len(), visible);
            controller.clear_filter();

            let after = snapshot(&controller);
            prop_assert_eq!(before, after);
            prop_assert_eq!(controller.model().revision(), revision);
        }
    }
}
