use crossbeam_channel::{Receiver, Sender, unbounded};
use layermap_core::{EdgeId, LayoutDirection, NodeId, NodeKind};
use serde::{Deserialize, Serialize};

/// Why a connect request was refused before reaching the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectRejection {
    SelfLoop,
    Duplicate,
    MissingEndpoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Editing
    NodeAdded {
        id: NodeId,
        kind: NodeKind,
    },
    NodeUpdated {
        id: NodeId,
    },
    /// A node was removed together with every edge touching it.
    NodeRemoved {
        id: NodeId,
        cascaded_edges: Vec<EdgeId>,
    },
    EdgeAdded {
        id: EdgeId,
        source: NodeId,
        target: NodeId,
    },
    EdgeUpdated {
        id: EdgeId,
    },
    EdgeRemoved {
        id: EdgeId,
    },
    ConnectRejected {
        source: NodeId,
        target: NodeId,
        reason: ConnectRejection,
    },

    // Selection
    NodeSelected {
        id: NodeId,
    },
    EdgeSelected {
        id: EdgeId,
    },
    SelectionCleared,

    // Filtering
    FilterChanged {
        active: bool,
        visible_nodes: usize,
    },

    // Layout
    NodeMoved {
        id: NodeId,
        x: f64,
        y: f64,
    },
    LayoutApplied {
        direction: LayoutDirection,
        nodes: usize,
        crossings: usize,
    },
    /// A background layout finished after the graph had changed and was dropped.
    LayoutDiscarded {
        expected_revision: u64,
        actual_revision: u64,
    },

    // Persistence
    GraphImported {
        nodes: usize,
        edges: usize,
    },
    SnapshotSaved {
        key: String,
    },
    SnapshotLoaded {
        key: String,
    },
}

impl Event {
    /// True for events that change the stored graph rather than how it is viewed.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Event::NodeAdded { .. }
                | Event::NodeUpdated { .. }
                | Event::NodeRemoved { .. }
                | Event::EdgeAdded { .. }
                | Event::EdgeUpdated { .. }
                | Event::EdgeRemoved { .. }
                | Event::NodeMoved { .. }
                | Event::LayoutApplied { .. }
                | Event::GraphImported { .. }
                | Event::SnapshotLoaded { .. }
        )
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Dispatch all pending events to a listener.
    /// This is useful for processing events in the UI loop.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }

    /// Takes every pending event without blocking.
    pub fn drain(&self) -> Vec<Event> {
        self.rx.try_iter().collect()
    }
}

/// Trait for components that respond to events.
/// Implement this to receive events from the EventBus.
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}
