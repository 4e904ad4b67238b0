use layermap_core::{DocumentError, EdgeId, GraphError, NodeId};
use layermap_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Cannot connect `{0}` to itself: self-loops are disabled")]
    SelfLoop(NodeId),
    #[error("Nodes are already connected by edge `{existing}`")]
    DuplicateEdge { existing: EdgeId },
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Stale layout: computed at revision {expected}, graph is at revision {actual}")]
    StaleLayout { expected: u64, actual: u64 },
    #[error("Layout worker stopped before delivering a result")]
    LayoutWorker,
}
