pub mod graph;
pub mod layout;
pub mod serializer;

pub use graph::{EdgeIndex, Graph, GraphModel, NodeIndex, RemovedNode};
pub use layout::{
    LayeredLayouter, LayoutBounds, LayoutConfig, LayoutResult, Layouter, OrderingHeuristic,
};
pub use serializer::{DOCUMENT_VERSION, DocumentMetadata, GraphDocument};
