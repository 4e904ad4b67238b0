use crate::{EdgeId, NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which end of an edge a check refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    Source,
    Target,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Source => f.write_str("source"),
            Endpoint::Target => f.write_str("target"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Node,
    Edge,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Node => f.write_str("node"),
            EntityKind::Edge => f.write_str("edge"),
        }
    }
}

/// Failures of model-level mutations. The mutation never happens when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Invalid endpoint: {role} node `{node}` does not exist")]
    InvalidEndpoint { role: Endpoint, node: NodeId },
    #[error("Duplicate {entity} id `{id}`")]
    DuplicateId { entity: EntityKind, id: String },
    #[error("Node kind `{kind}` is not part of kind set `{set}`")]
    UnknownKind { kind: NodeKind, set: String },
    #[error("Unknown node `{0}`")]
    UnknownNode(NodeId),
    #[error("Unknown edge `{0}`")]
    UnknownEdge(EdgeId),
    #[error("Node positions must have finite coordinates")]
    NonFinitePosition,
}

/// An interchange document that cannot become a graph. The import is rejected as a whole.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Invalid document: {message}")]
    Malformed { message: String },
    #[error("Invalid document: edge `{edge}` references missing {role} node `{node}`")]
    DanglingEdge {
        edge: EdgeId,
        role: Endpoint,
        node: NodeId,
    },
    #[error("Invalid document: duplicate {entity} id `{id}`")]
    DuplicateId { entity: EntityKind, id: String },
    #[error("Invalid document: node `{node}` has kind `{kind}` outside kind set `{set}`")]
    UnknownKind {
        node: NodeId,
        kind: NodeKind,
        set: String,
    },
    #[error("Invalid document: unsupported version `{0}`")]
    UnsupportedVersion(String),
}

impl From<serde_json::Error> for DocumentError {
    fn from(err: serde_json::Error) -> Self {
        DocumentError::Malformed {
            message: err.to_string(),
        }
    }
}
