use layermap_core::{Node, NodeKind, NodeStatus, Priority};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Read-side node predicate. Empty criteria do not constrain; non-empty ones must all hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeFilter {
    pub kinds: BTreeSet<NodeKind>,
    pub statuses: BTreeSet<NodeStatus>,
    pub priorities: BTreeSet<Priority>,
    /// A node passes when it carries at least one of these tags.
    pub tags: BTreeSet<String>,
    /// Case-insensitive substring of the name or description.
    pub text: Option<String>,
}

impl NodeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: impl Into<NodeKind>) -> Self {
        self.kinds.insert(kind.into());
        self
    }

    pub fn status(mut self, status: NodeStatus) -> Self {
        self.statuses.insert(status);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priorities.insert(priority);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
            && self.statuses.is_empty()
            && self.priorities.is_empty()
            && self.tags.is_empty()
            && self.text.as_deref().is_none_or(|t| t.trim().is_empty())
    }

    pub fn matches(&self, node: &Node) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&node.kind) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&node.data.status) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&node.data.priority) {
            return false;
        }
        if !self.tags.is_empty() && self.tags.is_disjoint(&node.data.tags) {
            return false;
        }
        match self.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                let needle = text.to_lowercase();
                node.data.name.to_lowercase().contains(&needle)
                    || node.data.description.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}
