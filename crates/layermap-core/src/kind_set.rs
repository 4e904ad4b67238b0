use crate::NodeKind;
use serde::{Deserialize, Serialize};

/// The closed set of node kinds a graph instance accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSet {
    pub name: String,
    pub kinds: Vec<NodeKind>,
}

impl KindSet {
    pub fn new(name: impl Into<String>, kinds: impl IntoIterator<Item = NodeKind>) -> Self {
        let mut set = Self {
            name: name.into(),
            kinds: Vec::new(),
        };
        for kind in kinds {
            if !set.kinds.contains(&kind) {
                set.kinds.push(kind);
            }
        }
        set
    }

    /// Kinds used by the architecture mind-map.
    pub fn architecture() -> Self {
        Self::new(
            "architecture",
            ["feature", "capability", "component", "screen", "api"]
                .into_iter()
                .map(NodeKind::from),
        )
    }

    /// Kinds used by the screen map.
    pub fn screen() -> Self {
        Self::new(
            "screen",
            ["auth", "main", "workout", "profile", "settings", "onboarding"]
                .into_iter()
                .map(NodeKind::from),
        )
    }

    pub fn contains(&self, kind: &NodeKind) -> bool {
        self.kinds.contains(kind)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// Named kind configuration, as it appears in settings files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KindPreset {
    #[default]
    Architecture,
    Screen,
    Custom { name: String, kinds: Vec<String> },
    /// No restriction on node kinds.
    Any,
}

impl KindPreset {
    pub fn kind_set(&self) -> Option<KindSet> {
        match self {
            KindPreset::Architecture => Some(KindSet::architecture()),
            KindPreset::Screen => Some(KindSet::screen()),
            KindPreset::Custom { name, kinds } => Some(KindSet::new(
                name.clone(),
                kinds.iter().map(|k| NodeKind::new(k.as_str())),
            )),
            KindPreset::Any => None,
        }
    }
}
