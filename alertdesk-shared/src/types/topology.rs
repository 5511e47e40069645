//! Topology graph fragments as returned by the graph store.

use serde::{Deserialize, Serialize};

/// A named element of the monitored infrastructure graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopologyNode {
    pub name: String,
    /// Secondary identifier; roots may be addressed by name or by id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_owner: Option<String>,
}

impl TopologyNode {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            support_owner: None,
        }
    }
}

/// A typed, directed relationship between two node names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopologyEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub rel_type: String,
}

impl TopologyEdge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        rel_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            rel_type: rel_type.into(),
        }
    }
}

/// Nodes reachable from a root within a hop bound, plus the edges induced among them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Neighborhood {
    /// Resolved name of the root node (the lookup key may have been its id).
    pub root: String,
    pub nodes: Vec<TopologyNode>,
    pub edges: Vec<TopologyEdge>,
}
