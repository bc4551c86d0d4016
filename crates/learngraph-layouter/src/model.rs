//! Id-addressed graph as exchanged with callers.

use serde::{Deserialize, Serialize};

/// A graph whose nodes and edges are identified by strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<SnapshotNode>,
    #[serde(default)]
    pub edges: Vec<SnapshotEdge>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Filled in by the layouter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl SnapshotNode {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            position: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEdge {
    pub id: String,
    /// Id of the source node.
    pub from: String,
    /// Id of the target node.
    pub to: String,
    /// Spring strength; 0 means the default weight.
    #[serde(default)]
    pub weight: f64,
}

impl SnapshotEdge {
    pub fn new(id: impl Into<String>, from: impl Into<String>, to: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            weight,
        }
    }
}

/// Position of a node. The layout is planar, `z` is always 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}
