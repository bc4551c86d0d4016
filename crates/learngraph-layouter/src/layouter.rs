use std::collections::HashMap;
use std::ops::Range;

use learngraph_layout::{
    Edge, ForceSimulation, ForceSimulationConfig, LayoutError, Node, Result, Stats,
};
use tracing::{info, warn};

use crate::model::{GraphSnapshot, Position, SnapshotEdge, SnapshotNode};

/// Engine nodes and edges of the last complete run, with the lookups from
/// caller ids to engine indices.
#[derive(Debug, Clone, Default)]
struct SimulationState {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_lookup: HashMap<String, usize>,
    /// `None` for edges that were skipped because an endpoint is unknown.
    edge_lookup: HashMap<String, Option<usize>>,
}

impl SimulationState {
    /// Nodes and edges of `snapshot` whose ids this state has not seen.
    fn missing(&self, snapshot: &GraphSnapshot) -> (Vec<SnapshotNode>, Vec<SnapshotEdge>) {
        let nodes = snapshot
            .nodes
            .iter()
            .filter(|node| !self.node_lookup.contains_key(&node.id))
            .cloned()
            .collect();
        let edges = snapshot
            .edges
            .iter()
            .filter(|edge| !self.edge_lookup.contains_key(&edge.id))
            .cloned()
            .collect();
        (nodes, edges)
    }

    fn is_missing_any(&self, snapshot: &GraphSnapshot) -> bool {
        snapshot.nodes.iter().any(|node| !self.node_lookup.contains_key(&node.id))
            || snapshot.edges.iter().any(|edge| !self.edge_lookup.contains_key(&edge.id))
    }

    /// Append nodes and edges, returning the index range of the new nodes.
    fn append(&mut self, nodes: &[SnapshotNode], edges: &[SnapshotEdge]) -> Range<usize> {
        let start = self.nodes.len();
        for node in nodes {
            if self.node_lookup.contains_key(&node.id) {
                continue;
            }
            self.node_lookup.insert(node.id.clone(), self.nodes.len());
            self.nodes
                .push(Node::new(node.description.clone()).with_label(node.id.clone()));
        }

        for edge in edges {
            let index = match (self.node_lookup.get(&edge.from), self.node_lookup.get(&edge.to)) {
                (Some(&source), Some(&target)) => {
                    self.edges.push(Edge::weighted(source, target, edge.weight));
                    Some(self.edges.len() - 1)
                }
                _ => {
                    warn!(
                        edge = %edge.id,
                        from = %edge.from,
                        to = %edge.to,
                        "Skipping edge with unknown endpoint"
                    );
                    None
                }
            };
            self.edge_lookup.insert(edge.id.clone(), index);
        }
        start..self.nodes.len()
    }

    fn write_positions(&self, snapshot: &mut GraphSnapshot) {
        for node in &mut snapshot.nodes {
            if let Some(&index) = self.node_lookup.get(&node.id) {
                let pos = self.nodes[index].pos;
                node.position = Some(Position {
                    x: pos.x,
                    y: pos.y,
                    z: 0.0,
                });
            }
        }
    }
}

/// Lays out a graph once completely and answers position requests from that
/// layout, placing nodes added since with a quick simulation.
#[derive(Debug)]
pub struct ForceSimulationLayouter {
    complete: ForceSimulation,
    quick: ForceSimulation,
    state: Option<SimulationState>,
}

impl ForceSimulationLayouter {
    /// Create a layouter with the [`complete`](ForceSimulationConfig::complete)
    /// and [`quick`](ForceSimulationConfig::quick) presets.
    pub fn new() -> Result<Self> {
        Self::with_configs(ForceSimulationConfig::complete(), ForceSimulationConfig::quick())
    }

    pub fn with_configs(complete: ForceSimulationConfig, quick: ForceSimulationConfig) -> Result<Self> {
        Ok(Self {
            complete: ForceSimulation::new(complete)?,
            quick: ForceSimulation::new(quick)?,
            state: None,
        })
    }

    /// Whether [`reload`](Self::reload) has computed a layout yet.
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Lay out `snapshot` from scratch and remember the result.
    ///
    /// Only runs if the snapshot contains node or edge ids unknown to the
    /// last run (or there was none); otherwise returns empty stats and leaves
    /// `snapshot` untouched.
    pub fn reload(&mut self, snapshot: &mut GraphSnapshot) -> Result<Stats> {
        if let Some(state) = &self.state {
            if !state.is_missing_any(snapshot) {
                return Ok(Stats::default());
            }
        }

        let mut state = SimulationState::default();
        state.append(&snapshot.nodes, &snapshot.edges);
        self.complete.initialize_nodes(&mut state.nodes);
        let (nodes, stats) = self
            .complete
            .compute_layout(std::mem::take(&mut state.nodes), state.edges.clone())?;
        state.nodes = nodes;
        self.complete.reseed_non_finite(&mut state.nodes);

        state.write_positions(snapshot);
        info!(
            nodes = state.nodes.len(),
            edges = state.edges.len(),
            iterations = stats.iterations,
            elapsed_ms = stats.total_time.as_millis() as u64,
            "Complete layout computed"
        );
        self.state = Some(state);
        Ok(stats)
    }

    /// Write positions from the last complete layout into `snapshot`.
    ///
    /// Nodes and edges the last [`reload`](Self::reload) did not see are
    /// placed by a quick simulation in which all known nodes are pinned. The
    /// stored layout itself is not changed by this.
    pub fn node_positions(&mut self, snapshot: &mut GraphSnapshot) -> Result<()> {
        let state = self.state.as_ref().ok_or(LayoutError::NotInitialized)?;
        let (nodes, edges) = state.missing(snapshot);
        if nodes.is_empty() && edges.is_empty() {
            state.write_positions(snapshot);
            return Ok(());
        }

        let mut scratch = state.clone();
        for node in &mut scratch.nodes {
            node.pinned = true;
        }
        let added = scratch.append(&nodes, &edges);
        self.quick.initialize_nodes(&mut scratch.nodes[added]);
        let (positioned, stats) = self
            .quick
            .compute_layout(std::mem::take(&mut scratch.nodes), scratch.edges.clone())?;
        scratch.nodes = positioned;
        self.quick.reseed_non_finite(&mut scratch.nodes);

        scratch.write_positions(snapshot);
        info!(
            new_nodes = nodes.len(),
            new_edges = edges.len(),
            iterations = stats.iterations,
            elapsed_ms = stats.total_time.as_millis() as u64,
            "Quick layout computed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> GraphSnapshot {
        GraphSnapshot {
            nodes: vec![SnapshotNode::new("a", "A"), SnapshotNode::new("b", "B")],
            edges: vec![
                SnapshotEdge::new("ab", "a", "b", 5.0),
                SnapshotEdge::new("ax", "a", "x", 1.0),
            ],
        }
    }

    #[test]
    fn test_append_maps_ids_to_indices() {
        let mut state = SimulationState::default();
        let snapshot = snapshot();
        let added = state.append(&snapshot.nodes, &snapshot.edges);
        assert_eq!(added, 0..2);
        assert_eq!(state.node_lookup["a"], 0);
        assert_eq!(state.node_lookup["b"], 1);
        assert_eq!(state.nodes[1].name, "B");
        assert_eq!(state.nodes[1].label, "b");
        assert_eq!(state.edges, vec![Edge::weighted(0, 1, 5.0)]);
        assert_eq!(state.edge_lookup["ab"], Some(0));
        assert_eq!(state.edge_lookup["ax"], None);
    }

    #[test]
    fn test_append_ignores_duplicate_node_ids() {
        let mut state = SimulationState::default();
        let nodes = vec![SnapshotNode::new("a", "first"), SnapshotNode::new("a", "second")];
        assert_eq!(state.append(&nodes, &[]), 0..1);
        assert_eq!(state.nodes[0].name, "first");
    }

    #[test]
    fn test_missing_reports_unknown_ids() {
        let mut state = SimulationState::default();
        let mut snapshot = snapshot();
        state.append(&snapshot.nodes, &snapshot.edges);
        assert!(!state.is_missing_any(&snapshot));

        snapshot.nodes.push(SnapshotNode::new("c", "C"));
        snapshot.edges.push(SnapshotEdge::new("bc", "b", "c", 1.0));
        let (nodes, edges) = state.missing(&snapshot);
        assert_eq!(nodes, vec![SnapshotNode::new("c", "C")]);
        assert_eq!(edges, vec![SnapshotEdge::new("bc", "b", "c", 1.0)]);
        assert!(state.is_missing_any(&snapshot));
    }

    #[test]
    fn test_write_positions_by_id_not_order() {
        let mut state = SimulationState::default();
        state.append(
            &[SnapshotNode::new("2", ""), SnapshotNode::new("1", "")],
            &[],
        );
        state.nodes[0].pos = Node::at("", 3.0, 4.0).pos;
        state.nodes[1].pos = Node::at("", 1.0, 2.0).pos;

        let mut snapshot = GraphSnapshot {
            nodes: vec![SnapshotNode::new("1", ""), SnapshotNode::new("2", "")],
            edges: vec![],
        };
        state.write_positions(&mut snapshot);
        assert_eq!(snapshot.nodes[0].position, Some(Position { x: 1.0, y: 2.0, z: 0.0 }));
        assert_eq!(snapshot.nodes[1].position, Some(Position { x: 3.0, y: 4.0, z: 0.0 }));
    }
}
