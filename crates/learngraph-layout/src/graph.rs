//! Nodes, edges and the per-step force integration of one simulation.

use nalgebra::Vector2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::body::Body;
use crate::config::{ForceSimulationConfig, RepulsionMode};
use crate::error::LayoutError;
use crate::layout::ForceSimulation;
use crate::quadtree::QuadTree;
use crate::Result;

/// A vertex of the layout.
///
/// Zero `pos` and zero `radius` mean "unset" and are filled in by
/// [`Graph::new`]. `degree` is always recomputed from the edges there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub name: String,
    pub label: String,
    pub group: i64,
    pub pos: Vector2<f64>,
    pub vel: Vector2<f64>,
    #[serde(skip)]
    pub acc: Vector2<f64>,
    pub radius: f64,
    /// Sum of the weights of incident edges, 1.0 for isolated nodes. Used as
    /// the mass of the node.
    #[serde(skip)]
    pub degree: f64,
    /// Pinned nodes keep their position and velocity.
    pub pinned: bool,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            name: String::new(),
            label: String::new(),
            group: 0,
            pos: Vector2::zeros(),
            vel: Vector2::zeros(),
            acc: Vector2::zeros(),
            radius: 0.0,
            degree: 0.0,
            pinned: false,
        }
    }
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A node with a fixed initial position.
    pub fn at(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            pos: Vector2::new(x, y),
            ..Self::new(name)
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }
}

impl Body for Node {
    fn mass(&self) -> f64 {
        self.degree
    }

    fn position(&self) -> Vector2<f64> {
        self.pos
    }
}

/// A weighted spring between two nodes, addressed by index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    /// Spring strength; 0 means "unspecified" and becomes 1.0.
    #[serde(default)]
    pub value: f64,
}

impl Edge {
    pub fn new(source: usize, target: usize) -> Self {
        Self {
            source,
            target,
            value: 0.0,
        }
    }

    pub fn weighted(source: usize, target: usize, value: f64) -> Self {
        Self {
            source,
            target,
            value,
        }
    }
}

/// The nodes and edges of one simulation run.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    /// Scratch buffer for the repulsion pass.
    forces: Vec<Vector2<f64>>,
    /// Nodes left out of the quadtree in the last Barnes-Hut pass.
    unindexed: usize,
}

impl Graph {
    /// Take ownership of `nodes` and `edges` and prepare them for simulation.
    ///
    /// - edge weights of 0 become 1.0,
    /// - every node's degree is the sum of its incident edge weights, or 1.0
    ///   if no edge references it,
    /// - nodes at the origin are placed by the configured initial layout,
    /// - nodes without radius get the default radius.
    ///
    /// Fails if an edge references a node index that does not exist or has
    /// a negative or non-finite weight.
    pub fn new(mut nodes: Vec<Node>, mut edges: Vec<Edge>, simulation: &mut ForceSimulation) -> Result<Self> {
        if let Some((index, edge)) = edges
            .iter()
            .enumerate()
            .find(|(_, edge)| edge.source >= nodes.len() || edge.target >= nodes.len())
        {
            return Err(LayoutError::InvalidGraph(format!(
                "edge {index} ({} -> {}) references a node outside 0..{}",
                edge.source,
                edge.target,
                nodes.len()
            )));
        }
        if let Some((index, edge)) = edges
            .iter()
            .enumerate()
            .find(|(_, edge)| !(edge.value.is_finite() && edge.value >= 0.0))
        {
            return Err(LayoutError::InvalidGraph(format!(
                "edge {index} ({} -> {}) has invalid weight {}",
                edge.source, edge.target, edge.value
            )));
        }

        for node in &mut nodes {
            node.degree = 0.0;
        }
        for edge in &mut edges {
            if edge.value == 0.0 {
                edge.value = 1.0;
            }
            nodes[edge.source].degree += edge.value;
            nodes[edge.target].degree += edge.value;
        }

        let default_radius = simulation.config().default_node_radius;
        let count = nodes.len();
        for (index, node) in nodes.iter_mut().enumerate() {
            if node.degree == 0.0 {
                node.degree = 1.0;
            }
            if node.pos == Vector2::zeros() {
                node.pos = simulation.seed_position(index, count);
            }
            if node.radius == 0.0 {
                node.radius = default_radius;
            }
        }

        Ok(Self {
            forces: Vec::with_capacity(nodes.len()),
            nodes,
            edges,
            unindexed: 0,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    /// Nodes that were outside the quadtree region in the last Barnes-Hut
    /// pass. They were still pushed by the indexed nodes but exerted no
    /// repulsion on any other node.
    pub fn unindexed(&self) -> usize {
        self.unindexed
    }

    /// Run one simulation step: accumulate all forces and integrate.
    pub fn apply_force(&mut self, simulation: &ForceSimulation, delta_time: f64, quadtree: &mut QuadTree) {
        self.reset_acceleration();
        if simulation.config().gravity {
            self.gravity_to_center_force(simulation);
        }
        self.attraction_by_edges_force(simulation);
        match simulation.config().repulsion {
            RepulsionMode::BarnesHut => self.repulsion_barnes_hut(simulation, quadtree),
            RepulsionMode::Naive => self.repulsion_naive(simulation),
        }
        self.update_positions(simulation.config(), delta_time);
    }

    pub fn reset_acceleration(&mut self) {
        for node in &mut self.nodes {
            node.acc = Vector2::zeros();
        }
    }

    pub fn gravity_to_center_force(&mut self, simulation: &ForceSimulation) {
        for node in &mut self.nodes {
            let force = simulation.gravity(node);
            node.acc += force;
        }
    }

    /// Spring forces along every edge, equal and opposite on both ends.
    pub fn attraction_by_edges_force(&mut self, simulation: &ForceSimulation) {
        for edge in &self.edges {
            let force = simulation.attraction(&self.nodes[edge.source], &self.nodes[edge.target], edge.value);
            self.nodes[edge.source].acc -= force;
            self.nodes[edge.target].acc += force;
        }
    }

    /// Exact repulsion between every ordered pair of distinct nodes.
    pub fn repulsion_naive(&mut self, simulation: &ForceSimulation) {
        let parallelism = simulation.config().parallelism;
        self.accumulate_repulsion(parallelism, |nodes, index| {
            (0..nodes.len())
                .filter(|&other| other != index)
                .fold(Vector2::zeros(), |total, other| {
                    total + simulation.pair_repulsion(nodes, index, other)
                })
        });
    }

    /// Rebuild the quadtree from the current positions and query it for
    /// every node.
    pub fn repulsion_barnes_hut(&mut self, simulation: &ForceSimulation, quadtree: &mut QuadTree) {
        quadtree.clear();
        self.unindexed = 0;
        for index in 0..self.nodes.len() {
            if !quadtree.insert(&self.nodes, index) {
                self.unindexed += 1;
            }
        }
        quadtree.calculate_masses(&self.nodes);

        let theta = simulation.config().theta;
        let parallelism = simulation.config().parallelism;
        let tree: &QuadTree = quadtree;
        self.accumulate_repulsion(parallelism, |nodes, index| {
            tree.calculate_force(simulation, nodes, index, theta)
        });
    }

    /// Compute one force per node and add it to the node's acceleration.
    ///
    /// With `parallelism > 1` the nodes are split into that many contiguous
    /// chunks which are computed concurrently. Each chunk writes only its own
    /// slots of the force buffer; nodes are read-only until all chunks joined.
    fn accumulate_repulsion<F>(&mut self, parallelism: usize, force: F)
    where
        F: Fn(&[Node], usize) -> Vector2<f64> + Sync,
    {
        let count = self.nodes.len();
        self.forces.clear();
        self.forces.resize(count, Vector2::zeros());

        let nodes = &self.nodes;
        if parallelism <= 1 || count < 2 {
            for (index, slot) in self.forces.iter_mut().enumerate() {
                *slot = force(nodes, index);
            }
        } else {
            let chunk_size = count.div_ceil(parallelism);
            self.forces
                .par_chunks_mut(chunk_size)
                .enumerate()
                .for_each(|(chunk, slots)| {
                    let start = chunk * chunk_size;
                    for (offset, slot) in slots.iter_mut().enumerate() {
                        *slot = force(nodes, start + offset);
                    }
                });
        }

        for (node, force) in self.nodes.iter_mut().zip(&self.forces) {
            node.acc += force;
        }
    }

    /// Integrate acceleration into velocity and velocity into position for
    /// every node that is not pinned, clamping both.
    pub fn update_positions(&mut self, config: &ForceSimulationConfig, delta_time: f64) {
        let max_velocity = config.max_velocity;
        let bound_x = config.screen_multiplier_to_clamp_position * config.rect.width;
        let bound_y = config.screen_multiplier_to_clamp_position * config.rect.height;
        for node in self.nodes.iter_mut().filter(|node| !node.pinned) {
            node.vel = (node.vel + node.acc) * (1.0 - config.velocity_decay);
            node.vel = Vector2::new(
                clamp(node.vel.x, -max_velocity, max_velocity),
                clamp(node.vel.y, -max_velocity, max_velocity),
            );
            node.pos += node.vel * delta_time;
            node.pos = Vector2::new(
                clamp(node.pos.x, -bound_x, bound_x),
                clamp(node.pos.y, -bound_y, bound_y),
            );
        }
    }
}

/// Clamp `value` to `[lo, hi]`. NaN is returned unchanged so that a diverged
/// node stays recognisable.
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    if value > hi {
        hi
    } else if value < lo {
        lo
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForceSimulationConfig;
    use crate::rect::Rect;

    fn simulation() -> ForceSimulation {
        ForceSimulation::new(ForceSimulationConfig {
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            seed: Some(3),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_new_graph_sets_degree_radius_and_position() {
        let mut sim = simulation();
        let graph = Graph::new(
            vec![Node::new("a"), Node::new("b"), Node::new("c")],
            vec![Edge::weighted(0, 1, 5.0)],
            &mut sim,
        )
        .unwrap();
        let nodes = graph.nodes();
        assert_eq!(nodes[0].degree, 5.0);
        assert_eq!(nodes[1].degree, 5.0);
        assert_eq!(nodes[2].degree, 1.0);
        assert!((nodes[1].pos - nodes[0].pos).norm() > 0.0, "nodes should be seeded");
        for node in nodes {
            assert_eq!(node.radius, 1.0);
            assert!(Rect::new(0.0, 0.0, 10.0, 10.0).contains(&node.pos));
        }
    }

    #[test]
    fn test_new_graph_keeps_given_values() {
        let mut sim = simulation();
        let graph = Graph::new(
            vec![Node::at("a", 3.0, 4.0).with_radius(2.5), Node::at("b", 5.0, 5.0)],
            vec![Edge::new(0, 1), Edge::weighted(1, 0, 0.5)],
            &mut sim,
        )
        .unwrap();
        assert_eq!(graph.nodes()[0].pos, Vector2::new(3.0, 4.0));
        assert_eq!(graph.nodes()[0].radius, 2.5);
        assert_eq!(graph.edges()[0].value, 1.0);
        assert_eq!(graph.edges()[1].value, 0.5);
        assert_eq!(graph.nodes()[0].degree, 1.5);
    }

    #[test]
    fn test_new_graph_rejects_dangling_edges() {
        let mut sim = simulation();
        let result = Graph::new(vec![Node::new("a")], vec![Edge::new(0, 1)], &mut sim);
        assert!(matches!(result, Err(LayoutError::InvalidGraph(_))));
    }

    #[test]
    fn test_new_graph_rejects_invalid_weights() {
        for value in [f64::NAN, f64::INFINITY, -1.0] {
            let mut sim = simulation();
            let result = Graph::new(
                vec![Node::new("a"), Node::new("b")],
                vec![Edge::new(0, 1), Edge::weighted(1, 0, value)],
                &mut sim,
            );
            assert!(matches!(result, Err(LayoutError::InvalidGraph(_))), "weight {value}");
        }
    }

    #[test]
    fn test_node_serde_skips_derived_state() {
        let node: Node = serde_json::from_str(r#"{ "name": "a", "label": "A", "group": 3 }"#).unwrap();
        assert_eq!(node.group, 3);
        assert_eq!(node.label, "A");
        assert_eq!(node.pos, Vector2::zeros());
        assert!(!node.pinned);

        let mut moved = node.clone();
        moved.acc = Vector2::new(1.0, 1.0);
        moved.degree = 4.0;
        let json = serde_json::to_value(&moved).unwrap();
        assert!(json.get("acc").is_none());
        assert!(json.get("degree").is_none());
        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_degree_is_recomputed_not_accumulated() {
        let mut sim = simulation();
        let graph = Graph::new(
            vec![Node::at("a", 1.0, 1.0), Node::at("b", 2.0, 2.0)],
            vec![Edge::weighted(0, 1, 2.0)],
            &mut sim,
        )
        .unwrap();
        let again = Graph::new(graph.into_nodes(), vec![Edge::weighted(0, 1, 2.0)], &mut sim).unwrap();
        assert_eq!(again.nodes()[0].degree, 2.0);
    }

    #[test]
    fn test_repulsion_naive_pushes_apart() {
        let mut sim = simulation();
        let mut graph = Graph::new(
            vec![Node::at("a", 1.0, 1.0), Node::at("b", 2.0, 2.0)],
            vec![Edge::weighted(0, 1, 5.0)],
            &mut sim,
        )
        .unwrap();
        graph.repulsion_naive(&sim);
        graph.update_positions(sim.config(), 0.1);
        assert!(graph.nodes()[0].pos.x < 1.0, "should move nodes away from each other");
        assert!(graph.nodes()[1].pos.x > 2.0, "should move nodes away from each other");
    }

    #[test]
    fn test_repulsion_naive_splits_coincident_nodes() {
        let mut sim = simulation();
        let mut graph = Graph::new(
            vec![Node::at("a", 5.0, 5.0), Node::at("b", 5.0, 5.0)],
            vec![],
            &mut sim,
        )
        .unwrap();
        graph.repulsion_naive(&sim);
        assert_eq!(graph.nodes()[0].acc, Vector2::new(-10.0, 0.0));
        assert_eq!(graph.nodes()[1].acc, Vector2::new(10.0, 0.0));
    }

    #[test]
    fn test_repulsion_barnes_hut_two_nodes() {
        let mut sim = simulation();
        let mut graph = Graph::new(
            vec![Node::at("a", 1.0, 1.0), Node::at("b", 2.0, 2.0)],
            vec![],
            &mut sim,
        )
        .unwrap();
        let mut tree = QuadTree::from_config(sim.config());
        graph.repulsion_barnes_hut(&sim, &mut tree);

        // 10 * 1 * 1 * T / sqrt(2) along the diagonal, i.e. 5 per axis.
        let acc = graph.nodes()[0].acc;
        assert!((acc.x + 5.0).abs() < 1e-12);
        assert!((acc.y + 5.0).abs() < 1e-12);
        assert_eq!(graph.nodes()[1].acc, -acc);
        assert_eq!(graph.unindexed(), 0);
    }

    #[test]
    fn test_no_self_repulsion() {
        let mut sim = simulation();
        let mut graph = Graph::new(vec![Node::at("alone", 4.0, 4.0)], vec![], &mut sim).unwrap();
        graph.repulsion_naive(&sim);
        assert_eq!(graph.nodes()[0].acc, Vector2::zeros());
        let mut tree = QuadTree::from_config(sim.config());
        graph.repulsion_barnes_hut(&sim, &mut tree);
        assert_eq!(graph.nodes()[0].acc, Vector2::zeros());
    }

    #[test]
    fn test_parallel_repulsion_matches_sequential() {
        for count in 2..=9 {
            let nodes: Vec<_> = (0..count)
                .map(|i| Node::at(format!("n{i}"), 1.0 + i as f64, 1.0 + (i * i % 7) as f64))
                .collect();
            let mut results = Vec::new();
            for parallelism in [1, 3, 4] {
                let mut sim = ForceSimulation::new(ForceSimulationConfig {
                    rect: Rect::new(0.0, 0.0, 10.0, 10.0),
                    parallelism,
                    quadtree_capacity: 1,
                    seed: Some(3),
                    ..Default::default()
                })
                .unwrap();
                let mut graph = Graph::new(nodes.clone(), vec![], &mut sim).unwrap();
                let mut tree = QuadTree::from_config(sim.config());
                graph.repulsion_barnes_hut(&sim, &mut tree);
                results.push(graph.into_nodes());
            }
            assert_eq!(results[0], results[1], "{count} nodes");
            assert_eq!(results[0], results[2], "{count} nodes");
        }
    }

    #[test]
    fn test_attraction_is_symmetric() {
        let mut sim = simulation();
        let mut graph = Graph::new(
            vec![Node::at("a", 1.0, 1.0), Node::at("b", 9.0, 1.0)],
            vec![Edge::new(0, 1)],
            &mut sim,
        )
        .unwrap();
        graph.attraction_by_edges_force(&sim);
        let a = graph.nodes()[0].acc;
        let b = graph.nodes()[1].acc;
        assert_eq!(a, -b);
        assert!(a.x > 0.0, "a is pulled towards b");
        assert_eq!(a.y, 0.0);
    }

    #[test]
    fn test_gravity_pulls_to_center() {
        let mut sim = simulation();
        let mut graph = Graph::new(vec![Node::at("a", 1.0, 9.0)], vec![], &mut sim).unwrap();
        graph.gravity_to_center_force(&sim);
        let acc = graph.nodes()[0].acc;
        assert!(acc.x > 0.0);
        assert!(acc.y < 0.0);
    }

    #[test]
    fn test_pinned_nodes_do_not_move() {
        let mut sim = simulation();
        let mut graph = Graph::new(
            vec![Node::at("a", 1.0, 1.0).pinned(), Node::at("b", 1.5, 1.5)],
            vec![],
            &mut sim,
        )
        .unwrap();
        let mut tree = QuadTree::from_config(sim.config());
        for _ in 0..5 {
            graph.apply_force(&sim, 0.1, &mut tree);
        }
        assert_eq!(graph.nodes()[0].pos, Vector2::new(1.0, 1.0));
        assert_eq!(graph.nodes()[0].vel, Vector2::zeros());
        assert!(graph.nodes()[1].pos.x > 1.5);
    }

    #[test]
    fn test_update_positions_clamps_velocity_and_position() {
        let sim = simulation();
        let mut graph = Graph {
            nodes: vec![Node {
                pos: Vector2::new(95.0, -95.0),
                acc: Vector2::new(1e6, -1e6),
                degree: 1.0,
                radius: 1.0,
                ..Default::default()
            }],
            edges: vec![],
            forces: vec![],
            unindexed: 0,
        };
        graph.update_positions(sim.config(), 1.0);
        let node = &graph.nodes()[0];
        assert_eq!(node.vel, Vector2::new(100.0, -100.0));
        // 10 x the 10 x 10 rectangle.
        assert_eq!(node.pos, Vector2::new(100.0, -100.0));
    }

    #[test]
    fn test_clamp_propagates_nan() {
        assert!(clamp(f64::NAN, -100.0, 100.0).is_nan());
        assert_eq!(clamp(150.0, -100.0, 100.0), 100.0);
        assert_eq!(clamp(-150.0, -100.0, 100.0), -100.0);
        assert_eq!(clamp(42.0, -100.0, 100.0), 42.0);

        let sim = simulation();
        let mut graph = Graph {
            nodes: vec![Node {
                pos: Vector2::new(f64::NAN, 1.0),
                vel: Vector2::new(f64::NAN, 0.0),
                degree: 1.0,
                radius: 1.0,
                ..Default::default()
            }],
            edges: vec![],
            forces: vec![],
            unindexed: 0,
        };
        graph.update_positions(sim.config(), 1.0);
        assert!(graph.nodes()[0].vel.x.is_nan());
        assert!(graph.nodes()[0].pos.x.is_nan());
        assert!(!graph.nodes()[0].pos.y.is_nan());
    }
}
