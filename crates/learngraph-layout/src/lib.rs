//! Force-directed graph layout with a Barnes-Hut quadtree.
//!
//! Nodes repel each other, edges act as springs and an optional gravity pulls
//! everything towards the center of the simulation rectangle. All forces are
//! scaled by a temperature that cools down step by step until the layout
//! settles.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     ForceSimulation                          │
//! │  config, temperature, RNG, force laws, run loop              │
//! └──────────────────────────────────────────────────────────────┘
//!          │ per step
//!          ▼
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │   Gravity   │───▶│  Attraction │───▶│  Repulsion  │───▶│  Integrate  │
//! │  (center)   │    │   (edges)   │    │ (quadtree)  │    │ (clamped)   │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//! ```
//!
//! The quadtree is rebuilt every step. Repulsion is computed for contiguous
//! chunks of nodes in parallel with rayon, reading the finished tree.
//!
//! ## Performance
//!
//! - Naive repulsion: O(n²) per step
//! - Barnes-Hut approximation: O(n log n) per step, accuracy set by `theta`
//!
//! ## Example
//!
//! ```
//! use learngraph_layout::{Edge, ForceSimulation, ForceSimulationConfig, Node};
//!
//! let config = ForceSimulationConfig {
//!     seed: Some(7),
//!     ..Default::default()
//! };
//! let mut simulation = ForceSimulation::new(config)?;
//! let nodes = vec![Node::new("a"), Node::new("b"), Node::new("c")];
//! let edges = vec![Edge::new(0, 1), Edge::new(1, 2)];
//! let (nodes, stats) = simulation.compute_layout(nodes, edges)?;
//! assert_eq!(nodes.len(), 3);
//! assert!(stats.converged);
//! # Ok::<(), learngraph_layout::LayoutError>(())
//! ```

mod body;
mod config;
#[cfg(feature = "png")]
mod draw;
mod error;
mod graph;
mod initial;
mod layout;
mod quadtree;
mod rect;

pub use body::{Body, PointMass};
pub use config::{Cooling, ForceSimulationConfig, RepulsionMode};
#[cfg(feature = "png")]
pub use draw::{draw_graph, render, DrawOptions};
pub use error::LayoutError;
pub use graph::{clamp, Edge, Graph, Node};
pub use initial::InitialLayout;
pub use layout::{ForceSimulation, Stats};
pub use quadtree::{Cell, QuadTree, DEFAULT_CAPACITY, DEFAULT_MAX_DEPTH};
pub use rect::{Quadrant, Rect};

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;
