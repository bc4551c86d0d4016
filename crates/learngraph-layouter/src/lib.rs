//! Force-directed layout for graphs addressed by string ids.
//!
//! [`ForceSimulationLayouter`] owns two simulations:
//!
//! - a *complete* one, run by [`ForceSimulationLayouter::reload`] whenever the
//!   graph gained nodes or edges, which lays out everything from scratch;
//! - a *quick* one, run by [`ForceSimulationLayouter::node_positions`] when a
//!   request mentions ids the last complete run has not seen. It places only
//!   the new nodes while the known ones stay pinned.
//!
//! The mapping between caller ids and the engine's node indices lives here,
//! not in the engine.

mod layouter;
mod model;

pub use layouter::ForceSimulationLayouter;
pub use learngraph_layout::{ForceSimulationConfig, LayoutError, Result, Stats};
pub use model::{GraphSnapshot, Position, SnapshotEdge, SnapshotNode};
