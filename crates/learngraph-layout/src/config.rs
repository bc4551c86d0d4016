//! Configuration for a force simulation.
//!
//! Every tunable of the engine lives in [`ForceSimulationConfig`], which is
//! passed to [`ForceSimulation::new`](crate::ForceSimulation::new) and
//! threaded through graph and quadtree construction. There is no global
//! state.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::initial::InitialLayout;
use crate::quadtree::{DEFAULT_CAPACITY, DEFAULT_MAX_DEPTH};
use crate::rect::Rect;
use crate::Result;

/// How repulsion between nodes is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepulsionMode {
    /// Barnes-Hut approximation over a quadtree, O(n log n).
    #[default]
    BarnesHut,
    /// Exact all-pairs repulsion, O(n²).
    Naive,
}

/// How the temperature approaches its target after each step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cooling {
    /// `T += (target - T) * decay` once per step. Deterministic.
    #[default]
    PerStep,
    /// `T += (target - T) * decay * seconds`, with the measured wall-clock
    /// duration of the step.
    MeasuredFrameTime,
}

/// Configuration for [`ForceSimulation`](crate::ForceSimulation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceSimulationConfig {
    /// Simulation rectangle: root region of the quadtree, gravity center,
    /// and (scaled) position clamp.
    pub rect: Rect,
    /// Radius given to nodes that come without one.
    pub default_node_radius: f64,
    /// Lower bound of the distance used by the attraction law.
    pub min_distance_between_nodes: f64,
    /// Scale of the repulsion law.
    pub repulsion_multiplier: f64,
    /// Initial temperature.
    pub alpha_init: f64,
    /// Fraction of the remaining distance to the target temperature covered
    /// per step.
    pub alpha_decay: f64,
    /// Temperature the simulation cools down to.
    pub alpha_target: f64,
    pub cooling: Cooling,
    /// Time step of the position update.
    ///
    /// Larger values move nodes further per step and lose precision; too large
    /// overshoots the equilibrium, too small never reaches it.
    pub frame_time: f64,
    /// The run stops once `|T - alpha_target|` is at most this.
    pub convergence_tolerance: f64,
    /// The run stops after this many steps regardless of temperature.
    pub max_iterations: usize,
    /// Fraction of velocity lost per step.
    pub velocity_decay: f64,
    /// Per-component bound of node velocity.
    pub max_velocity: f64,
    /// Positions are clamped to `[-k*width, k*width] x [-k*height, k*height]`.
    pub screen_multiplier_to_clamp_position: f64,
    /// Pull every node towards the rectangle center.
    pub gravity: bool,
    pub gravity_strength: f64,
    pub repulsion: RepulsionMode,
    /// Barnes-Hut accuracy: 0 is exact, larger is coarser and faster.
    pub theta: f64,
    pub quadtree_capacity: usize,
    /// Subdivision stops at this depth; deeper leaves keep all their bodies.
    pub quadtree_max_depth: usize,
    /// Number of contiguous node partitions the repulsion pass is split into.
    pub parallelism: usize,
    /// Quadtree cells shallower than this fork their children into parallel
    /// tasks during force queries. 0 disables it.
    pub tree_parallel_depth: usize,
    pub initial_layout: InitialLayout,
    /// Seed of the random number generator; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for ForceSimulationConfig {
    fn default() -> Self {
        Self {
            rect: Rect::new(0.0, 0.0, 1200.0, 800.0),
            default_node_radius: 1.0,
            min_distance_between_nodes: 1e-2,
            repulsion_multiplier: 10.0,
            alpha_init: 1.0,
            alpha_decay: 0.05,
            alpha_target: 0.1,
            cooling: Cooling::PerStep,
            frame_time: 0.016,
            convergence_tolerance: 1e-5,
            max_iterations: 10_000,
            velocity_decay: 0.1,
            max_velocity: 100.0,
            screen_multiplier_to_clamp_position: 10.0,
            gravity: true,
            gravity_strength: 0.5,
            repulsion: RepulsionMode::BarnesHut,
            theta: 0.75,
            quadtree_capacity: DEFAULT_CAPACITY,
            quadtree_max_depth: DEFAULT_MAX_DEPTH,
            parallelism: rayon::current_num_threads(),
            tree_parallel_depth: 0,
            initial_layout: InitialLayout::Random,
            seed: None,
        }
    }
}

impl ForceSimulationConfig {
    /// Slow, thorough simulation for laying out a whole graph from scratch.
    pub fn complete() -> Self {
        let max_y = 1000.0;
        Self {
            rect: Rect::new(-max_y, -max_y / 2.0, max_y * 2.0, max_y),
            initial_layout: InitialLayout::Circle,
            screen_multiplier_to_clamp_position: 100.0,
            frame_time: 1.0,
            min_distance_between_nodes: 100.0,
            alpha_init: 1.0,
            alpha_decay: 0.005,
            alpha_target: 0.1,
            repulsion_multiplier: 10.0,
            // Nodes are not evenly spread over the partitions.
            parallelism: rayon::current_num_threads() * 2,
            gravity: true,
            gravity_strength: 0.1,
            ..Self::default()
        }
    }

    /// Hot, fast-cooling simulation for placing a few new nodes among pinned
    /// ones.
    pub fn quick() -> Self {
        Self {
            alpha_init: 10.0,
            alpha_decay: 0.2,
            alpha_target: 1.0,
            initial_layout: InitialLayout::Random,
            ..Self::complete()
        }
    }

    /// Load a configuration from a JSON file. Missing fields take their
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), contents)?;
        Ok(())
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f64) -> Result<()> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(LayoutError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )))
            }
        }
        fn unit_interval(name: &str, value: f64) -> Result<()> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(LayoutError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )))
            }
        }

        positive("rect.width", self.rect.width)?;
        positive("rect.height", self.rect.height)?;
        positive("default_node_radius", self.default_node_radius)?;
        positive("min_distance_between_nodes", self.min_distance_between_nodes)?;
        positive("repulsion_multiplier", self.repulsion_multiplier)?;
        positive("frame_time", self.frame_time)?;
        positive("max_velocity", self.max_velocity)?;
        positive(
            "screen_multiplier_to_clamp_position",
            self.screen_multiplier_to_clamp_position,
        )?;
        unit_interval("alpha_decay", self.alpha_decay)?;
        unit_interval("velocity_decay", self.velocity_decay)?;

        if !self.alpha_init.is_finite() || !self.alpha_target.is_finite() {
            return Err(LayoutError::InvalidConfig(
                "alpha_init and alpha_target must be finite".to_string(),
            ));
        }
        if self.convergence_tolerance.is_nan() || self.convergence_tolerance < 0.0 {
            return Err(LayoutError::InvalidConfig(format!(
                "convergence_tolerance must not be negative, got {}",
                self.convergence_tolerance
            )));
        }
        if self.theta.is_nan() || self.theta < 0.0 {
            return Err(LayoutError::InvalidConfig(format!(
                "theta must not be negative, got {}",
                self.theta
            )));
        }
        if self.gravity && (self.gravity_strength.is_nan() || self.gravity_strength < 0.0) {
            return Err(LayoutError::InvalidConfig(format!(
                "gravity_strength must not be negative, got {}",
                self.gravity_strength
            )));
        }
        if self.quadtree_capacity == 0 {
            return Err(LayoutError::InvalidConfig(
                "quadtree_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
