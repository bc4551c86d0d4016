//! Force laws, temperature schedule and the simulation loop.

use std::time::{Duration, Instant};

use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, trace, warn};

use crate::body::Body;
use crate::config::{Cooling, ForceSimulationConfig};
use crate::graph::{Edge, Graph, Node};
use crate::initial::random_inside;
use crate::quadtree::QuadTree;
use crate::Result;

/// Summary of one [`ForceSimulation::compute_layout`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    pub iterations: usize,
    pub total_time: Duration,
    /// Temperature after the last step.
    pub temperature: f64,
    /// Whether the temperature reached its target within the tolerance, as
    /// opposed to hitting the iteration cap.
    pub converged: bool,
}

/// A force-directed layout simulation.
///
/// Owns the configuration, the current temperature and the random number
/// generator used for seeding positions. The same simulation can run any
/// number of layouts; each run starts from `alpha_init`.
#[derive(Debug, Clone)]
pub struct ForceSimulation {
    config: ForceSimulationConfig,
    temperature: f64,
    rng: StdRng,
}

impl ForceSimulation {
    /// Create a simulation. Fails if the configuration is out of range.
    pub fn new(config: ForceSimulationConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            temperature: config.alpha_init,
            config,
            rng,
        })
    }

    pub fn config(&self) -> &ForceSimulationConfig {
        &self.config
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Repulsion of `b` acting on `a`, pointing away from `b`.
    ///
    /// The distance is floored to `mass_a * mass_b` when the bodies overlap
    /// relative to their masses. Coincident bodies have no direction to push
    /// along and exert no force; use [`pair_repulsion`](Self::pair_repulsion)
    /// for two indexed bodies, which splits them instead.
    pub fn repulsion<A, B>(&self, a: &A, b: &B) -> Vector2<f64>
    where
        A: Body + ?Sized,
        B: Body + ?Sized,
    {
        let delta = a.position() - b.position();
        match delta.try_normalize(0.0) {
            Some(direction) => direction * self.repulsion_magnitude(a, b, delta.norm()),
            None => Vector2::zeros(),
        }
    }

    /// Repulsion of `bodies[other]` acting on `bodies[index]`.
    ///
    /// Same law as [`repulsion`](Self::repulsion), except that coincident
    /// bodies are pushed apart along the x axis at the floored distance: the
    /// lower index towards negative x, the higher one towards positive x.
    pub fn pair_repulsion<B: Body>(&self, bodies: &[B], index: usize, other: usize) -> Vector2<f64> {
        let (a, b) = (&bodies[index], &bodies[other]);
        if a.position() != b.position() {
            return self.repulsion(a, b);
        }
        let sign = if index < other { -1.0 } else { 1.0 };
        Vector2::new(sign * self.repulsion_magnitude(a, b, 0.0), 0.0)
    }

    fn repulsion_magnitude<A, B>(&self, a: &A, b: &B, mut dist: f64) -> f64
    where
        A: Body + ?Sized,
        B: Body + ?Sized,
    {
        let mass = a.mass() * b.mass();
        if dist * dist < mass {
            dist = mass;
        }
        if dist == 0.0 {
            // Massless bodies at the same spot.
            return 0.0;
        }
        self.config.repulsion_multiplier * mass * self.temperature / dist
    }

    /// Spring force along an edge. Subtract it from `from` and add it to `to`.
    ///
    /// The spring rests at `from.radius + to.radius` and is softened by the
    /// smaller radius. Coincident endpoints are treated as if `from` lay on
    /// the positive x side of `to`.
    pub fn attraction(&self, from: &Node, to: &Node, weight: f64) -> Vector2<f64> {
        let delta = from.pos - to.pos;
        let mut dist = delta.norm();
        if dist < self.config.min_distance_between_nodes {
            dist = self.config.min_distance_between_nodes;
        }
        let softening = from.radius.min(to.radius);
        let rest_length = from.radius + to.radius;
        let direction = delta.try_normalize(0.0).unwrap_or_else(|| Vector2::new(1.0, 0.0));
        direction * ((dist - rest_length) / softening * weight * self.temperature)
    }

    /// Pull of the rectangle center on `node`, proportional to its degree.
    pub fn gravity(&self, node: &Node) -> Vector2<f64> {
        (self.config.rect.center() - node.pos)
            * (self.config.gravity_strength * node.degree * self.temperature)
    }

    /// Position of the `index`-th of `count` nodes under the configured
    /// initial layout.
    pub fn seed_position(&mut self, index: usize, count: usize) -> Vector2<f64> {
        self.config
            .initial_layout
            .position(index, count, &self.config.rect, &mut self.rng)
    }

    /// A uniformly random position inside the simulation rectangle.
    pub fn random_position(&mut self) -> Vector2<f64> {
        random_inside(&self.config.rect, &mut self.rng)
    }

    /// Place all `nodes` with the configured initial layout, overwriting
    /// their positions.
    pub fn initialize_nodes(&mut self, nodes: &mut [Node]) {
        let count = nodes.len();
        for (index, node) in nodes.iter_mut().enumerate() {
            node.pos = self.seed_position(index, count);
        }
    }

    /// Move every node whose position is not finite to a random position and
    /// stop it. Returns the number of nodes moved.
    pub fn reseed_non_finite(&mut self, nodes: &mut [Node]) -> usize {
        let mut reseeded = 0;
        for node in nodes.iter_mut().filter(|node| !(node.pos.x.is_finite() && node.pos.y.is_finite())) {
            node.pos = self.random_position();
            node.vel = Vector2::zeros();
            reseeded += 1;
        }
        if reseeded > 0 {
            debug!(reseeded, "Reseeded diverged nodes");
        }
        reseeded
    }

    /// Build a [`Graph`] seeded by this simulation.
    pub fn new_graph(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Graph> {
        Graph::new(nodes, edges, self)
    }

    /// An empty quadtree over the simulation rectangle.
    pub fn new_quadtree(&self) -> QuadTree {
        QuadTree::from_config(&self.config)
    }

    /// Run one step on `graph` and cool down. Returns the duration of the step.
    pub fn step(&mut self, graph: &mut Graph, quadtree: &mut QuadTree) -> Duration {
        let started = Instant::now();
        graph.apply_force(self, self.config.frame_time, quadtree);
        let elapsed = started.elapsed();
        self.cool(elapsed);
        elapsed
    }

    /// Move the temperature towards `alpha_target`.
    pub fn cool(&mut self, elapsed: Duration) {
        let factor = match self.config.cooling {
            Cooling::PerStep => 1.0,
            Cooling::MeasuredFrameTime => elapsed.as_secs_f64(),
        };
        self.temperature += (self.config.alpha_target - self.temperature) * self.config.alpha_decay * factor;
    }

    pub fn is_converged(&self) -> bool {
        (self.temperature - self.config.alpha_target).abs() <= self.config.convergence_tolerance
    }

    /// Lay out `nodes` connected by `edges`.
    ///
    /// Steps until the temperature is within `convergence_tolerance` of its
    /// target or `max_iterations` steps ran, and returns the positioned nodes
    /// in input order.
    pub fn compute_layout(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> Result<(Vec<Node>, Stats)> {
        let started = Instant::now();
        self.temperature = self.config.alpha_init;
        let mut graph = self.new_graph(nodes, edges)?;

        if graph.nodes().is_empty() {
            return Ok((
                graph.into_nodes(),
                Stats {
                    temperature: self.temperature,
                    converged: true,
                    ..Default::default()
                },
            ));
        }

        debug!(
            nodes = graph.nodes().len(),
            edges = graph.edges().len(),
            repulsion = ?self.config.repulsion,
            parallelism = self.config.parallelism,
            "Starting layout"
        );

        let mut quadtree = self.new_quadtree();
        let mut iterations = 0;
        let mut warned = false;
        while iterations < self.config.max_iterations && !self.is_converged() {
            self.step(&mut graph, &mut quadtree);
            iterations += 1;
            trace!(iteration = iterations, temperature = self.temperature, "Step");

            if !warned && graph.unindexed() > 0 {
                warn!(
                    dropped = graph.unindexed(),
                    iteration = iterations,
                    "Nodes outside the simulation rectangle exert no repulsion on other nodes"
                );
                warned = true;
            }
        }

        let stats = Stats {
            iterations,
            total_time: started.elapsed(),
            temperature: self.temperature,
            converged: self.is_converged(),
        };
        info!(
            iterations = stats.iterations,
            elapsed_ms = stats.total_time.as_millis() as u64,
            temperature = stats.temperature,
            converged = stats.converged,
            "Layout finished"
        );
        Ok((graph.into_nodes(), stats))
    }
}
