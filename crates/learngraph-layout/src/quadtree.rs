//! Barnes-Hut quadtree for O(n log n) repulsion approximation.
//!
//! The tree recursively subdivides the simulation rectangle and aggregates
//! the mass and center of mass of every cell. Cells that are far away from a
//! node relative to their size are treated as a single pseudo-body.
//!
//! Cells live in an arena (`Vec<Cell>`) and store indices into the caller's
//! body slice, never the bodies themselves. The tree is cleared and rebuilt
//! every simulation step; during the force phase it is only read.

use nalgebra::Vector2;
use tracing::debug;

use crate::body::{Body, PointMass};
use crate::config::ForceSimulationConfig;
use crate::layout::ForceSimulation;
use crate::rect::{Quadrant, Rect};

/// Default number of bodies a leaf holds before it is subdivided.
pub const DEFAULT_CAPACITY: usize = 10;

/// Default subdivision depth cap.
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// A single cell of the quadtree.
#[derive(Debug, Clone)]
pub struct Cell {
    region: Rect,
    depth: usize,
    /// Body indices held directly; always empty for internal cells.
    bodies: Vec<usize>,
    /// Arena index of the north-west child, the other three follow in
    /// [`Quadrant::ALL`] order.
    children: Option<usize>,
    total_mass: f64,
    center: Vector2<f64>,
}

impl Cell {
    fn new(region: Rect, depth: usize) -> Self {
        Self {
            region,
            depth,
            bodies: Vec::new(),
            children: None,
            total_mass: 0.0,
            center: Vector2::zeros(),
        }
    }

    pub fn region(&self) -> Rect {
        self.region
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Indices of the bodies stored directly in this cell.
    pub fn bodies(&self) -> &[usize] {
        &self.bodies
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Sum of the degrees below this cell. Valid after [`QuadTree::calculate_masses`].
    pub fn total_mass(&self) -> f64 {
        self.total_mass
    }

    /// Center of mass; NaN for cells without any mass.
    /// Valid after [`QuadTree::calculate_masses`].
    pub fn center(&self) -> Vector2<f64> {
        self.center
    }
}

impl Body for Cell {
    fn mass(&self) -> f64 {
        self.total_mass
    }

    fn position(&self) -> Vector2<f64> {
        self.center
    }
}

/// A Barnes-Hut quadtree over a fixed root region.
#[derive(Debug, Clone)]
pub struct QuadTree {
    cells: Vec<Cell>,
    capacity: usize,
    max_depth: usize,
    parallel_depth: usize,
    len: usize,
}

impl QuadTree {
    /// Arena index of the root cell.
    pub const ROOT: usize = 0;

    /// Create an empty tree over `region`.
    ///
    /// A `capacity` of zero is treated as one.
    pub fn new(region: Rect, capacity: usize, max_depth: usize) -> Self {
        Self {
            cells: vec![Cell::new(region, 0)],
            capacity: capacity.max(1),
            max_depth,
            parallel_depth: 0,
            len: 0,
        }
    }

    /// Create an empty tree sized and tuned by a simulation config.
    pub fn from_config(config: &ForceSimulationConfig) -> Self {
        Self::new(
            config.rect,
            config.quadtree_capacity,
            config.quadtree_max_depth,
        )
        .with_parallel_depth(config.tree_parallel_depth)
    }

    /// Fork force queries across children for cells shallower than `depth`.
    pub fn with_parallel_depth(mut self, depth: usize) -> Self {
        self.parallel_depth = depth;
        self
    }

    pub fn region(&self) -> Rect {
        self.cells[Self::ROOT].region
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bodies inserted since the last [`clear`](Self::clear).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn root(&self) -> &Cell {
        &self.cells[Self::ROOT]
    }

    /// Look up a cell by arena index.
    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// The child of `cell` covering `quadrant`, if `cell` is subdivided.
    pub fn child(&self, cell: usize, quadrant: Quadrant) -> Option<&Cell> {
        let first = self.cells.get(cell)?.children?;
        self.cells.get(first + quadrant.index())
    }

    /// Drop all bodies and cells except the (emptied) root.
    pub fn clear(&mut self) {
        self.cells.truncate(1);
        let root = &mut self.cells[Self::ROOT];
        root.bodies.clear();
        root.children = None;
        root.total_mass = 0.0;
        root.center = Vector2::zeros();
        self.len = 0;
    }

    /// Insert the body `index` of `bodies`.
    ///
    /// Returns `false` if its position lies outside the root region (or is
    /// not a number); the body is then not part of the index.
    pub fn insert<B: Body>(&mut self, bodies: &[B], index: usize) -> bool {
        let pos = bodies[index].position();
        if !self.cells[Self::ROOT].region.contains(&pos) {
            return false;
        }
        self.insert_into(Self::ROOT, bodies, index, pos);
        self.len += 1;
        true
    }

    fn insert_into<B: Body>(&mut self, mut cell: usize, bodies: &[B], index: usize, pos: Vector2<f64>) {
        loop {
            if let Some(first) = self.cells[cell].children {
                cell = first + self.cells[cell].region.quadrant_of(&pos).index();
                continue;
            }

            let depth = self.cells[cell].depth;
            let held = self.cells[cell].bodies.len();
            if held < self.capacity || depth >= self.max_depth {
                if held >= self.capacity {
                    // Coincident bodies cannot be separated by subdividing.
                    debug!(depth, held, "Depth cap reached, keeping leaf over capacity");
                }
                self.cells[cell].bodies.push(index);
                return;
            }

            self.subdivide(cell, bodies);
        }
    }

    /// Split a full leaf into four children and push its bodies down.
    fn subdivide<B: Body>(&mut self, cell: usize, bodies: &[B]) {
        let region = self.cells[cell].region;
        let depth = self.cells[cell].depth + 1;
        let first = self.cells.len();
        for quadrant in Quadrant::ALL {
            self.cells.push(Cell::new(region.quadrant(quadrant), depth));
        }
        self.cells[cell].children = Some(first);

        let held = std::mem::take(&mut self.cells[cell].bodies);
        for index in held {
            let pos = bodies[index].position();
            let child = first + region.quadrant_of(&pos).index();
            self.insert_into(child, bodies, index, pos);
        }
    }

    /// Aggregate mass and center of mass bottom-up.
    ///
    /// A leaf sums the masses of its bodies and takes their mass-weighted
    /// mean position. An internal cell does the same over its children,
    /// treating each as a point mass; children without mass are skipped so
    /// they do not poison the parent's center. Cells without any mass end
    /// up with a NaN center.
    pub fn calculate_masses<B: Body>(&mut self, bodies: &[B]) {
        // Children are always allocated after their parent, so walking the
        // arena backwards visits every child before its parent.
        for cell in (0..self.cells.len()).rev() {
            let (total_mass, weighted) = match self.cells[cell].children {
                None => self.cells[cell]
                    .bodies
                    .iter()
                    .map(|&index| &bodies[index])
                    .fold((0.0, Vector2::<f64>::zeros()), |(mass, weighted), body| {
                        (mass + body.mass(), weighted + body.position() * body.mass())
                    }),
                Some(first) => self.cells[first..first + 4]
                    .iter()
                    .filter(|child| child.total_mass > 0.0)
                    .fold((0.0, Vector2::<f64>::zeros()), |(mass, weighted), child| {
                        (mass + child.total_mass, weighted + child.center * child.total_mass)
                    }),
            };
            let target = &mut self.cells[cell];
            target.total_mass = total_mass;
            target.center = weighted / total_mass;
        }
    }

    /// Approximate repulsion acting on body `index`.
    ///
    /// Leaves contribute the exact pairwise repulsion of every body they hold
    /// except `index` itself. An internal cell whose width `s` and distance
    /// `d` to the node satisfy `s / d < theta` contributes as one pseudo-body
    /// at its center of mass; otherwise its children are visited. When the
    /// approximated cell holds the node itself, its own mass is taken out of
    /// the pseudo-body first.
    ///
    /// Requires [`calculate_masses`](Self::calculate_masses) to have run on the
    /// same bodies, with `index` inserted if it lies inside the root region.
    pub fn calculate_force<B: Body + Sync>(
        &self,
        simulation: &ForceSimulation,
        bodies: &[B],
        index: usize,
        theta: f64,
    ) -> Vector2<f64> {
        let inside = self.cells[Self::ROOT].region.contains(&bodies[index].position());
        self.force_from(Self::ROOT, inside, simulation, bodies, index, theta)
    }

    /// `holds_target` tells whether `bodies[index]` is stored below `cell`.
    fn force_from<B: Body + Sync>(
        &self,
        cell: usize,
        holds_target: bool,
        simulation: &ForceSimulation,
        bodies: &[B],
        index: usize,
        theta: f64,
    ) -> Vector2<f64> {
        let node = &self.cells[cell];
        let target = &bodies[index];

        let Some(first) = node.children else {
            return node
                .bodies
                .iter()
                .filter(|&&other| other != index)
                .fold(Vector2::zeros(), |total, &other| {
                    total + simulation.pair_repulsion(bodies, index, other)
                });
        };

        let d = (target.position() - node.center).norm();
        let s = node.region.width;
        if s / d < theta {
            if !holds_target {
                return simulation.repulsion(target, node);
            }
            let mass = node.total_mass - target.mass();
            if mass <= 0.0 {
                return Vector2::zeros();
            }
            let rest = PointMass {
                mass,
                position: (node.center * node.total_mass - target.position() * target.mass()) / mass,
            };
            return simulation.repulsion(target, &rest);
        }

        // Insertion follows the same quadrant path.
        let home = holds_target.then(|| first + node.region.quadrant_of(&target.position()).index());
        if node.depth < self.parallel_depth {
            let recurse = |child: usize| {
                self.force_from(child, home == Some(child), simulation, bodies, index, theta)
            };
            let ((nw, ne), (sw, se)) = rayon::join(
                || rayon::join(|| recurse(first), || recurse(first + 1)),
                || rayon::join(|| recurse(first + 2), || recurse(first + 3)),
            );
            // Same association order as the sequential fold below.
            Vector2::zeros() + nw + ne + sw + se
        } else {
            (first..first + 4).fold(Vector2::zeros(), |total, child| {
                total + self.force_from(child, home == Some(child), simulation, bodies, index, theta)
            })
        }
    }
}
