//! Anything that can take part in the repulsion law.

use nalgebra::Vector2;

/// A point mass: a scalar mass at a position.
///
/// Implemented by graph nodes (mass = degree) and by quadtree cells (mass =
/// aggregated degree at the center of mass), so one repulsion law serves
/// both the exact and the approximated computation.
pub trait Body {
    fn mass(&self) -> f64;
    fn position(&self) -> Vector2<f64>;
}

/// A free-standing point mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointMass {
    pub mass: f64,
    pub position: Vector2<f64>,
}

impl PointMass {
    pub fn new(mass: f64, x: f64, y: f64) -> Self {
        Self {
            mass,
            position: Vector2::new(x, y),
        }
    }
}

impl Body for PointMass {
    fn mass(&self) -> f64 {
        self.mass
    }

    fn position(&self) -> Vector2<f64> {
        self.position
    }
}

impl<B: Body + ?Sized> Body for &B {
    fn mass(&self) -> f64 {
        (**self).mass()
    }

    fn position(&self) -> Vector2<f64> {
        (**self).position()
    }
}
