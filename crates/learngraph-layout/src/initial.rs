//! Seeding of initial node positions.

use std::f64::consts::PI;

use nalgebra::Vector2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::rect::Rect;

/// Distance scale of the phyllotaxis spiral.
const PHYLLOTAXIS_RADIUS: f64 = 10.0;

/// How nodes without a position are placed before the simulation starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialLayout {
    /// Uniformly at random inside the simulation rectangle.
    #[default]
    Random,
    /// Sunflower spiral around the rectangle center (deterministic).
    Phyllotaxis,
    /// Evenly spread on a circle around the rectangle center (deterministic).
    Circle,
}

impl InitialLayout {
    /// Position of the `index`-th of `count` nodes.
    pub fn position<R: Rng>(
        &self,
        index: usize,
        count: usize,
        rect: &Rect,
        rng: &mut R,
    ) -> Vector2<f64> {
        match self {
            InitialLayout::Random => random_inside(rect, rng),
            InitialLayout::Phyllotaxis => {
                let golden_angle = PI * (3.0 - 5f64.sqrt());
                let radius = PHYLLOTAXIS_RADIUS * (0.5 + index as f64).sqrt();
                let angle = index as f64 * golden_angle;
                rect.center() + Vector2::new(radius * angle.cos(), radius * angle.sin())
            }
            InitialLayout::Circle => {
                let radius = 0.45 * rect.width.min(rect.height);
                let angle = 2.0 * PI * index as f64 / count.max(1) as f64;
                rect.center() + Vector2::new(radius * angle.cos(), radius * angle.sin())
            }
        }
    }
}

/// A uniformly random point inside `rect`.
pub fn random_inside<R: Rng>(rect: &Rect, rng: &mut R) -> Vector2<f64> {
    Vector2::new(
        rect.x + rng.random::<f64>() * rect.width,
        rect.y + rng.random::<f64>() * rect.height,
    )
}
