//! Axis-aligned rectangles and their quadrants.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle, given by its top-left corner and its extent.
///
/// Screen coordinates: `y` grows downwards, so "north" is the half with the
/// smaller `y` values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One of the four equal sub-rectangles of a [`Rect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Quadrant {
    /// All quadrants in storage order.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::NorthWest,
        Quadrant::NorthEast,
        Quadrant::SouthWest,
        Quadrant::SouthEast,
    ];

    /// Offset of this quadrant among its siblings.
    pub fn index(self) -> usize {
        match self {
            Quadrant::NorthWest => 0,
            Quadrant::NorthEast => 1,
            Quadrant::SouthWest => 2,
            Quadrant::SouthEast => 3,
        }
    }
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Closed on both ends of both axes. NaN coordinates are never contained.
    pub fn contains(&self, pos: &Vector2<f64>) -> bool {
        pos.x >= self.x
            && pos.x <= self.x + self.width
            && pos.y >= self.y
            && pos.y <= self.y + self.height
    }

    /// Midpoint of the rectangle.
    pub fn center(&self) -> Vector2<f64> {
        Vector2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// The quadrant a point belongs to.
    ///
    /// The split lines belong to the east/south halves, so a point on a
    /// shared boundary is assigned to exactly one quadrant.
    pub fn quadrant_of(&self, pos: &Vector2<f64>) -> Quadrant {
        let center = self.center();
        match (pos.x < center.x, pos.y < center.y) {
            (true, true) => Quadrant::NorthWest,
            (false, true) => Quadrant::NorthEast,
            (true, false) => Quadrant::SouthWest,
            (false, false) => Quadrant::SouthEast,
        }
    }

    /// The sub-rectangle covering the given quadrant.
    pub fn quadrant(&self, quadrant: Quadrant) -> Rect {
        let half_width = self.width / 2.0;
        let half_height = self.height / 2.0;
        let mid_x = self.x + half_width;
        let mid_y = self.y + half_height;
        match quadrant {
            Quadrant::NorthWest => Rect::new(self.x, self.y, half_width, half_height),
            Quadrant::NorthEast => Rect::new(mid_x, self.y, half_width, half_height),
            Quadrant::SouthWest => Rect::new(self.x, mid_y, half_width, half_height),
            Quadrant::SouthEast => Rect::new(mid_x, mid_y, half_width, half_height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_closed() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains(&Vector2::new(0.0, 0.0)));
        assert!(rect.contains(&Vector2::new(10.0, 10.0)));
        assert!(rect.contains(&Vector2::new(5.0, 3.0)));
        assert!(!rect.contains(&Vector2::new(10.0001, 5.0)));
        assert!(!rect.contains(&Vector2::new(5.0, -0.0001)));
        assert!(!rect.contains(&Vector2::new(f64::NAN, 5.0)));
    }

    #[test]
    fn test_center() {
        let rect = Rect::new(-10.0, 20.0, 40.0, 10.0);
        assert_eq!(rect.center(), Vector2::new(10.0, 25.0));
    }

    #[test]
    fn test_boundary_point_has_single_quadrant() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(rect.quadrant_of(&Vector2::new(5.0, 5.0)), Quadrant::SouthEast);
        assert_eq!(rect.quadrant_of(&Vector2::new(4.999, 5.0)), Quadrant::SouthWest);
        assert_eq!(rect.quadrant_of(&Vector2::new(5.0, 4.999)), Quadrant::NorthEast);
        assert_eq!(rect.quadrant_of(&Vector2::new(0.0, 0.0)), Quadrant::NorthWest);
    }

    #[test]
    fn test_quadrants_contain_their_points() {
        let rect = Rect::new(-4.0, 2.0, 8.0, 6.0);
        let points = [
            Vector2::new(-3.0, 3.0),
            Vector2::new(3.0, 3.0),
            Vector2::new(-3.0, 7.0),
            Vector2::new(3.0, 7.0),
            Vector2::new(0.0, 5.0),
        ];
        for point in points {
            let quadrant = rect.quadrant_of(&point);
            assert!(rect.quadrant(quadrant).contains(&point), "{point:?} in {quadrant:?}");
        }
        assert_eq!(rect.quadrant(Quadrant::SouthEast), Rect::new(0.0, 5.0, 4.0, 3.0));
    }
}
