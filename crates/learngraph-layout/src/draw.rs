//! PNG snapshots of node positions, for eyeballing a layout.

use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use nalgebra::Vector2;

use crate::graph::Node;
use crate::Result;

#[derive(Debug, Clone)]
pub struct DrawOptions {
    pub width: u32,
    pub height: u32,
    /// White dots on black instead of black dots on white.
    pub invert: bool,
    /// Empty border around the drawing, in pixels.
    pub margin: u32,
    /// Radius of a node dot, in pixels.
    pub dot_radius: u32,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            invert: false,
            margin: 20,
            dot_radius: 2,
        }
    }
}

/// Rasterize `nodes` as dots, scaled uniformly to fit the image.
///
/// Nodes with a non-finite position are not drawn.
pub fn render(nodes: &[Node], options: &DrawOptions) -> RgbImage {
    let (background, foreground) = if options.invert {
        (Rgb([0, 0, 0]), Rgb([255, 255, 255]))
    } else {
        (Rgb([255, 255, 255]), Rgb([0, 0, 0]))
    };
    let mut image = RgbImage::from_pixel(options.width, options.height, background);

    let finite: Vec<Vector2<f64>> = nodes
        .iter()
        .map(|node| node.pos)
        .filter(|pos| pos.x.is_finite() && pos.y.is_finite())
        .collect();
    let Some(first) = finite.first() else {
        return image;
    };
    let (min, max) = finite.iter().fold((*first, *first), |(min, max), pos| {
        (
            Vector2::new(min.x.min(pos.x), min.y.min(pos.y)),
            Vector2::new(max.x.max(pos.x), max.y.max(pos.y)),
        )
    });

    let margin = f64::from(options.margin);
    let usable = Vector2::new(
        (f64::from(options.width) - 2.0 * margin).max(1.0),
        (f64::from(options.height) - 2.0 * margin).max(1.0),
    );
    let span = max - min;
    let scale = match (span.x > 0.0, span.y > 0.0) {
        (true, true) => (usable.x / span.x).min(usable.y / span.y),
        (true, false) => usable.x / span.x,
        (false, true) => usable.y / span.y,
        (false, false) => 1.0,
    };
    // Center the drawing in the usable area.
    let offset = Vector2::new(margin, margin) + (usable - span * scale) / 2.0;

    for pos in &finite {
        let pixel = (pos - min) * scale + offset;
        draw_dot(&mut image, pixel, options.dot_radius, foreground);
    }
    image
}

/// Render `nodes` and write them to `path` as PNG.
pub fn draw_graph(nodes: &[Node], path: impl AsRef<Path>, options: &DrawOptions) -> Result<()> {
    render(nodes, options).save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

fn draw_dot(image: &mut RgbImage, center: Vector2<f64>, radius: u32, color: Rgb<u8>) {
    let cx = center.x.round() as i64;
    let cy = center.y.round() as i64;
    let r = i64::from(radius);
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy > r * r {
                continue;
            }
            let (x, y) = (cx + dx, cy + dy);
            if x >= 0 && y >= 0 && x < i64::from(image.width()) && y < i64::from(image.height()) {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options() -> DrawOptions {
        DrawOptions {
            width: 100,
            height: 50,
            margin: 10,
            dot_radius: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_render_scales_to_fit() {
        let nodes = vec![Node::at("a", -500.0, -500.0), Node::at("b", 500.0, 500.0)];
        let image = render(&nodes, &options());
        // Span 1000 x 1000 into 80 x 30: scale 0.03, centered horizontally.
        assert_eq!(image.get_pixel(35, 10), &Rgb([0, 0, 0]));
        assert_eq!(image.get_pixel(65, 40), &Rgb([0, 0, 0]));
        assert_eq!(image.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_render_skips_non_finite_and_inverts() {
        let nodes = vec![Node::at("nan", f64::NAN, 1.0), Node::at("a", 3.0, 3.0)];
        let image = render(
            &nodes,
            &DrawOptions {
                invert: true,
                ..options()
            },
        );
        let lit = image.pixels().filter(|p| **p == Rgb([255, 255, 255])).count();
        assert_eq!(lit, 1);
        // A single node lands in the middle.
        assert_eq!(image.get_pixel(50, 25), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_draw_graph_writes_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graph.png");
        let nodes = vec![Node::at("a", 1.0, 1.0), Node::at("b", 5.0, 2.0)];
        draw_graph(&nodes, &path, &options()).unwrap();
        let loaded = image::open(&path).unwrap();
        assert_eq!(loaded.width(), 100);
        assert_eq!(loaded.height(), 50);
    }
}
