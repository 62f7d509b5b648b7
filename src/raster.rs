//! Paths and binary clip masks for the overlay, built on tiny-skia.
//!
//! Masks are rasterized without anti-aliasing, so a pixel is either inside a
//! clip or not: a pixel is covered when its centre lies inside the shape.
//! Each mask only spans a [`Window`] of the surface, so per-eye masks stay
//! small on large surfaces.

use crate::{
    geometry::{PixelPoint, SurfaceSize},
    utils::safe_cast::f64_to_u32_clamp,
};
use tiny_skia::{FillRule, Mask, Path, PathBuilder, Rect, Transform};

/// Pixel rectangle of a surface with its own local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Window {
    /// Pixels whose centres may fall inside the vertices' bounding box, clipped to the surface
    #[must_use]
    pub fn around(vertices: &[PixelPoint], surface: SurfaceSize) -> Option<Self> {
        if vertices.is_empty() || vertices.iter().any(|v| !v.x.is_finite() || !v.y.is_finite()) {
            return None;
        }
        let (min_x, min_y, max_x, max_y) = vertices.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), v| (x0.min(v.x), y0.min(v.y), x1.max(v.x), y1.max(v.y)),
        );
        let x = f64_to_u32_clamp(min_x.floor(), 0, surface.width);
        let y = f64_to_u32_clamp(min_y.floor(), 0, surface.height);
        let right = f64_to_u32_clamp(max_x.ceil(), 0, surface.width);
        let bottom = f64_to_u32_clamp(max_y.ceil(), 0, surface.height);
        (right > x && bottom > y).then(|| Self {
            x,
            y,
            width: right - x,
            height: bottom - y,
        })
    }

    /// Maps surface coordinates into the window
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Surface dimensions fit f32 exactly
    pub fn transform(&self) -> Transform {
        Transform::from_translate(-(self.x as f32), -(self.y as f32))
    }

    #[must_use]
    pub const fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x - self.x < self.width && y - self.y < self.height
    }
}

/// Binary clip mask over a window of the surface
#[derive(Debug, Clone)]
pub struct ClipMask {
    window: Window,
    mask: Mask,
}

impl ClipMask {
    /// Interior of a closed polygon under the even-odd rule.
    ///
    /// Returns `None` when the polygon covers no pixel centre: fewer than
    /// three vertices, a non-finite vertex, zero area, or entirely off-surface.
    #[must_use]
    pub fn polygon(vertices: &[PixelPoint], surface: SurfaceSize) -> Option<Self> {
        let window = Window::around(vertices, surface)?;
        let path = polygon_path(vertices)?;
        let mut mask = Mask::new(window.width, window.height)?;
        mask.fill_path(&path, FillRule::EvenOdd, false, window.transform());

        let clip = Self { window, mask };
        (!clip.is_empty()).then_some(clip)
    }

    /// Keep only pixels also inside `path`; a missing path empties the mask
    pub fn intersect(&mut self, path: Option<&Path>) {
        match path {
            Some(path) => self
                .mask
                .intersect_path(path, FillRule::Winding, false, self.window.transform()),
            None => self.mask.data_mut().fill(0),
        }
    }

    /// Copy of this mask restricted to `path`
    #[must_use]
    pub fn intersected(&self, path: Option<&Path>) -> Self {
        let mut clip = self.clone();
        clip.intersect(path);
        clip
    }

    #[must_use]
    pub const fn window(&self) -> Window {
        self.window
    }

    /// The mask in window coordinates, for painting into a window-sized layer
    #[must_use]
    pub const fn mask(&self) -> &Mask {
        &self.mask
    }

    /// Whether surface pixel `(x, y)` is covered
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        if !self.window.contains(x, y) {
            return false;
        }
        let idx = (y - self.window.y) as usize * self.window.width as usize + (x - self.window.x) as usize;
        self.mask.data()[idx] > 0
    }

    /// Covered surface pixels in row-major order
    #[allow(clippy::cast_possible_truncation)] // Index is bounded by the window area
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let Window { x, y, width, .. } = self.window;
        self.mask
            .data()
            .iter()
            .enumerate()
            .filter(|(_, &coverage)| coverage > 0)
            .map(move |(idx, _)| {
                let idx = idx as u32;
                (x + idx % width, y + idx / width)
            })
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.mask.data().iter().filter(|&&coverage| coverage > 0).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mask.data().iter().all(|&coverage| coverage == 0)
    }
}

/// Closed path through the vertices, or `None` if there is no area to fill
#[must_use]
pub fn polygon_path(vertices: &[PixelPoint]) -> Option<Path> {
    if vertices.len() < 3 {
        return None;
    }
    outline_path(vertices)
}

/// Closed outline through the vertices, for stroking
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Pixel coordinates fit f32
pub fn outline_path(vertices: &[PixelPoint]) -> Option<Path> {
    let (first, rest) = vertices.split_first()?;
    if rest.is_empty() || vertices.iter().any(|v| !v.x.is_finite() || !v.y.is_finite()) {
        return None;
    }
    let mut pb = PathBuilder::with_capacity(vertices.len() + 1, vertices.len() + 1);
    pb.move_to(first.x as f32, first.y as f32);
    for v in rest {
        pb.line_to(v.x as f32, v.y as f32);
    }
    pb.close();
    pb.finish()
}

/// Filled circle, or `None` for a negative or non-finite radius
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Pixel coordinates fit f32
pub fn circle_path(center: PixelPoint, radius: f64) -> Option<Path> {
    PathBuilder::from_circle(center.x as f32, center.y as f32, radius as f32)
}

/// Axis-aligned square centred on `center`, or `None` for a non-positive side
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Pixel coordinates fit f32
pub fn square_rect(center: PixelPoint, side: f64) -> Option<Rect> {
    if !(side > 0.0) {
        return None;
    }
    let half = side / 2.0;
    Rect::from_xywh((center.x - half) as f32, (center.y - half) as f32, side as f32, side as f32)
}

/// Even-odd point-in-polygon test for pixel-centre containment checks
#[must_use]
pub fn point_in_polygon(point: PixelPoint, vertices: &[PixelPoint]) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    vertices
        .iter()
        .zip(vertices.iter().cycle().skip(1))
        .filter(|(a, b)| (a.y > point.y) != (b.y > point.y))
        .map(|(a, b)| (point.y - a.y) * (b.x - a.x) / (b.y - a.y) + a.x)
        .filter(|&x| point.x < x)
        .count()
        % 2
        == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURFACE: SurfaceSize = SurfaceSize::new(64, 48);

    fn square_polygon(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<PixelPoint> {
        vec![
            PixelPoint::new(x0, y0),
            PixelPoint::new(x1, y0),
            PixelPoint::new(x1, y1),
            PixelPoint::new(x0, y1),
        ]
    }

    #[test]
    fn test_rectangle_fill() {
        let mask = ClipMask::polygon(&square_polygon(10.0, 10.0, 20.0, 15.0), SURFACE).unwrap();
        assert_eq!(mask.count(), 50);
        assert!(mask.contains(10, 10));
        assert!(mask.contains(19, 14));
        assert!(!mask.contains(20, 14));
        assert!(!mask.contains(9, 12));
    }

    #[test]
    fn test_self_intersecting_even_odd() {
        // Two overlapping rectangles traced as one path: the overlap is outside.
        let mut vertices = square_polygon(0.0, 0.0, 20.0, 20.0);
        vertices.extend(square_polygon(10.0, 10.0, 30.0, 30.0));
        let mask = ClipMask::polygon(&vertices, SURFACE).unwrap();

        assert!(mask.contains(5, 5));
        assert!(!mask.contains(15, 15));
        assert!(!point_in_polygon(PixelPoint::new(15.5, 15.5), &vertices));
    }

    #[test]
    fn test_degenerate_polygon_is_none() {
        let line = vec![PixelPoint::new(0.0, 0.0), PixelPoint::new(10.0, 10.0)];
        assert!(ClipMask::polygon(&line, SURFACE).is_none());

        let collapsed = vec![PixelPoint::new(5.0, 5.0); 16];
        assert!(ClipMask::polygon(&collapsed, SURFACE).is_none());

        let flat = square_polygon(5.0, 10.0, 40.0, 10.0);
        assert!(ClipMask::polygon(&flat, SURFACE).is_none());

        let mut bad = square_polygon(5.0, 5.0, 20.0, 20.0);
        bad[2].x = f64::NAN;
        assert!(ClipMask::polygon(&bad, SURFACE).is_none());
    }

    #[test]
    fn test_polygon_clipped_to_surface() {
        let mask = ClipMask::polygon(&square_polygon(-10.0, -10.0, 100.0, 100.0), SURFACE).unwrap();
        assert_eq!(mask.count(), 64 * 48);
        assert!(ClipMask::polygon(&square_polygon(70.0, 0.0, 90.0, 20.0), SURFACE).is_none());
    }

    #[test]
    fn test_mask_matches_point_test() {
        let vertices = vec![
            PixelPoint::new(5.4, 20.8),
            PixelPoint::new(30.8, 3.9),
            PixelPoint::new(58.5, 22.3),
            PixelPoint::new(32.1, 40.0),
            PixelPoint::new(40.7, 22.8),
        ];
        let mask = ClipMask::polygon(&vertices, SURFACE).unwrap();
        for y in 0..SURFACE.height {
            for x in 0..SURFACE.width {
                let centre = PixelPoint::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                assert_eq!(mask.contains(x, y), point_in_polygon(centre, &vertices), "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_intersect_circle() {
        let mut mask = ClipMask::polygon(&square_polygon(0.0, 0.0, 64.0, 48.0), SURFACE).unwrap();
        mask.intersect(circle_path(PixelPoint::new(32.0, 24.0), 3.0).as_ref());
        assert!(mask.contains(32, 24));
        assert!(!mask.contains(36, 24));
        assert!(mask.count() < 40);
    }

    #[test]
    fn test_intersect_square() {
        let a = ClipMask::polygon(&square_polygon(0.0, 0.0, 20.0, 20.0), SURFACE).unwrap();
        let square = square_rect(PixelPoint::new(20.0, 20.0), 20.0).map(PathBuilder::from_rect);
        let both = a.intersected(square.as_ref());
        assert_eq!(both.count(), 100);
        assert!(both.pixels().all(|(x, y)| a.contains(x, y) && (10..20).contains(&x) && (10..20).contains(&y)));
    }

    #[test]
    fn test_intersect_missing_path_is_empty() {
        let a = ClipMask::polygon(&square_polygon(0.0, 0.0, 20.0, 20.0), SURFACE).unwrap();
        assert!(a.intersected(circle_path(PixelPoint::new(5.0, 5.0), 0.0).as_ref()).is_empty());
        assert!(a.intersected(circle_path(PixelPoint::new(50.0, 40.0), 3.0).as_ref()).is_empty());
    }

    #[test]
    fn test_window_bounds() {
        let window = Window::around(&square_polygon(10.2, 4.7, 20.5, 9.0), SURFACE).unwrap();
        assert_eq!(window, Window { x: 10, y: 4, width: 11, height: 5 });
        assert!(window.contains(20, 8));
        assert!(!window.contains(21, 8));
        assert!(Window::around(&[], SURFACE).is_none());
    }

    #[test]
    fn test_outline_needs_two_points() {
        assert!(outline_path(&[PixelPoint::new(1.0, 1.0)]).is_none());
        assert!(outline_path(&[PixelPoint::new(1.0, 1.0), PixelPoint::new(9.0, 1.0)]).is_some());
        assert!(polygon_path(&[PixelPoint::new(1.0, 1.0), PixelPoint::new(9.0, 1.0)]).is_none());
    }
}
