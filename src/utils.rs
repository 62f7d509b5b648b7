//! Utility functions for detector crops and coordinate transformations.

pub mod safe_cast;

#[cfg(feature = "camera")]
pub mod image_conversion;

use crate::{geometry::SurfaceSize, landmarks::LandmarkSet};
use safe_cast::f64_to_u32_clamp;

/// Axis-aligned pixel rectangle inside a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Expand regions by `shift` of their size on every side, make them square
/// and keep them inside `bounds`
pub fn refine_regions(regions: &mut [Region], bounds: SurfaceSize, shift: f64) {
    let max_width = f64::from(bounds.width);
    let max_height = f64::from(bounds.height);
    let max_side = bounds.width.min(bounds.height);

    for region in regions.iter_mut() {
        let x_shift = f64::from(region.width) * shift;
        let y_shift = f64::from(region.height) * shift;

        // Expand the region
        let x = (f64::from(region.x) - x_shift).max(0.0);
        let y = (f64::from(region.y) - y_shift).max(0.0);
        let width = (2.0f64.mul_add(x_shift, f64::from(region.width))).min(max_width - x);
        let height = (2.0f64.mul_add(y_shift, f64::from(region.height))).min(max_height - y);

        // Make it square
        let side = f64_to_u32_clamp(width.max(height).round(), 0, max_side);

        // Ensure it doesn't exceed frame boundaries
        region.x = f64_to_u32_clamp(x.round(), 0, bounds.width).min(bounds.width - side);
        region.y = f64_to_u32_clamp(y.round(), 0, bounds.height).min(bounds.height - side);
        region.width = side;
        region.height = side;
    }
}

/// Square crop around all landmarks, enlarged by `scale`, for tracking the
/// face into the next frame
#[must_use]
pub fn landmark_region(landmarks: &LandmarkSet, frame: SurfaceSize, scale: f64) -> Region {
    let width = f64::from(frame.width);
    let height = f64::from(frame.height);

    let (min_x, min_y, max_x, max_y) = landmarks.points().iter().fold(
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
    );
    if !min_x.is_finite() || !max_x.is_finite() {
        return Region::default();
    }

    let x0 = f64_to_u32_clamp((min_x * width).floor(), 0, frame.width);
    let y0 = f64_to_u32_clamp((min_y * height).floor(), 0, frame.height);
    let x1 = f64_to_u32_clamp((max_x * width).ceil(), 0, frame.width);
    let y1 = f64_to_u32_clamp((max_y * height).ceil(), 0, frame.height);

    let mut regions = [Region::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))];
    refine_regions(&mut regions, frame, (scale - 1.0) / 2.0);
    regions[0]
}
