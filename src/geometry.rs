//! Eye geometry extraction: iris circle and eyelid polygon in pixel space.

use crate::{
    constants::{DEFAULT_IRIS_RADIUS_SCALE, DEFAULT_MIN_IRIS_RADIUS_FRACTION},
    landmarks::{EyeRegion, EyeSide, LandmarkSet},
    Error, Result,
};

/// Pixel dimensions of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A point in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Iris circle in pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrisGeometry {
    pub center: PixelPoint,
    pub radius: f64,
}

impl IrisGeometry {
    #[must_use]
    pub const fn new(center: PixelPoint, radius: f64) -> Self {
        Self { center, radius }
    }
}

/// Everything the renderer needs for one eye
#[derive(Debug, Clone, PartialEq)]
pub struct EyeGeometry {
    pub side: EyeSide,
    pub iris: IrisGeometry,
    /// Iris ring points, for debug drawing
    pub iris_contour: Vec<PixelPoint>,
    /// Closed eyelid polygon; the last vertex connects back to the first
    pub eyelid: Vec<PixelPoint>,
}

/// Tunables of the iris estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryParams {
    /// Multiplier from mean landmark spread to visible iris radius
    pub radius_scale: f64,
    /// Radius floor as a fraction of surface width
    pub min_radius_fraction: f64,
}

impl Default for GeometryParams {
    fn default() -> Self {
        Self {
            radius_scale: DEFAULT_IRIS_RADIUS_SCALE,
            min_radius_fraction: DEFAULT_MIN_IRIS_RADIUS_FRACTION,
        }
    }
}

impl GeometryParams {
    /// Smallest radius allowed on a surface of the given size
    #[must_use]
    pub fn min_radius(&self, surface: SurfaceSize) -> f64 {
        f64::from(surface.width) * self.min_radius_fraction
    }
}

/// Map the given landmark indices to pixel space
///
/// # Errors
///
/// Returns an error if an index is outside the landmark set.
pub fn to_pixels(landmarks: &LandmarkSet, indices: &[usize], surface: SurfaceSize) -> Result<Vec<PixelPoint>> {
    let width = f64::from(surface.width);
    let height = f64::from(surface.height);

    indices
        .iter()
        .map(|&idx| {
            landmarks
                .get(idx)
                .map(|p| PixelPoint::new(p.x * width, p.y * height))
                .ok_or_else(|| Error::InvalidInput(format!("Landmark index {idx} out of range")))
        })
        .collect()
}

/// Estimate the iris circle from its ring points
#[must_use]
#[allow(clippy::cast_precision_loss)] // Point counts are tiny
pub fn iris_from_points(points: &[PixelPoint], params: &GeometryParams, surface: SurfaceSize) -> IrisGeometry {
    let n = points.len() as f64;
    let center = PixelPoint::new(
        points.iter().map(|p| p.x).sum::<f64>() / n,
        points.iter().map(|p| p.y).sum::<f64>() / n,
    );
    let spread = points.iter().map(|p| p.distance(&center)).sum::<f64>() / n;
    let radius = (spread * params.radius_scale).max(params.min_radius(surface));

    IrisGeometry::new(center, radius)
}

/// Compute the iris circle and eyelid polygon of one eye.
///
/// Pure: the same landmarks and surface size always produce the same result.
/// Pixel mapping is recomputed on every call because the surface can be
/// resized between frames.
///
/// # Errors
///
/// Returns an error if the surface is empty, the iris index set is empty, or
/// an index is outside the landmark set.
pub fn extract_geometry(
    landmarks: &LandmarkSet,
    region: &EyeRegion,
    surface: SurfaceSize,
    params: &GeometryParams,
) -> Result<EyeGeometry> {
    if surface.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Cannot map landmarks onto a {}x{} surface",
            surface.width, surface.height
        )));
    }
    if region.iris.is_empty() {
        return Err(Error::InvalidInput("Eye region has no iris points".to_string()));
    }

    let iris_contour = to_pixels(landmarks, region.iris, surface)?;
    let eyelid = to_pixels(landmarks, region.eyelid, surface)?;
    let iris = iris_from_points(&iris_contour, params, surface);

    Ok(EyeGeometry {
        side: region.side,
        iris,
        iris_contour,
        eyelid,
    })
}
