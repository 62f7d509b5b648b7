//! Face-mesh landmark types and the static eye regions.
//!
//! Landmarks are normalized to the frame: `(0, 0)` is the top-left corner and
//! `(1, 1)` the bottom-right. Indices follow the refined 478-point face-mesh
//! topology, where 468..=477 are the iris points added by refinement.

use crate::{
    constants::{NUM_FACE_MESH_LANDMARKS, NUM_UNREFINED_LANDMARKS},
    Error, Result,
};

/// A single normalized landmark
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    /// Horizontal position relative to frame width
    pub x: f64,
    /// Vertical position relative to frame height
    pub y: f64,
}

impl Landmark {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The complete landmark set of one face.
///
/// Always holds exactly [`NUM_FACE_MESH_LANDMARKS`] points; the constructors
/// enforce it so smoothing state built from a set is never partially populated.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    /// Build a landmark set, validating the point count and coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if the set does not contain exactly 478 points or if
    /// any coordinate is not finite.
    pub fn new(points: Vec<Landmark>) -> Result<Self> {
        if points.len() == NUM_UNREFINED_LANDMARKS {
            return Err(Error::InvalidInput(format!(
                "Got {NUM_UNREFINED_LANDMARKS} landmarks without iris points; enable landmark refinement"
            )));
        }
        if points.len() != NUM_FACE_MESH_LANDMARKS {
            return Err(Error::InvalidInput(format!(
                "Expected {NUM_FACE_MESH_LANDMARKS} landmarks, got {}",
                points.len()
            )));
        }

        if let Some(idx) = points.iter().position(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(Error::InvalidInput(format!("Landmark {idx} has a non-finite coordinate")));
        }

        Ok(Self { points })
    }

    /// Build a landmark set from `(x, y)` pairs as produced by a detector
    ///
    /// # Errors
    ///
    /// Same conditions as [`LandmarkSet::new`].
    pub fn from_normalized(points: &[(f32, f32)]) -> Result<Self> {
        Self::new(
            points
                .iter()
                .map(|&(x, y)| Landmark::new(f64::from(x), f64::from(y)))
                .collect(),
        )
    }

    /// Landmark at `index`, if it exists
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Landmark> {
        self.points.get(index).copied()
    }

    #[must_use]
    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    /// Mutable access for in-place smoothing; the length cannot change through a slice
    pub(crate) fn points_mut(&mut self) -> &mut [Landmark] {
        &mut self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Which eye a region or geometry belongs to, from the subject's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EyeSide {
    Left,
    Right,
}

impl EyeSide {
    pub const BOTH: [Self; 2] = [Self::Left, Self::Right];

    /// Slot used for per-side state arrays
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    #[must_use]
    pub const fn region(self) -> &'static EyeRegion {
        match self {
            Self::Left => &EyeRegion::LEFT,
            Self::Right => &EyeRegion::RIGHT,
        }
    }
}

/// Static landmark indices describing one eye
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeRegion {
    pub side: EyeSide,
    /// Iris ring points
    pub iris: &'static [usize],
    /// Eyelid contour, in polygon order
    pub eyelid: &'static [usize],
}

impl EyeRegion {
    pub const LEFT: Self = Self {
        side: EyeSide::Left,
        iris: &[474, 475, 476, 477],
        eyelid: &[362, 382, 381, 380, 374, 373, 390, 249, 263, 466, 388, 387, 386, 385, 384, 398],
    };

    pub const RIGHT: Self = Self {
        side: EyeSide::Right,
        iris: &[469, 470, 471, 472],
        eyelid: &[33, 7, 163, 144, 145, 153, 154, 155, 133, 173, 157, 158, 159, 160, 161, 246],
    };
}
