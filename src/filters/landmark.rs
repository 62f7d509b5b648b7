use super::{ExponentialSmoothing, Smoother};
use crate::landmarks::LandmarkSet;

/// Low-pass filter over every landmark of a face.
///
/// Owns its state: the detector's set is copied on first use and updated in
/// place afterwards, never aliased.
#[derive(Debug, Clone)]
pub struct LandmarkSmoother {
    smoothing: ExponentialSmoothing,
    state: Option<LandmarkSet>,
}

impl LandmarkSmoother {
    /// Create a landmark smoother
    ///
    /// # Panics
    ///
    /// Panics if factor is not in the range [0, 1)
    #[must_use]
    pub fn new(factor: f64) -> Self {
        Self {
            smoothing: ExponentialSmoothing::new(factor),
            state: None,
        }
    }

    /// Current smoothed landmarks, absent until the first detection
    #[must_use]
    pub fn state(&self) -> Option<&LandmarkSet> {
        self.state.as_ref()
    }

    #[must_use]
    pub const fn factor(&self) -> f64 {
        self.smoothing.factor()
    }
}

impl Smoother for LandmarkSmoother {
    type Value = LandmarkSet;

    fn apply(&mut self, raw: &LandmarkSet) -> &LandmarkSet {
        let smoothing = self.smoothing;
        match &mut self.state {
            Some(state) => {
                // Both sets hold exactly the full topology
                for (smoothed, point) in state.points_mut().iter_mut().zip(raw.points()) {
                    smoothed.x = smoothing.step(smoothed.x, point.x);
                    smoothed.y = smoothing.step(smoothed.y, point.y);
                }
            }
            None => self.state = Some(raw.clone()),
        }
        self.state.get_or_insert_with(|| raw.clone())
    }

    fn reset(&mut self) {
        self.state = None;
    }

    fn is_primed(&self) -> bool {
        self.state.is_some()
    }

    fn name(&self) -> &str {
        "LandmarkSmoother"
    }
}
