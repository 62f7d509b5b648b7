use super::{ExponentialSmoothing, Smoother};
use crate::geometry::{IrisGeometry, PixelPoint};

/// Second-stage filter over one eye's iris circle.
///
/// Suppresses radius jitter that survives point-level smoothing because the
/// radius is derived from only four landmarks.
#[derive(Debug, Clone)]
pub struct IrisSmoother {
    smoothing: ExponentialSmoothing,
    state: Option<IrisGeometry>,
}

impl IrisSmoother {
    /// Create an iris smoother
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
}

impl Smoother for IrisSmoother {
    type Value = IrisGeometry;

    fn apply(&mut self, raw: &IrisGeometry) -> &IrisGeometry {
        let smoothing = self.smoothing;
        match &mut self.state {
            Some(state) => {
                state.center = PixelPoint::new(
                    smoothing.step(state.center.x, raw.center.x),
                    smoothing.step(state.center.y, raw.center.y),
                );
                state.radius = smoothing.step(state.radius, raw.radius);
            }
            None => self.state = Some(*raw),
        }
        self.state.get_or_insert(*raw)
    }

    fn reset(&mut self) {
        self.state = None;
    }

    fn is_primed(&self) -> bool {
        self.state.is_some()
    }

    fn name(&self) -> &str {
        "IrisSmoother"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iris_smoothing() {
        let mut smoother = IrisSmoother::new(0.5);

        let first = IrisGeometry::new(PixelPoint::new(100.0, 100.0), 10.0);
        assert_eq!(*smoother.apply(&first), first);

        let second = IrisGeometry::new(PixelPoint::new(110.0, 90.0), 14.0);
        let smoothed = *smoother.apply(&second);
        assert!((smoothed.center.x - 105.0).abs() < 1e-12);
        assert!((smoothed.center.y - 95.0).abs() < 1e-12);
        assert!((smoothed.radius - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_reset() {
        let mut smoother = IrisSmoother::new(0.5);
        smoother.apply(&IrisGeometry::new(PixelPoint::new(0.0, 0.0), 5.0));
        smoother.reset();
        assert!(!smoother.is_primed());

        let next = IrisGeometry::new(PixelPoint::new(50.0, 50.0), 8.0);
        assert_eq!(*smoother.apply(&next), next);
    }
}
