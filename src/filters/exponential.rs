/// Exponential smoothing step with a fixed inertia factor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialSmoothing {
    factor: f64,
}

impl ExponentialSmoothing {
    /// Create a smoothing step
    ///
    /// # Panics
    ///
    /// Panics if factor is not in the range [0, 1)
    #[must_use]
    pub fn new(factor: f64) -> Self {
        assert!((0.0..1.0).contains(&factor), "Smoothing factor must be in [0, 1)");
        Self { factor }
    }

    #[must_use]
    pub const fn factor(&self) -> f64 {
        self.factor
    }

    /// `prev + (raw − prev) · (1 − α)`
    #[must_use]
    pub fn step(&self, prev: f64, raw: f64) -> f64 {
        (raw - prev).mul_add(1.0 - self.factor, prev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step() {
        let smoothing = ExponentialSmoothing::new(0.6);
        // 10 + (20 - 10) * 0.4
        assert!((smoothing.step(10.0, 20.0) - 14.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_factor_passes_through() {
        let smoothing = ExponentialSmoothing::new(0.0);
        assert_eq!(smoothing.step(3.0, 7.5), 7.5);
    }

    #[test]
    fn test_fixed_point() {
        let smoothing = ExponentialSmoothing::new(0.9);
        assert_eq!(smoothing.step(0.42, 0.42), 0.42);
    }

    #[test]
    #[should_panic(expected = "Smoothing factor must be in [0, 1)")]
    fn test_factor_of_one_rejected() {
        let _ = ExponentialSmoothing::new(1.0);
    }
}
