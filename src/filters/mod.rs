//! Temporal smoothing for landmark coordinates and iris geometry.
//!
//! Both stages use the same exponential update: with a smoothing factor
//! `α ∈ [0, 1)`, each value moves `(1 − α)` of the way towards the new raw
//! value every frame. A higher factor means more inertia and less jitter.
//! The factor is per frame, not per second, so it assumes a steady frame rate.

/// Shared exponential update
pub mod exponential;

/// Point-level smoothing of the whole landmark set
pub mod landmark;

/// Second-stage smoothing of iris center and radius
pub mod iris;

pub use exponential::ExponentialSmoothing;
pub use iris::IrisSmoother;
pub use landmark::LandmarkSmoother;

/// Common interface of the smoothing stages
pub trait Smoother {
    /// Value being smoothed
    type Value;

    /// Feed a raw value and return the smoothed one.
    ///
    /// The first value after construction or [`Smoother::reset`] is returned
    /// unchanged.
    fn apply(&mut self, raw: &Self::Value) -> &Self::Value;

    /// Forget all state so the next value initializes verbatim
    fn reset(&mut self);

    /// Whether a value has been seen since the last reset
    fn is_primed(&self) -> bool;

    /// Get smoother name
    fn name(&self) -> &str;
}
