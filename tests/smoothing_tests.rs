//! Tests for temporal smoothing of landmarks and iris geometry


use iris_overlay::filters::{ExponentialSmoothing, IrisSmoother, LandmarkSmoother, Smoother};
use iris_overlay::geometry::{IrisGeometry, PixelPoint};
use iris_overlay::landmarks::LandmarkSet;
use proptest::prelude::*;
use test_helpers::{default_face, uniform_face};

#[test]
fn test_stationary_input_is_unchanged() {
    let mut smoother = LandmarkSmoother::new(0.6);
    let face = default_face();
    for _ in 0..10 {
        assert_eq!(smoother.apply(&face), &face);
    }
}

#[test]
fn test_converges_after_step_change() {
    let mut smoother = LandmarkSmoother::new(0.6);
    smoother.apply(&uniform_face(0.2, 0.2));

    let target = uniform_face(0.8, 0.5);
    let distance = |state: &LandmarkSet| {
        state
            .points()
            .iter()
            .zip(target.points())
            .map(|(p, t)| (p.x - t.x).hypot(p.y - t.y))
            .fold(0.0, f64::max)
    };

    let mut previous = distance(smoother.state().expect("primed"));
    for step in 0..20 {
        let current = distance(smoother.apply(&target));
        assert!(current <= previous, "step {step}: distance grew from {previous} to {current}");
        previous = current;
    }

    let state = smoother.state().expect("primed");
    for (p, t) in state.points().iter().zip(target.points()) {
        assert!((p.x - t.x).abs() < 1e-3);
        assert!((p.y - t.y).abs() < 1e-3);
    }
}

#[test]
fn test_zero_factor_tracks_raw() {
    let mut smoother = LandmarkSmoother::new(0.0);
    smoother.apply(&uniform_face(0.1, 0.1));
    let raw = uniform_face(0.9, 0.3);
    assert_eq!(smoother.apply(&raw), &raw);
}

#[test]
fn test_reset_reinitializes_verbatim() {
    let mut smoother = LandmarkSmoother::new(0.9);
    smoother.apply(&uniform_face(0.1, 0.1));
    smoother.apply(&uniform_face(0.2, 0.2));
    smoother.reset();

    let raw = default_face();
    assert_eq!(smoother.apply(&raw), &raw);
}

#[test]
fn test_iris_smoother_damps_radius_jitter() {
    let mut smoother = IrisSmoother::new(0.5);
    let center = PixelPoint::new(100.0, 100.0);
    smoother.apply(&IrisGeometry::new(center, 10.0));

    // Alternating radius noise is halved at every step
    let mut last = 10.0;
    for (i, radius) in [14.0, 6.0, 14.0, 6.0].into_iter().enumerate() {
        let smoothed = smoother.apply(&IrisGeometry::new(center, radius)).radius;
        assert!((smoothed - 10.0).abs() < 4.0, "step {i}: {smoothed}");
        assert!((smoothed - last).abs() < (radius - last).abs());
        last = smoothed;
    }
}

#[test]
#[should_panic(expected = "Smoothing factor must be in [0, 1)")]
fn test_landmark_smoother_rejects_factor_of_one() {
    let _ = LandmarkSmoother::new(1.0);
}

#[test]
#[should_panic(expected = "Smoothing factor must be in [0, 1)")]
fn test_iris_smoother_rejects_negative_factor() {
    let _ = IrisSmoother::new(-0.1);
}

proptest! {
    #[test]
    fn prop_step_stays_between_previous_and_raw(
        prev in -1000.0f64..1000.0,
        raw in -1000.0f64..1000.0,
        factor in 0.0f64..0.999,
    ) {
        let out = ExponentialSmoothing::new(factor).step(prev, raw);
        let (lo, hi) = if prev < raw { (prev, raw) } else { (raw, prev) };
        prop_assert!(out >= lo - 1e-9 && out <= hi + 1e-9);
    }

    #[test]
    fn prop_step_shrinks_distance(
        prev in -1000.0f64..1000.0,
        raw in -1000.0f64..1000.0,
        factor in 0.0f64..0.999,
    ) {
        let out = ExponentialSmoothing::new(factor).step(prev, raw);
        let expected = (raw - prev).abs() * factor;
        prop_assert!(((raw - out).abs() - expected).abs() < 1e-6);
    }
}
