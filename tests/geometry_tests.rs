//! Tests for eye geometry extraction from landmarks


use iris_overlay::geometry::{extract_geometry, to_pixels, GeometryParams, PixelPoint, SurfaceSize};
use iris_overlay::landmarks::{EyeRegion, EyeSide};
use iris_overlay::raster::point_in_polygon;
use test_helpers::{default_face, face_at, uniform_face};

#[test]
fn test_iris_circle_inside_eyelid() {
    let surface = SurfaceSize::new(640, 480);
    let face = face_at(surface, PixelPoint::new(100.0, 100.0), PixelPoint::new(300.0, 100.0), 10.0);

    let eye = extract_geometry(&face, &EyeRegion::LEFT, surface, &GeometryParams::default()).unwrap();
    assert_eq!(eye.side, EyeSide::Left);
    assert!((eye.iris.center.x - 100.0).abs() < 1e-6);
    assert!((eye.iris.center.y - 100.0).abs() < 1e-6);
    assert!((eye.iris.radius - 11.5).abs() < 1e-6);
    assert!(point_in_polygon(eye.iris.center, &eye.eyelid));
    assert_eq!(eye.iris_contour.len(), 4);
    assert_eq!(eye.eyelid.len(), 16);
}

#[test]
fn test_each_side_uses_its_own_iris() {
    let surface = SurfaceSize::new(640, 480);
    let face = default_face();
    let params = GeometryParams::default();

    let left = extract_geometry(&face, &EyeRegion::LEFT, surface, &params).unwrap();
    let right = extract_geometry(&face, &EyeRegion::RIGHT, surface, &params).unwrap();
    assert!((left.iris.center.x - 400.0).abs() < 1e-6);
    assert!((right.iris.center.x - 240.0).abs() < 1e-6);
    assert!(point_in_polygon(left.iris.center, &left.eyelid));
    assert!(!point_in_polygon(left.iris.center, &right.eyelid));
}

#[test]
fn test_extraction_is_deterministic() {
    let surface = SurfaceSize::new(640, 480);
    let face = default_face();
    let params = GeometryParams::default();

    let first = extract_geometry(&face, &EyeRegion::RIGHT, surface, &params).unwrap();
    let second = extract_geometry(&face, &EyeRegion::RIGHT, surface, &params).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_mapping_follows_surface_size() {
    let face = default_face();
    let params = GeometryParams::default();

    let small = extract_geometry(&face, &EyeRegion::LEFT, SurfaceSize::new(640, 480), &params).unwrap();
    let large = extract_geometry(&face, &EyeRegion::LEFT, SurfaceSize::new(1280, 960), &params).unwrap();
    assert!((large.iris.center.x - 2.0 * small.iris.center.x).abs() < 1e-6);
    assert!((large.iris.center.y - 2.0 * small.iris.center.y).abs() < 1e-6);
    assert!((large.iris.radius - 2.0 * small.iris.radius).abs() < 1e-6);
}

#[test]
fn test_collapsed_iris_uses_radius_floor() {
    let surface = SurfaceSize::new(640, 480);
    let face = uniform_face(0.5, 0.5);
    let params = GeometryParams::default();

    let eye = extract_geometry(&face, &EyeRegion::LEFT, surface, &params).unwrap();
    assert!((eye.iris.radius - params.min_radius(surface)).abs() < 1e-9);
    assert!((eye.iris.radius - 9.6).abs() < 1e-9);
}

#[test]
fn test_radius_scale_applies() {
    let surface = SurfaceSize::new(640, 480);
    let face = default_face();
    let params = GeometryParams {
        radius_scale: 2.0,
        ..GeometryParams::default()
    };

    let eye = extract_geometry(&face, &EyeRegion::LEFT, surface, &params).unwrap();
    assert!((eye.iris.radius - 20.0).abs() < 1e-6);
}

#[test]
fn test_errors() {
    let face = default_face();
    let params = GeometryParams::default();

    assert!(extract_geometry(&face, &EyeRegion::LEFT, SurfaceSize::new(640, 0), &params).is_err());
    assert!(to_pixels(&face, &[478], SurfaceSize::new(640, 480)).is_err());

    let no_iris = EyeRegion {
        iris: &[],
        ..EyeRegion::LEFT
    };
    assert!(extract_geometry(&face, &no_iris, SurfaceSize::new(640, 480), &params).is_err());
}
