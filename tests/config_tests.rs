//! Tests for configuration loading and validation

use iris_overlay::{
    color::{Tint, TintBlend},
    config::{Config, EXAMPLE_CONFIG},
    geometry::SurfaceSize,
    Error,
};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("overlay.yaml");

    let mut config = Config::default();
    config.camera.device_index = 2;
    config.camera.mirror = true;
    config.smoothing.landmark_factor = 0.3;
    config.smoothing.reset_after_missed_frames = 15;
    config.render.texture = Some(PathBuf::from("assets/iris.png"));
    config.render.tint_blend = TintBlend::Color;
    config.tints.palette.push("#ff00ff".to_string());
    config.tints.selected = 5;

    config.to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded, config);
    loaded.validate().unwrap();
}

#[test]
fn test_example_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("example.yaml");
    fs::write(&path, EXAMPLE_CONFIG).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded, Config::default());
}

#[test]
fn test_missing_file() {
    let result = Config::from_file("/nonexistent/overlay.yaml");
    assert!(result.is_err());
}

#[test]
fn test_malformed_yaml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    fs::write(&path, "smoothing: [1, 2").unwrap();
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_validation_bounds() {
    let cases: Vec<Box<dyn Fn(&mut Config)>> = vec![
        Box::new(|c| c.smoothing.landmark_factor = -0.1),
        Box::new(|c| c.smoothing.iris_factor = 1.0),
        Box::new(|c| c.geometry.radius_scale = 0.0),
        Box::new(|c| c.render.tint_opacity = 1.5),
        Box::new(|c| c.render.highlight_alpha = -1.0),
        Box::new(|c| c.camera.fallback_width = 0),
        Box::new(|c| c.display.frame_budget_ms = 0),
        Box::new(|c| c.tints.palette.clear()),
    ];

    for (i, mutate) in cases.iter().enumerate() {
        let mut config = Config::default();
        mutate(&mut config);
        assert!(config.validate().is_err(), "case {i} should be rejected");
    }
}

#[test]
fn test_missing_assets_reported() {
    let mut config = Config::default();
    config.detector.face_mesh = PathBuf::from("/nonexistent/face_mesh.onnx");
    assert!(config.validate_assets().is_err());
}

#[test]
fn test_derived_settings() {
    let mut config = Config::default();
    config.camera.device_index = 1;
    config.camera.mirror = true;
    config.camera.fallback_width = 1280;
    config.camera.fallback_height = 720;
    config.tints.palette = vec!["#102030".to_string(), "rgb(1, 2, 3)".to_string()];
    config.tints.selected = 1;

    let request = config.stream_request();
    assert_eq!(request.device_index, 1);
    assert!(request.mirror);
    assert!(!request.audio);
    assert!(request.user_facing);

    let options = config.detector_options();
    assert_eq!(options.max_faces, 1);
    assert!(options.refine_landmarks);

    let settings = config.orchestrator_settings().unwrap();
    assert_eq!(settings.fallback_size, SurfaceSize::new(1280, 720));
    assert_eq!(settings.iris_smoothing, None);
    assert_eq!(settings.palette.current(), Tint::new(1, 2, 3));
}

#[test]
fn test_invalid_tint_in_palette() {
    let mut config = Config::default();
    config.tints.palette = vec!["not a color".to_string()];
    assert!(matches!(config.palette(), Err(Error::InvalidTint(_))));
}
