//! Configuration management for the iris overlay

use crate::{
    color::{TintBlend, TintPalette},
    constants::{
        DEFAULT_DEBUG_STROKE_WIDTH, DEFAULT_FALLBACK_ALPHA, DEFAULT_FRAME_BUDGET_MS, DEFAULT_HIGHLIGHT_ALPHA,
        DEFAULT_HIGHLIGHT_OFFSET, DEFAULT_HIGHLIGHT_RADIUS, DEFAULT_IRIS_RADIUS_SCALE, DEFAULT_IRIS_SMOOTHING,
        DEFAULT_LANDMARK_SMOOTHING, DEFAULT_MIN_DETECTION_CONFIDENCE, DEFAULT_MIN_IRIS_RADIUS_FRACTION,
        DEFAULT_MIN_TRACKING_CONFIDENCE, DEFAULT_TEXTURE_CLIP_SCALE, DEFAULT_TEXTURE_SCALE, DEFAULT_TINT_OPACITY,
        FALLBACK_SURFACE_HEIGHT, FALLBACK_SURFACE_WIDTH,
    },
    geometry::{GeometryParams, SurfaceSize},
    render::RenderOptions,
    session::{DetectorOptions, OrchestratorSettings, StreamRequest},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tints offered by default; the first one is selected on startup
pub const DEFAULT_TINTS: &[&str] = &["42,168,255", "34,139,34", "139,90,43", "128,128,128", "148,0,211"];

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera configuration
    pub camera: CameraConfig,

    /// Landmark detector configuration
    pub detector: DetectorConfig,

    /// Smoothing configuration
    pub smoothing: SmoothingConfig,

    /// Iris geometry configuration
    pub geometry: GeometryConfig,

    /// Compositing configuration
    pub render: RenderConfig,

    /// Selectable tints
    pub tints: TintConfig,

    /// Display configuration
    pub display: DisplayConfig,
}

/// Camera parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera device index
    pub device_index: i32,

    /// Mirror frames horizontally
    pub mirror: bool,

    /// Surface width used when the stream reports no dimensions
    pub fallback_width: u32,

    /// Surface height used when the stream reports no dimensions
    pub fallback_height: u32,
}

/// Landmark detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Path to face detection ONNX model
    pub face_detector: PathBuf,

    /// Path to face-mesh ONNX model
    pub face_mesh: PathBuf,

    /// Maximum number of faces to report; must be 1
    pub max_faces: usize,

    /// Refined topology with iris points; must be on
    pub refine_landmarks: bool,

    /// Confidence needed to accept a new face (0.0-1.0)
    pub min_detection_confidence: f32,

    /// Confidence needed to keep tracking a face (0.0-1.0)
    pub min_tracking_confidence: f32,

    /// IOU threshold for non-maximum suppression (0.0-1.0)
    pub iou_threshold: f32,
}

/// Smoothing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Landmark smoothing factor in [0, 1)
    pub landmark_factor: f64,

    /// Enable second-stage iris smoothing
    pub iris_enabled: bool,

    /// Iris smoothing factor in [0, 1)
    pub iris_factor: f64,

    /// Drop smoothing state after this many frames without a face (0 = never)
    pub reset_after_missed_frames: u32,
}

/// Iris geometry parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Multiplier from landmark spread to visible iris radius
    pub radius_scale: f64,

    /// Radius floor as a fraction of surface width
    pub min_radius_fraction: f64,
}

/// Compositing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Iris texture image
    pub texture: Option<PathBuf>,

    /// Texture square side in iris radii
    pub texture_scale: f64,

    /// Texture clip circle radius in iris radii
    pub texture_clip_scale: f64,

    /// Catch-light offset in iris radii
    pub highlight_offset: f64,

    /// Catch-light radius in iris radii
    pub highlight_radius: f64,

    /// Catch-light opacity
    pub highlight_alpha: f64,

    /// Tint opacity over the painted iris
    pub tint_opacity: f64,

    /// Tint blend mode
    pub tint_blend: TintBlend,

    /// Fill the iris with the tint while no texture is available
    pub solid_fallback: bool,

    /// Opacity of the solid fill
    pub fallback_alpha: f64,

    /// Draw eyelid and iris contours
    pub debug_contours: bool,

    /// Draw eye landmark points
    pub debug_points: bool,

    /// Debug stroke width in pixels
    pub debug_stroke_width: f64,
}

/// Tint palette
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TintConfig {
    /// Color specifications (`#rrggbb`, `#rgb`, `r,g,b`, `rgb()`, `rgba()`)
    pub palette: Vec<String>,

    /// Index of the tint selected on startup
    pub selected: usize,
}

/// Display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Preview window title
    pub window_title: String,

    /// Per-frame processing budget before a warning is logged
    pub frame_budget_ms: u64,

    /// Show the searching indicator while no face is found
    pub show_searching_indicator: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            mirror: false,
            fallback_width: FALLBACK_SURFACE_WIDTH,
            fallback_height: FALLBACK_SURFACE_HEIGHT,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            face_detector: PathBuf::from("assets/face_detector.onnx"),
            face_mesh: PathBuf::from("assets/face_mesh.onnx"),
            max_faces: 1,
            refine_landmarks: true,
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
            min_tracking_confidence: DEFAULT_MIN_TRACKING_CONFIDENCE,
            iou_threshold: 0.4,
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            landmark_factor: DEFAULT_LANDMARK_SMOOTHING,
            iris_enabled: false,
            iris_factor: DEFAULT_IRIS_SMOOTHING,
            reset_after_missed_frames: 0,
        }
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            radius_scale: DEFAULT_IRIS_RADIUS_SCALE,
            min_radius_fraction: DEFAULT_MIN_IRIS_RADIUS_FRACTION,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            texture: None,
            texture_scale: DEFAULT_TEXTURE_SCALE,
            texture_clip_scale: DEFAULT_TEXTURE_CLIP_SCALE,
            highlight_offset: DEFAULT_HIGHLIGHT_OFFSET,
            highlight_radius: DEFAULT_HIGHLIGHT_RADIUS,
            highlight_alpha: DEFAULT_HIGHLIGHT_ALPHA,
            tint_opacity: DEFAULT_TINT_OPACITY,
            tint_blend: TintBlend::default(),
            solid_fallback: false,
            fallback_alpha: DEFAULT_FALLBACK_ALPHA,
            debug_contours: false,
            debug_points: false,
            debug_stroke_width: DEFAULT_DEBUG_STROKE_WIDTH,
        }
    }
}

impl Default for TintConfig {
    fn default() -> Self {
        Self {
            palette: DEFAULT_TINTS.iter().map(ToString::to_string).collect(),
            selected: 0,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            window_title: "Iris Overlay".to_string(),
            frame_budget_ms: DEFAULT_FRAME_BUDGET_MS,
            show_searching_indicator: true,
        }
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{name} must be between 0.0 and 1.0")))
    }
}

fn check_factor(name: &str, value: f64) -> Result<()> {
    if (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{name} must be in [0.0, 1.0)")))
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{name} must be greater than 0")))
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content).map_err(|e| Error::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate parameter ranges
    ///
    /// # Errors
    ///
    /// Returns a [`Error::ConfigError`] naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        // Detector
        if self.detector.max_faces != 1 {
            return Err(Error::ConfigError("Only a single face is supported (max_faces: 1)".to_string()));
        }
        if !self.detector.refine_landmarks {
            return Err(Error::ConfigError(
                "Landmark refinement must be enabled; iris points only exist in refined output".to_string(),
            ));
        }
        check_unit("Detection confidence", f64::from(self.detector.min_detection_confidence))?;
        check_unit("Tracking confidence", f64::from(self.detector.min_tracking_confidence))?;
        check_unit("IOU threshold", f64::from(self.detector.iou_threshold))?;

        // Smoothing
        check_factor("Landmark smoothing factor", self.smoothing.landmark_factor)?;
        check_factor("Iris smoothing factor", self.smoothing.iris_factor)?;

        // Geometry
        check_positive("Iris radius scale", self.geometry.radius_scale)?;
        check_unit("Minimum iris radius fraction", self.geometry.min_radius_fraction)?;

        // Rendering
        check_positive("Texture scale", self.render.texture_scale)?;
        check_positive("Texture clip scale", self.render.texture_clip_scale)?;
        check_positive("Highlight radius", self.render.highlight_radius)?;
        check_positive("Debug stroke width", self.render.debug_stroke_width)?;
        check_unit("Highlight offset", self.render.highlight_offset)?;
        check_unit("Highlight alpha", self.render.highlight_alpha)?;
        check_unit("Tint opacity", self.render.tint_opacity)?;
        check_unit("Fallback alpha", self.render.fallback_alpha)?;

        // Tints
        self.palette()?;

        // Camera and display
        if self.camera.fallback_width == 0 || self.camera.fallback_height == 0 {
            return Err(Error::ConfigError("Fallback surface size must be non-zero".to_string()));
        }
        if self.display.frame_budget_ms == 0 {
            return Err(Error::ConfigError("Frame budget must be greater than 0".to_string()));
        }

        Ok(())
    }

    /// Check that the model files exist
    ///
    /// # Errors
    ///
    /// Returns a [`Error::ConfigError`] for the first missing file.
    pub fn validate_assets(&self) -> Result<()> {
        if !self.detector.face_detector.exists() {
            return Err(Error::ConfigError(format!(
                "Face detector model not found: {}",
                self.detector.face_detector.display()
            )));
        }
        if !self.detector.face_mesh.exists() {
            return Err(Error::ConfigError(format!(
                "Face mesh model not found: {}",
                self.detector.face_mesh.display()
            )));
        }

        Ok(())
    }

    #[must_use]
    pub fn detector_options(&self) -> DetectorOptions {
        DetectorOptions {
            max_faces: self.detector.max_faces,
            refine_landmarks: self.detector.refine_landmarks,
            min_detection_confidence: self.detector.min_detection_confidence,
            min_tracking_confidence: self.detector.min_tracking_confidence,
        }
    }

    #[must_use]
    pub fn stream_request(&self) -> StreamRequest {
        StreamRequest {
            device_index: self.camera.device_index,
            mirror: self.camera.mirror,
            ..StreamRequest::default()
        }
    }

    #[must_use]
    pub fn geometry_params(&self) -> GeometryParams {
        GeometryParams {
            radius_scale: self.geometry.radius_scale,
            min_radius_fraction: self.geometry.min_radius_fraction,
        }
    }

    #[must_use]
    pub fn render_options(&self) -> RenderOptions {
        let render = &self.render;
        RenderOptions {
            texture_scale: render.texture_scale,
            texture_clip_scale: render.texture_clip_scale,
            highlight_offset: render.highlight_offset,
            highlight_radius: render.highlight_radius,
            highlight_alpha: render.highlight_alpha,
            tint_opacity: render.tint_opacity,
            tint_blend: render.tint_blend,
            solid_fallback: render.solid_fallback,
            fallback_alpha: render.fallback_alpha,
            debug_contours: render.debug_contours,
            debug_points: render.debug_points,
            debug_stroke_width: render.debug_stroke_width,
        }
    }

    /// Build the tint palette
    ///
    /// # Errors
    ///
    /// Returns an error if a tint does not parse or the selection is out of range.
    pub fn palette(&self) -> Result<TintPalette> {
        TintPalette::from_specs(&self.tints.palette, self.tints.selected)
    }

    /// Validate and build orchestrator settings
    ///
    /// # Errors
    ///
    /// Returns the first validation error.
    pub fn orchestrator_settings(&self) -> Result<OrchestratorSettings> {
        self.validate()?;
        Ok(OrchestratorSettings {
            stream: self.stream_request(),
            detector: self.detector_options(),
            landmark_smoothing: self.smoothing.landmark_factor,
            iris_smoothing: self.smoothing.iris_enabled.then_some(self.smoothing.iris_factor),
            reset_after_missed_frames: self.smoothing.reset_after_missed_frames,
            geometry: self.geometry_params(),
            render: self.render_options(),
            palette: self.palette()?,
            fallback_size: SurfaceSize::new(self.camera.fallback_width, self.camera.fallback_height),
            frame_budget: Duration::from_millis(self.display.frame_budget_ms),
        })
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Iris Overlay Configuration

# Camera
camera:
  device_index: 0
  mirror: false
  fallback_width: 640
  fallback_height: 480

# Landmark detector
detector:
  face_detector: "assets/face_detector.onnx"
  face_mesh: "assets/face_mesh.onnx"
  max_faces: 1
  refine_landmarks: true
  min_detection_confidence: 0.6
  min_tracking_confidence: 0.6
  iou_threshold: 0.4

# Temporal smoothing (factors in [0, 1), higher = steadier but laggier)
smoothing:
  landmark_factor: 0.6
  iris_enabled: false
  iris_factor: 0.5
  reset_after_missed_frames: 0

# Iris geometry
geometry:
  radius_scale: 1.15
  min_radius_fraction: 0.015

# Compositing
render:
  texture: null
  texture_scale: 2.5
  texture_clip_scale: 2.0
  highlight_offset: 0.2
  highlight_radius: 0.05
  highlight_alpha: 0.7
  tint_opacity: 0.5
  tint_blend: source_atop
  solid_fallback: false
  fallback_alpha: 0.85
  debug_contours: false
  debug_points: false
  debug_stroke_width: 1.5

# Selectable tints
tints:
  palette:
    - "42,168,255"
    - "34,139,34"
    - "139,90,43"
    - "128,128,128"
    - "148,0,211"
  selected: 0

# Display settings
display:
  window_title: "Iris Overlay"
  frame_budget_ms: 16
  show_searching_indicator: true
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_example_matches_default() {
        let parsed: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = serde_yaml::from_str("smoothing:\n  landmark_factor: 0.3\n").unwrap();
        assert!((parsed.smoothing.landmark_factor - 0.3).abs() < f64::EPSILON);
        assert_eq!(parsed.smoothing.reset_after_missed_frames, 0);
        assert_eq!(parsed.detector, DetectorConfig::default());
    }

    #[test]
    fn test_rejects_invalid() {
        let mut config = Config::default();
        config.smoothing.landmark_factor = 1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.detector.max_faces = 2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.detector.refine_landmarks = false;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tints.selected = 99;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tints.palette.push("teal".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_orchestrator_settings() {
        let mut config = Config::default();
        config.smoothing.iris_enabled = true;
        let settings = config.orchestrator_settings().unwrap();
        assert_eq!(settings.iris_smoothing, Some(DEFAULT_IRIS_SMOOTHING));
        assert_eq!(settings.fallback_size, SurfaceSize::new(640, 480));
        assert_eq!(settings.frame_budget, Duration::from_millis(16));
        assert_eq!(settings.render, RenderOptions::default());
    }
}
