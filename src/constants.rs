//! Constants used throughout the application

/// Number of landmarks produced by the refined face-mesh topology (468 mesh + 10 iris)
pub const NUM_FACE_MESH_LANDMARKS: usize = 478;

/// Number of landmarks produced without iris refinement
pub const NUM_UNREFINED_LANDMARKS: usize = 468;

/// Default landmark smoothing factor (inertia)
pub const DEFAULT_LANDMARK_SMOOTHING: f64 = 0.6;

/// Default second-stage iris smoothing factor
pub const DEFAULT_IRIS_SMOOTHING: f64 = 0.5;

/// Iris radius multiplier over the raw landmark spread
pub const DEFAULT_IRIS_RADIUS_SCALE: f64 = 1.15;

/// Minimum iris radius as a fraction of surface width
pub const DEFAULT_MIN_IRIS_RADIUS_FRACTION: f64 = 0.015;

/// Texture square side in iris radii
pub const DEFAULT_TEXTURE_SCALE: f64 = 2.5;

/// Texture clip circle radius in iris radii
pub const DEFAULT_TEXTURE_CLIP_SCALE: f64 = 2.0;

/// Catch-light offset (up and left) in iris radii
pub const DEFAULT_HIGHLIGHT_OFFSET: f64 = 0.2;

/// Catch-light radius in iris radii
pub const DEFAULT_HIGHLIGHT_RADIUS: f64 = 0.05;

/// Catch-light opacity
pub const DEFAULT_HIGHLIGHT_ALPHA: f64 = 0.7;

/// Tint overlay opacity
pub const DEFAULT_TINT_OPACITY: f64 = 0.5;

/// Opacity of the untextured iris fill
pub const DEFAULT_FALLBACK_ALPHA: f64 = 0.85;

/// Debug contour stroke width in pixels
pub const DEFAULT_DEBUG_STROKE_WIDTH: f64 = 1.5;

/// Debug landmark dot radius in pixels
pub const DEBUG_POINT_RADIUS: f64 = 2.0;

/// Eyelid contour debug color
pub const EYELID_DEBUG_COLOR: [u8; 3] = [0x00, 0xff, 0x88];

/// Iris contour debug color
pub const IRIS_DEBUG_COLOR: [u8; 3] = [0xff, 0x00, 0x44];

/// Surface size used when the video source reports no dimensions
pub const FALLBACK_SURFACE_WIDTH: u32 = 640;
pub const FALLBACK_SURFACE_HEIGHT: u32 = 480;

/// Per-frame pipeline budget at 60 fps
pub const DEFAULT_FRAME_BUDGET_MS: u64 = 16;

/// Default detector thresholds
pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f32 = 0.6;
pub const DEFAULT_MIN_TRACKING_CONFIDENCE: f32 = 0.6;

/// Face-mesh model input resolution
pub const FACE_MESH_INPUT_SIZE: u32 = 192;

/// Face box expansion used to build the face-mesh crop
pub const FACE_MESH_ROI_SCALE: f32 = 1.5;

/// Image normalization constants for face detection
pub const IMAGE_NORMALIZATION_OFFSET: f32 = 127.5;
pub const IMAGE_NORMALIZATION_SCALE: f32 = 128.0;
