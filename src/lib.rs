//! Real-time iris recoloring overlay driven by face-mesh landmarks.
//!
//! The library turns a stream of face landmark sets into a transparent
//! overlay that recolors the irises of a live camera feed:
//! 1. Landmark smoothing to remove detector jitter
//! 2. Eye geometry extraction (iris circle and eyelid polygon in pixels)
//! 3. Eyelid-clipped compositing of texture, catch-light and tint
//! 4. Session orchestration: camera and detector lifecycle, one frame at a time
//!
//! The core is pure Rust, drawing with tiny-skia over [`image`] buffers. The
//! OpenCV camera, the ONNX face-mesh detector and the interactive window live
//! behind the `camera`, `face-mesh` and `app` features.
//!
//! # Examples
//!
//! ## Compositing one frame
//!
//! ```no_run
//! use iris_overlay::{
//!     canvas::Canvas,
//!     color::Tint,
//!     geometry::{extract_geometry, GeometryParams, SurfaceSize},
//!     landmarks::{EyeSide, LandmarkSet},
//!     render::OverlayRenderer,
//!     texture::IrisTexture,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let raw: Vec<(f32, f32)> = vec![(0.5, 0.5); 478];
//! let landmarks = LandmarkSet::from_normalized(&raw)?;
//! let surface = SurfaceSize::new(640, 480);
//!
//! let eyes = EyeSide::BOTH
//!     .iter()
//!     .map(|side| extract_geometry(&landmarks, side.region(), surface, &GeometryParams::default()))
//!     .collect::<Result<Vec<_>, _>>()?;
//!
//! let mut texture = IrisTexture::load_async("assets/iris.png");
//! let mut canvas = Canvas::new(surface);
//! OverlayRenderer::default().render_frame(&mut canvas, &eyes, Tint::parse("#2aa8ff")?, texture.wait());
//! # Ok(())
//! # }
//! ```
//!
//! ## Smoothing
//!
//! ```
//! use iris_overlay::filters::{LandmarkSmoother, Smoother};
//! use iris_overlay::landmarks::LandmarkSet;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut smoother = LandmarkSmoother::new(0.6);
//! let first = LandmarkSet::from_normalized(&vec![(0.5, 0.5); 478])?;
//! let second = LandmarkSet::from_normalized(&vec![(0.6, 0.5); 478])?;
//!
//! smoother.apply(&first);
//! let smoothed = smoother.apply(&second);
//! assert!((smoothed.points()[0].x - 0.54).abs() < 1e-6);
//! # Ok(())
//! # }
//! ```

/// Face-mesh landmarks and the static eye regions
pub mod landmarks;

/// Temporal smoothing of landmarks and iris geometry
pub mod filters;

/// Iris circle and eyelid polygon extraction
pub mod geometry;

/// Paths and clip masks for shapes
pub mod raster;

/// RGBA output surface
pub mod canvas;

/// Tint parsing, blend modes and palette
pub mod color;

/// Asynchronously loaded iris texture
pub mod texture;

/// Eyelid-clipped iris compositing
pub mod render;

/// Capture session lifecycle and frame orchestration
pub mod session;

/// Configuration management
pub mod config;

/// Application constants
pub mod constants;

/// Error types
pub mod error;

/// Utility functions
pub mod utils;

/// OpenCV camera capture
#[cfg(feature = "camera")]
pub mod capture;

/// Face box detection for the landmark crop
#[cfg(feature = "face-mesh")]
pub mod face_detection;

/// Face-mesh landmark detection
#[cfg(feature = "face-mesh")]
pub mod mesh_detection;

/// Interactive preview application
#[cfg(feature = "app")]
pub mod app;

pub use error::{Error, Result};
