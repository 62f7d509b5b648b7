//! Interactive preview application for the iris overlay.

use crate::{
    capture::OpenCvStreamProvider,
    config::Config,
    geometry::SurfaceSize,
    mesh_detection::MeshDetector,
    session::{DetectorOptions, FrameOrchestrator, FrameOutcome, LandmarkDetector, StartOutcome},
    texture::IrisTexture,
    utils::{image_conversion::rgb_to_mat, safe_cast::u32_to_i32},
    Result,
};
use log::{info, warn};
use opencv::{
    core::{Mat, Point, Scalar, CV_8UC3},
    highgui::{self, WINDOW_NORMAL},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
};
use std::time::{Duration, Instant};

/// Key codes handled by the preview window
const KEY_ESCAPE: i32 = 27;

/// Main application struct
pub struct OverlayApp {
    orchestrator: FrameOrchestrator,
    window_title: String,
    show_searching_indicator: bool,
    idle_size: SurfaceSize,
    fps: f64,
}

impl OverlayApp {
    /// Build the camera, detector factory and orchestrator from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the window cannot
    /// be created.
    pub fn new(config: &Config) -> Result<Self> {
        info!("Initializing Iris Overlay application");
        let settings = config.orchestrator_settings()?;
        let idle_size = settings.fallback_size;

        let face_detector = config.detector.face_detector.clone();
        let face_mesh = config.detector.face_mesh.clone();
        let iou_threshold = config.detector.iou_threshold;
        let factory = move |options: &DetectorOptions| -> Result<Box<dyn LandmarkDetector>> {
            Ok(Box::new(MeshDetector::new(&face_detector, &face_mesh, options, iou_threshold)?))
        };

        let mut orchestrator = FrameOrchestrator::new(Box::new(OpenCvStreamProvider::new()), Box::new(factory), settings);
        if let Some(path) = &config.render.texture {
            orchestrator.set_texture(IrisTexture::load_async(path));
        }

        highgui::named_window(&config.display.window_title, WINDOW_NORMAL)?;

        Ok(Self {
            orchestrator,
            window_title: config.display.window_title.clone(),
            show_searching_indicator: config.display.show_searching_indicator,
            idle_size,
            fps: 0.0,
        })
    }

    #[must_use]
    pub const fn orchestrator(&self) -> &FrameOrchestrator {
        &self.orchestrator
    }

    /// Start or stop the capture session
    pub fn toggle(&mut self) -> Result<()> {
        if self.orchestrator.is_running() {
            self.orchestrator.stop();
            return Ok(());
        }
        match self.orchestrator.start()? {
            StartOutcome::Started => info!("Camera started"),
            StartOutcome::AlreadyActive => {}
            StartOutcome::Cancelled => info!("Camera start cancelled"),
        }
        Ok(())
    }

    /// Run the main application loop until the user quits
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be updated.
    pub fn run(&mut self) -> Result<()> {
        info!("Entering main loop (space: start/stop, 1-9: tint, d: debug contours, q: quit)");

        let mut frame_count = 0u32;
        let mut last_fps_update = Instant::now();

        loop {
            let outcome = match self.orchestrator.tick() {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Frame processing failed, stopping camera: {e}");
                    self.orchestrator.stop();
                    FrameOutcome::Stopped
                }
            };

            if matches!(outcome, FrameOutcome::Rendered(_) | FrameOutcome::NoFace) {
                frame_count += 1;
            }
            if last_fps_update.elapsed() >= Duration::from_secs(1) {
                self.fps = f64::from(frame_count) / last_fps_update.elapsed().as_secs_f64();
                frame_count = 0;
                last_fps_update = Instant::now();
            }

            self.display(&outcome)?;

            let delay = if self.orchestrator.is_running() { 1 } else { 30 };
            if !self.handle_key(highgui::wait_key(delay)?)? {
                break;
            }
        }

        self.orchestrator.stop();
        info!("Application shutting down");
        Ok(())
    }

    /// Returns `false` when the user asked to quit
    fn handle_key(&mut self, key: i32) -> Result<bool> {
        match key {
            KEY_ESCAPE => return Ok(false),
            k if k == i32::from(b'q') => return Ok(false),
            k if k == i32::from(b' ') => self.toggle()?,
            k if k == i32::from(b'd') => {
                let options = self.orchestrator.render_options_mut();
                options.debug_contours = !options.debug_contours;
                info!("Debug contours {}", if options.debug_contours { "on" } else { "off" });
            }
            k if (i32::from(b'1')..=i32::from(b'9')).contains(&k) => {
                let index = usize::try_from(k - i32::from(b'1')).unwrap_or_default();
                match self.orchestrator.select_tint(index) {
                    Some(tint) => info!("Tint {} selected: {tint}", index + 1),
                    None => warn!("No tint in slot {}", index + 1),
                }
            }
            _ => {}
        }
        Ok(true)
    }

    fn display(&self, outcome: &FrameOutcome) -> Result<()> {
        let mut display_frame = match self.orchestrator.preview() {
            Some(preview) => rgb_to_mat(&preview)?,
            None => Mat::zeros(
                u32_to_i32(self.idle_size.height)?,
                u32_to_i32(self.idle_size.width)?,
                CV_8UC3,
            )?
            .to_mat()?,
        };

        let status = if !self.orchestrator.is_running() {
            Some("Press space to start the camera")
        } else if *outcome == FrameOutcome::NoFace && self.show_searching_indicator {
            Some("Searching for face")
        } else {
            None
        };
        if let Some(text) = status {
            put_label(&mut display_frame, text, Point::new(10, 60), Scalar::new(0.0, 200.0, 255.0, 0.0))?;
        }

        let fps_text = format!("FPS: {:.1}", self.fps);
        put_label(&mut display_frame, &fps_text, Point::new(10, 30), Scalar::new(0.0, 255.0, 0.0, 0.0))?;

        highgui::imshow(&self.window_title, &display_frame)?;
        Ok(())
    }
}

fn put_label(frame: &mut Mat, text: &str, origin: Point, color: Scalar) -> Result<()> {
    imgproc::put_text(frame, text, origin, FONT_HERSHEY_SIMPLEX, 0.8, color, 2, LINE_8, false)?;
    Ok(())
}
