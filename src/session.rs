//! Capture session lifecycle and per-frame orchestration.
//!
//! The orchestrator owns everything that lives for one capture session (camera
//! stream, detector, smoothing state) in a single [`CaptureSession`] value, so
//! stopping is dropping that value and a restart always begins from scratch.

use crate::{
    canvas::{compose_preview, Canvas},
    color::{Tint, TintPalette},
    constants::{
        DEFAULT_FRAME_BUDGET_MS, DEFAULT_LANDMARK_SMOOTHING, DEFAULT_MIN_DETECTION_CONFIDENCE,
        DEFAULT_MIN_TRACKING_CONFIDENCE, FALLBACK_SURFACE_HEIGHT, FALLBACK_SURFACE_WIDTH,
    },
    filters::{IrisSmoother, LandmarkSmoother, Smoother},
    geometry::{extract_geometry, EyeGeometry, GeometryParams, SurfaceSize},
    landmarks::{EyeSide, LandmarkSet},
    render::{EyePaint, OverlayRenderer, RenderOptions},
    texture::IrisTexture,
    Result,
};
use image::RgbImage;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No camera or detector active
    Idle,
    /// Stream acquisition in flight
    Starting,
    /// Per-frame pipeline active
    Running,
    /// Teardown in flight
    Stopping,
}

/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A session was already starting or running; nothing changed
    AlreadyActive,
    /// A stop was requested while the stream was being acquired
    Cancelled,
}

/// Summary of one composited frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Surface the overlay was composited onto
    pub surface: SurfaceSize,
    /// Faces reported by the detector; only the first is used
    pub faces: usize,
    /// Smoothed geometry per eye, left first
    pub eyes: Vec<EyeGeometry>,
    /// What was painted per eye, in the order of `eyes`
    pub painted: Vec<EyePaint>,
    /// Time spent in smoothing, geometry and compositing
    pub elapsed: Duration,
}

impl FrameReport {
    /// Whether any eye received the textured overlay
    #[must_use]
    pub fn textured(&self) -> bool {
        self.painted.contains(&EyePaint::Textured)
    }

    #[must_use]
    pub fn eye(&self, side: EyeSide) -> Option<&EyeGeometry> {
        self.eyes.iter().find(|eye| eye.side == side)
    }
}

/// What happened during one tick
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// No session is running
    Inactive,
    /// The camera had no frame ready
    NoFrame,
    /// The frame contained no face; the overlay was cleared
    NoFace,
    Rendered(FrameReport),
    /// A pending stop request was honoured
    Stopped,
}

/// Options handed to the landmark detector on creation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorOptions {
    /// Faces to report; the pipeline only supports one
    pub max_faces: usize,
    /// Refined topology with iris points
    pub refine_landmarks: bool,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            max_faces: 1,
            refine_landmarks: true,
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
            min_tracking_confidence: DEFAULT_MIN_TRACKING_CONFIDENCE,
        }
    }
}

/// Camera stream request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub device_index: i32,
    /// Never requested by this pipeline
    pub audio: bool,
    pub user_facing: bool,
    /// Mirror frames horizontally
    pub mirror: bool,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            device_index: 0,
            audio: false,
            user_facing: true,
            mirror: false,
        }
    }
}

/// An acquired video stream
pub trait CameraStream {
    /// Next frame, or `None` if none is ready yet
    ///
    /// # Errors
    ///
    /// Returns an error if the device fails while reading.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Release the device
    fn stop(&mut self);
}

/// Acquires camera streams
pub trait StreamProvider {
    /// Open a stream for the request
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StreamAcquisition`] when permission is denied or
    /// no device is available.
    fn acquire(&mut self, request: &StreamRequest) -> Result<Box<dyn CameraStream>>;
}

/// Face landmark detector
pub trait LandmarkDetector {
    /// Detect faces in a frame; zero or more landmark sets
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<LandmarkSet>>;

    /// Release the detector
    ///
    /// # Errors
    ///
    /// Returns an error if releasing fails; callers tearing down ignore it.
    fn close(&mut self) -> Result<()>;
}

/// Creates a fresh detector for every session
pub trait DetectorFactory {
    /// Build a detector with the given options
    ///
    /// # Errors
    ///
    /// Returns an error if the detector cannot be initialized.
    fn create(&mut self, options: &DetectorOptions) -> Result<Box<dyn LandmarkDetector>>;
}

impl<F> DetectorFactory for F
where
    F: FnMut(&DetectorOptions) -> Result<Box<dyn LandmarkDetector>>,
{
    fn create(&mut self, options: &DetectorOptions) -> Result<Box<dyn LandmarkDetector>> {
        self(options)
    }
}

/// Cloneable stop request flag, usable from other threads or callbacks
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the orchestrator to stop at the next opportunity
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Tunables of the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub stream: StreamRequest,
    pub detector: DetectorOptions,
    /// Landmark smoothing factor in `[0, 1)`
    pub landmark_smoothing: f64,
    /// Iris smoothing factor in `[0, 1)`; `None` disables the second stage
    pub iris_smoothing: Option<f64>,
    /// Consecutive no-face frames before smoothing state is dropped; 0 = never
    pub reset_after_missed_frames: u32,
    pub geometry: GeometryParams,
    pub render: RenderOptions,
    pub palette: TintPalette,
    /// Surface used when a frame reports zero dimensions
    pub fallback_size: SurfaceSize,
    pub frame_budget: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            stream: StreamRequest::default(),
            detector: DetectorOptions::default(),
            landmark_smoothing: DEFAULT_LANDMARK_SMOOTHING,
            iris_smoothing: None,
            reset_after_missed_frames: 0,
            geometry: GeometryParams::default(),
            render: RenderOptions::default(),
            palette: TintPalette::default(),
            fallback_size: SurfaceSize::new(FALLBACK_SURFACE_WIDTH, FALLBACK_SURFACE_HEIGHT),
            frame_budget: Duration::from_millis(DEFAULT_FRAME_BUDGET_MS),
        }
    }
}

/// Everything owned by one running capture session
pub struct CaptureSession {
    stream: Box<dyn CameraStream>,
    detector: Box<dyn LandmarkDetector>,
    landmarks: LandmarkSmoother,
    iris: Option<[IrisSmoother; 2]>,
    missed_frames: u32,
}

impl CaptureSession {
    /// Bundle an acquired stream and detector with fresh smoothing state
    ///
    /// # Panics
    ///
    /// Panics if a smoothing factor is not in the range [0, 1)
    #[must_use]
    pub fn new(
        stream: Box<dyn CameraStream>,
        detector: Box<dyn LandmarkDetector>,
        landmark_smoothing: f64,
        iris_smoothing: Option<f64>,
    ) -> Self {
        Self {
            stream,
            detector,
            landmarks: LandmarkSmoother::new(landmark_smoothing),
            iris: iris_smoothing.map(|f| [IrisSmoother::new(f), IrisSmoother::new(f)]),
            missed_frames: 0,
        }
    }

    #[must_use]
    pub fn smoothed_landmarks(&self) -> Option<&LandmarkSet> {
        self.landmarks.state()
    }

    #[must_use]
    pub const fn missed_frames(&self) -> u32 {
        self.missed_frames
    }

    /// Smooth a detection and derive both eyes' geometry
    fn track(&mut self, raw: &LandmarkSet, surface: SurfaceSize, params: &GeometryParams) -> Result<Vec<EyeGeometry>> {
        self.missed_frames = 0;
        let smoothed = self.landmarks.apply(raw);

        let mut eyes = Vec::with_capacity(EyeSide::BOTH.len());
        for side in EyeSide::BOTH {
            let mut eye = extract_geometry(smoothed, side.region(), surface, params)?;
            if let Some(iris) = self.iris.as_mut() {
                eye.iris = *iris[side.index()].apply(&eye.iris);
            }
            eyes.push(eye);
        }
        Ok(eyes)
    }

    /// Count a no-face frame and apply the gap policy
    fn record_miss(&mut self, reset_after: u32) {
        self.missed_frames = self.missed_frames.saturating_add(1);
        if reset_after > 0 && self.missed_frames == reset_after {
            debug!("No face for {reset_after} frames, dropping smoothing state");
            self.reset_smoothing();
        }
    }

    fn reset_smoothing(&mut self) {
        self.landmarks.reset();
        self.reset_iris_smoothing();
    }

    /// Drop iris state, which is held in pixels of the previous surface
    fn reset_iris_smoothing(&mut self) {
        if let Some(iris) = self.iris.as_mut() {
            iris.iter_mut().for_each(|smoother| smoother.reset());
        }
    }

    /// Best-effort release of the stream and detector
    fn teardown(mut self) {
        self.stream.stop();
        if let Err(e) = self.detector.close() {
            debug!("Ignoring detector close error during teardown: {e}");
        }
    }
}

/// Drives the overlay pipeline for a camera and detector
pub struct FrameOrchestrator {
    provider: Box<dyn StreamProvider>,
    detector_factory: Box<dyn DetectorFactory>,
    settings: OrchestratorSettings,
    state: SessionState,
    session: Option<CaptureSession>,
    renderer: OverlayRenderer,
    canvas: Canvas,
    texture: IrisTexture,
    current_frame: Option<RgbImage>,
    stop: StopHandle,
}

impl FrameOrchestrator {
    /// Create an idle orchestrator
    pub fn new(
        provider: Box<dyn StreamProvider>,
        detector_factory: Box<dyn DetectorFactory>,
        settings: OrchestratorSettings,
    ) -> Self {
        let renderer = OverlayRenderer::new(settings.render.clone());
        let canvas = Canvas::new(settings.fallback_size);
        Self {
            provider,
            detector_factory,
            settings,
            state: SessionState::Idle,
            session: None,
            renderer,
            canvas,
            texture: IrisTexture::none(),
            current_frame: None,
            stop: StopHandle::new(),
        }
    }

    /// Acquire the camera and detector and enter `Running`.
    ///
    /// A second start while starting or running is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the acquisition or detector error; the orchestrator is back
    /// in `Idle` and holds no resources.
    pub fn start(&mut self) -> Result<StartOutcome> {
        if self.state != SessionState::Idle {
            debug!("Start requested while {:?}, ignoring", self.state);
            return Ok(StartOutcome::AlreadyActive);
        }

        info!("Starting capture session on camera {}", self.settings.stream.device_index);
        self.stop.take();
        self.state = SessionState::Starting;

        let mut stream = match self.provider.acquire(&self.settings.stream) {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Camera acquisition failed: {e}");
                self.state = SessionState::Idle;
                return Err(e);
            }
        };
        if self.stop.take() {
            info!("Stop requested during startup, releasing camera");
            stream.stop();
            self.state = SessionState::Idle;
            return Ok(StartOutcome::Cancelled);
        }

        let detector = match self.detector_factory.create(&self.settings.detector) {
            Ok(detector) => detector,
            Err(e) => {
                warn!("Detector initialization failed: {e}");
                stream.stop();
                self.state = SessionState::Idle;
                return Err(e);
            }
        };

        let session = CaptureSession::new(
            stream,
            detector,
            self.settings.landmark_smoothing,
            self.settings.iris_smoothing,
        );
        if self.stop.take() {
            info!("Stop requested during startup, releasing camera");
            session.teardown();
            self.state = SessionState::Idle;
            return Ok(StartOutcome::Cancelled);
        }

        self.session = Some(session);
        self.state = SessionState::Running;
        info!("Capture session running");
        Ok(StartOutcome::Started)
    }

    /// Release the session and clear the overlay. Safe in any state.
    pub fn stop(&mut self) {
        self.stop.take();
        if let Some(session) = self.session.take() {
            info!("Stopping capture session");
            self.state = SessionState::Stopping;
            session.teardown();
        }
        self.canvas.clear();
        self.current_frame = None;
        self.state = SessionState::Idle;
    }

    /// Pull one frame from the camera, run the detector and composite.
    ///
    /// # Errors
    ///
    /// Camera and detector errors propagate; the session stays up so the
    /// caller can decide whether to restart it.
    pub fn tick(&mut self) -> Result<FrameOutcome> {
        if self.stop.is_requested() {
            self.stop();
            return Ok(FrameOutcome::Stopped);
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(FrameOutcome::Inactive);
        };

        let Some(frame) = session.stream.next_frame()? else {
            return Ok(FrameOutcome::NoFrame);
        };
        let faces = session.detector.detect(&frame)?;
        let size = SurfaceSize::new(frame.width(), frame.height());
        self.current_frame = Some(frame);

        self.process_detection(faces, size)
    }

    /// Handle one detector result for a frame of the given native size.
    ///
    /// # Errors
    ///
    /// Returns an error if geometry cannot be extracted from the landmarks.
    pub fn process_detection(&mut self, faces: Vec<LandmarkSet>, frame_size: SurfaceSize) -> Result<FrameOutcome> {
        let Some(session) = self.session.as_mut() else {
            return Ok(FrameOutcome::Inactive);
        };
        let started = Instant::now();

        let surface = if frame_size.is_empty() {
            self.settings.fallback_size
        } else {
            frame_size
        };
        if self.canvas.resize(surface) {
            debug!("Overlay surface resized to {}x{}", surface.width, surface.height);
            session.reset_iris_smoothing();
        }

        let count = faces.len();
        let Some(raw) = faces.into_iter().next() else {
            session.record_miss(self.settings.reset_after_missed_frames);
            self.canvas.clear();
            return Ok(FrameOutcome::NoFace);
        };
        if count > 1 {
            debug!("Detector reported {count} faces, using the first");
        }

        let eyes = session.track(&raw, surface, &self.settings.geometry)?;
        let tint = self.settings.palette.current();
        let texture = self.texture.poll();
        let painted = self.renderer.render_frame(&mut self.canvas, &eyes, tint, texture);

        let elapsed = started.elapsed();
        if elapsed > self.settings.frame_budget {
            warn!(
                "Frame took {:.1} ms, over the {} ms budget",
                elapsed.as_secs_f64() * 1000.0,
                self.settings.frame_budget.as_millis()
            );
        }

        Ok(FrameOutcome::Rendered(FrameReport {
            surface,
            faces: count,
            eyes,
            painted,
            elapsed,
        }))
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Running)
    }

    #[must_use]
    pub const fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Last frame pulled from the camera
    #[must_use]
    pub fn current_frame(&self) -> Option<&RgbImage> {
        self.current_frame.as_ref()
    }

    /// Current frame with the overlay stacked on top
    #[must_use]
    pub fn preview(&self) -> Option<RgbImage> {
        self.current_frame
            .as_ref()
            .map(|frame| compose_preview(frame, &self.canvas.to_image()))
    }

    #[must_use]
    pub fn smoothed_landmarks(&self) -> Option<&LandmarkSet> {
        self.session.as_ref().and_then(CaptureSession::smoothed_landmarks)
    }

    #[must_use]
    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn tint(&self) -> Tint {
        self.settings.palette.current()
    }

    /// Use `tint` from the next frame on, adding it to the palette if needed
    pub fn set_tint(&mut self, tint: Tint) {
        self.settings.palette.choose(tint);
    }

    /// Select a palette entry; `None` if out of range
    pub fn select_tint(&mut self, index: usize) -> Option<Tint> {
        self.settings.palette.select(index)
    }

    pub fn cycle_tint(&mut self) -> Tint {
        self.settings.palette.cycle()
    }

    #[must_use]
    pub const fn palette(&self) -> &TintPalette {
        &self.settings.palette
    }

    pub fn set_palette(&mut self, palette: TintPalette) {
        self.settings.palette = palette;
    }

    pub fn set_texture(&mut self, texture: IrisTexture) {
        debug!("Iris texture replaced: {texture:?}");
        self.texture = texture;
    }

    #[must_use]
    pub const fn texture(&self) -> &IrisTexture {
        &self.texture
    }

    #[must_use]
    pub const fn render_options(&self) -> &RenderOptions {
        self.renderer.options()
    }

    pub fn render_options_mut(&mut self) -> &mut RenderOptions {
        self.renderer.options_mut()
    }

    #[must_use]
    pub const fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Handle for requesting a stop from outside the frame loop
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}

impl Drop for FrameOrchestrator {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constants::NUM_FACE_MESH_LANDMARKS, landmarks::Landmark, Error};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct StillStream;

    impl CameraStream for StillStream {
        fn next_frame(&mut self) -> Result<Option<RgbImage>> {
            Ok(Some(RgbImage::new(320, 240)))
        }

        fn stop(&mut self) {}
    }

    struct Provider {
        fail: bool,
    }

    impl StreamProvider for Provider {
        fn acquire(&mut self, _request: &StreamRequest) -> Result<Box<dyn CameraStream>> {
            if self.fail {
                return Err(Error::StreamAcquisition("permission denied".to_string()));
            }
            Ok(Box::new(StillStream))
        }
    }

    struct Scripted(Rc<RefCell<Vec<Vec<LandmarkSet>>>>);

    impl LandmarkDetector for Scripted {
        fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<LandmarkSet>> {
            Ok(self.0.borrow_mut().pop().unwrap_or_default())
        }

        fn close(&mut self) -> Result<()> {
            Err(Error::Detector("already closed".to_string()))
        }
    }

    fn face() -> LandmarkSet {
        LandmarkSet::new(vec![Landmark::new(0.5, 0.5); NUM_FACE_MESH_LANDMARKS]).unwrap()
    }

    fn orchestrator(fail: bool, script: Vec<Vec<LandmarkSet>>) -> FrameOrchestrator {
        let script = Rc::new(RefCell::new(script));
        let factory = move |_: &DetectorOptions| -> Result<Box<dyn LandmarkDetector>> {
            Ok(Box::new(Scripted(Rc::clone(&script))))
        };
        FrameOrchestrator::new(Box::new(Provider { fail }), Box::new(factory), OrchestratorSettings::default())
    }

    #[test]
    fn test_start_and_stop() {
        let mut orch = orchestrator(false, vec![]);
        assert_eq!(orch.state(), SessionState::Idle);
        assert_eq!(orch.start().unwrap(), StartOutcome::Started);
        assert_eq!(orch.state(), SessionState::Running);
        assert_eq!(orch.start().unwrap(), StartOutcome::AlreadyActive);

        // Close errors are swallowed during teardown
        orch.stop();
        assert_eq!(orch.state(), SessionState::Idle);
        assert!(orch.session().is_none());
    }

    #[test]
    fn test_start_failure_returns_to_idle() {
        let mut orch = orchestrator(true, vec![]);
        let err = orch.start().unwrap_err();
        assert!(matches!(err, Error::StreamAcquisition(_)));
        assert_eq!(orch.state(), SessionState::Idle);
    }

    #[test]
    fn test_tick_when_idle() {
        let mut orch = orchestrator(false, vec![]);
        assert_eq!(orch.tick().unwrap(), FrameOutcome::Inactive);
    }

    #[test]
    fn test_no_face_then_face() {
        let mut orch = orchestrator(false, vec![vec![face()], vec![]]);
        orch.start().unwrap();

        assert_eq!(orch.tick().unwrap(), FrameOutcome::NoFace);
        assert!(orch.canvas().is_blank());
        assert_eq!(orch.session().map(CaptureSession::missed_frames), Some(1));

        match orch.tick().unwrap() {
            FrameOutcome::Rendered(report) => {
                assert_eq!(report.surface, SurfaceSize::new(320, 240));
                assert_eq!(report.eyes.len(), 2);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(orch.canvas().size(), SurfaceSize::new(320, 240));
        assert!(orch.smoothed_landmarks().is_some());
    }

    #[test]
    fn test_stop_handle_honoured_on_tick() {
        let mut orch = orchestrator(false, vec![]);
        orch.start().unwrap();
        orch.stop_handle().request_stop();
        assert_eq!(orch.tick().unwrap(), FrameOutcome::Stopped);
        assert_eq!(orch.state(), SessionState::Idle);
    }

    #[test]
    fn test_set_tint() {
        let mut orch = orchestrator(false, vec![]);
        let tint = Tint::new(1, 2, 3);
        orch.set_tint(tint);
        assert_eq!(orch.tint(), tint);
        assert_eq!(orch.select_tint(0), Some(Tint::default()));
    }
}
