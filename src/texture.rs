//! Iris texture asset, loaded off the frame path.
//!
//! Decoding happens on a worker thread; the renderer polls once per frame and
//! draws without the texture until it is ready.

use image::RgbaImage;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

enum TextureState {
    Absent,
    Pending(Receiver<crate::Result<RgbaImage>>),
    Ready(RgbaImage),
    Failed,
}

/// Externally supplied iris texture
pub struct IrisTexture {
    source: Option<PathBuf>,
    state: TextureState,
}

impl IrisTexture {
    /// No texture configured
    #[must_use]
    pub fn none() -> Self {
        Self {
            source: None,
            state: TextureState::Absent,
        }
    }

    /// Use an already decoded image
    #[must_use]
    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            source: None,
            state: TextureState::Ready(image),
        }
    }

    /// Start decoding `path` in the background
    pub fn load_async<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let (tx, rx) = mpsc::channel();
        let worker_path = path.clone();

        info!("Loading iris texture from {}", path.display());
        thread::spawn(move || {
            let decoded = image::open(&worker_path)
                .map(|img| img.to_rgba8())
                .map_err(crate::Error::from);
            // The receiver is gone if the texture was replaced meanwhile
            let _ = tx.send(decoded);
        });

        Self {
            source: Some(path),
            state: TextureState::Pending(rx),
        }
    }

    /// Return the texture if it has finished loading
    pub fn poll(&mut self) -> Option<&RgbaImage> {
        if let TextureState::Pending(rx) = &self.state {
            let next = match rx.try_recv() {
                Ok(Ok(image)) => {
                    debug!("Iris texture ready ({}x{})", image.width(), image.height());
                    Some(TextureState::Ready(image))
                }
                Ok(Err(e)) => {
                    warn!("Failed to load iris texture {}: {e}", self.describe_source());
                    Some(TextureState::Failed)
                }
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    warn!("Iris texture loader for {} exited without a result", self.describe_source());
                    Some(TextureState::Failed)
                }
            };
            if let Some(state) = next {
                self.state = state;
            }
        }

        match &self.state {
            TextureState::Ready(image) => Some(image),
            _ => None,
        }
    }

    /// Block until a pending load finishes
    pub fn wait(&mut self) -> Option<&RgbaImage> {
        if let TextureState::Pending(rx) = &self.state {
            self.state = match rx.recv() {
                Ok(Ok(image)) => TextureState::Ready(image),
                Ok(Err(e)) => {
                    warn!("Failed to load iris texture {}: {e}", self.describe_source());
                    TextureState::Failed
                }
                Err(_) => TextureState::Failed,
            };
        }
        self.poll()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.state, TextureState::Pending(_))
    }

    #[must_use]
    pub fn has_failed(&self) -> bool {
        matches!(self.state, TextureState::Failed)
    }

    fn describe_source(&self) -> String {
        self.source
            .as_ref()
            .map_or_else(|| "<memory>".to_string(), |p| p.display().to_string())
    }
}

impl Default for IrisTexture {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for IrisTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            TextureState::Absent => "absent",
            TextureState::Pending(_) => "pending",
            TextureState::Ready(_) => "ready",
            TextureState::Failed => "failed",
        };
        f.debug_struct("IrisTexture")
            .field("source", &self.source)
            .field("state", &state)
            .finish()
    }
}
