//! OpenCV camera capture.

use crate::{
    session::{CameraStream, StreamProvider, StreamRequest},
    utils::image_conversion::mat_to_rgb,
    Error, Result,
};
use image::RgbImage;
use log::{debug, info, warn};
use opencv::{
    core::{self, Mat},
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE},
};

/// Opens webcams through `VideoCapture`
#[derive(Debug, Default)]
pub struct OpenCvStreamProvider;

impl OpenCvStreamProvider {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl StreamProvider for OpenCvStreamProvider {
    fn acquire(&mut self, request: &StreamRequest) -> Result<Box<dyn CameraStream>> {
        if request.audio {
            warn!("Audio capture is not supported, ignoring");
        }

        info!("Opening camera {}", request.device_index);
        let mut capture = VideoCapture::new(request.device_index, videoio::CAP_ANY)
            .map_err(|e| Error::StreamAcquisition(format!("camera {}: {e}", request.device_index)))?;
        let opened = capture
            .is_opened()
            .map_err(|e| Error::StreamAcquisition(format!("camera {}: {e}", request.device_index)))?;
        if !opened {
            return Err(Error::StreamAcquisition(format!(
                "camera {} is unavailable or access was denied",
                request.device_index
            )));
        }

        // Reduce buffer size for lower latency
        if let Err(e) = capture.set(CAP_PROP_BUFFERSIZE, 1.0) {
            debug!("Camera does not accept a buffer size: {e}");
        }

        Ok(Box::new(OpenCvStream {
            capture,
            frame: Mat::default(),
            mirror: request.mirror,
        }))
    }
}

/// A live `VideoCapture` stream
pub struct OpenCvStream {
    capture: VideoCapture,
    frame: Mat,
    mirror: bool,
}

impl CameraStream for OpenCvStream {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        if !self.capture.read(&mut self.frame)? || self.frame.empty() {
            return Ok(None);
        }

        if self.mirror {
            let mut flipped = Mat::default();
            core::flip(&self.frame, &mut flipped, 1)?;
            return mat_to_rgb(&flipped).map(Some);
        }
        mat_to_rgb(&self.frame).map(Some)
    }

    fn stop(&mut self) {
        if let Err(e) = self.capture.release() {
            debug!("Ignoring camera release error: {e}");
        }
    }
}
