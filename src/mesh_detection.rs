//! Face-mesh landmark detection with iris refinement.
//!
//! A face box from [`FaceDetector`] seeds a square crop; the face-mesh model
//! returns 478 points inside the crop. While the face stays tracked, the next
//! crop is derived from the previous landmarks and the box detector is skipped.

use crate::{
    constants::{FACE_MESH_INPUT_SIZE, FACE_MESH_ROI_SCALE, NUM_FACE_MESH_LANDMARKS},
    face_detection::FaceDetector,
    geometry::SurfaceSize,
    landmarks::LandmarkSet,
    session::{DetectorOptions, LandmarkDetector},
    utils::{landmark_region, refine_regions, Region},
    Error, Result,
};
use image::{imageops, RgbImage};
use log::{debug, info};
use ndarray::{Array4, CowArray};
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Values per landmark in the model output (x, y, z)
const VALUES_PER_LANDMARK: usize = 3;

/// Face-mesh landmark detector using ONNX Runtime
pub struct MeshDetector {
    face_detector: FaceDetector,
    session: Session,
    options: DetectorOptions,
    input_size: u32,
    roi: Option<Region>,
}

impl MeshDetector {
    /// Load the box detector and the face-mesh model
    ///
    /// # Errors
    ///
    /// Returns an error if the options ask for more than one face or an
    /// unrefined topology, or if either model cannot be loaded.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        face_detector_path: P,
        face_mesh_path: Q,
        options: &DetectorOptions,
        iou_threshold: f32,
    ) -> Result<Self> {
        if options.max_faces != 1 {
            return Err(Error::ModelInputError(format!(
                "Face mesh tracks a single face, {} requested",
                options.max_faces
            )));
        }
        if !options.refine_landmarks {
            return Err(Error::ModelInputError(
                "Face mesh requires refined landmarks for iris points".to_string(),
            ));
        }

        info!(
            "Initializing MeshDetector with model: {}",
            face_mesh_path.as_ref().display()
        );
        let face_detector = FaceDetector::new(face_detector_path, options.min_detection_confidence, iou_threshold)?;

        let environment = Arc::new(
            Environment::builder()
                .with_name("face_mesh")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );
        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(face_mesh_path)?;

        if session.inputs.is_empty() {
            return Err(Error::ModelInputError("Model has no inputs".to_string()));
        }

        Ok(Self {
            face_detector,
            session,
            options: *options,
            input_size: FACE_MESH_INPUT_SIZE,
            roi: None,
        })
    }

    /// Square crop for this frame: tracked from the last landmarks, or from a
    /// fresh face box
    fn crop_region(&mut self, frame: &RgbImage) -> Result<Option<Region>> {
        if let Some(roi) = self.roi {
            return Ok(Some(roi));
        }

        let bounds = SurfaceSize::new(frame.width(), frame.height());
        let Some(best) = self.face_detector.detect(frame)?.into_iter().next() else {
            return Ok(None);
        };

        let mut regions = [best.bbox.to_region(bounds)];
        refine_regions(&mut regions, bounds, f64::from(FACE_MESH_ROI_SCALE - 1.0) / 2.0);
        Ok(Some(regions[0]).filter(|r| !r.is_empty()))
    }

    /// Normalize the crop into a `[1, size, size, 3]` tensor in `[0, 1]`
    fn preprocess(&self, crop: &RgbImage) -> Array4<f32> {
        let size = self.input_size as usize;
        let resized = imageops::resize(crop, self.input_size, self.input_size, imageops::FilterType::Triangle);

        let mut array = Array4::zeros((1, size, size, 3));
        for (x, y, px) in resized.enumerate_pixels() {
            for ch in 0..3 {
                array[[0, y as usize, x as usize, ch]] = f32::from(px[ch]) / 255.0;
            }
        }
        array
    }

    /// Run the model; returns crop-space landmarks and the face presence score
    fn forward(&self, inputs: Array4<f32>) -> Result<(Vec<f32>, f32)> {
        let cow_array = CowArray::from(inputs.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let mut landmarks = None;
        let mut presence = None;
        for output in &outputs {
            let tensor = output.try_extract::<f32>()?;
            let view = tensor.view();
            let data = view
                .as_slice()
                .ok_or_else(|| Error::ModelOutputError("Failed to get output data".to_string()))?;
            match data.len() {
                n if n == NUM_FACE_MESH_LANDMARKS * VALUES_PER_LANDMARK => landmarks = Some(data.to_vec()),
                1 => presence = Some(sigmoid(data[0])),
                _ => {}
            }
        }

        let landmarks = landmarks.ok_or_else(|| {
            Error::ModelDataFormatError(format!(
                "No output with {} values; is this a refined face-mesh model?",
                NUM_FACE_MESH_LANDMARKS * VALUES_PER_LANDMARK
            ))
        })?;
        Ok((landmarks, presence.unwrap_or(1.0)))
    }
}

impl LandmarkDetector for MeshDetector {
    #[allow(clippy::cast_precision_loss)]
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<LandmarkSet>> {
        let bounds = SurfaceSize::new(frame.width(), frame.height());
        if bounds.is_empty() {
            return Ok(Vec::new());
        }

        let Some(region) = self.crop_region(frame)? else {
            return Ok(Vec::new());
        };

        let crop = imageops::crop_imm(frame, region.x, region.y, region.width, region.height).to_image();
        let (raw, presence) = self.forward(self.preprocess(&crop))?;

        if presence < self.options.min_tracking_confidence {
            debug!("Face lost (presence {presence:.2}), re-detecting next frame");
            self.roi = None;
            return Ok(Vec::new());
        }

        let scale_x = region.width as f32 / self.input_size as f32;
        let scale_y = region.height as f32 / self.input_size as f32;
        let points: Vec<(f32, f32)> = raw
            .chunks_exact(VALUES_PER_LANDMARK)
            .map(|p| {
                (
                    (region.x as f32 + p[0] * scale_x) / bounds.width as f32,
                    (region.y as f32 + p[1] * scale_y) / bounds.height as f32,
                )
            })
            .collect();

        let landmarks = LandmarkSet::from_normalized(&points)?;
        let next = landmark_region(&landmarks, bounds, f64::from(FACE_MESH_ROI_SCALE));
        self.roi = Some(next).filter(|r| !r.is_empty());

        Ok(vec![landmarks])
    }

    fn close(&mut self) -> Result<()> {
        self.roi = None;
        Ok(())
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < f32::EPSILON);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn test_missing_models_fail() {
        let result = MeshDetector::new(
            "/nonexistent/face_detector.onnx",
            "/nonexistent/face_mesh.onnx",
            &DetectorOptions::default(),
            0.4,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_multiple_faces() {
        let options = DetectorOptions {
            max_faces: 2,
            ..DetectorOptions::default()
        };
        let result = MeshDetector::new("a.onnx", "b.onnx", &options, 0.4);
        assert!(matches!(result, Err(Error::ModelInputError(_))));
    }
}
