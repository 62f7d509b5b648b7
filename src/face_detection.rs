//! SCRFD face box detector used to seed the face-mesh crop.

use crate::{
    constants::{IMAGE_NORMALIZATION_OFFSET, IMAGE_NORMALIZATION_SCALE},
    geometry::SurfaceSize,
    utils::{safe_cast::f32_to_u32_clamp, Region},
    Error, Result,
};
use image::{imageops, RgbImage};
use log::{debug, warn};
use ndarray::{Array4, CowArray};
use ort::{Environment, Session, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Default SCRFD input edge
const DEFAULT_DETECTOR_INPUT_SIZE: u32 = 640;

/// Face box in frame pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    #[must_use]
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    #[must_use]
    pub fn iou(&self, other: &Self) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = w * h;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }

    /// Pixel region clipped to the frame
    #[must_use]
    pub fn to_region(&self, frame: SurfaceSize) -> Region {
        let x0 = f32_to_u32_clamp(self.x1.floor(), 0, frame.width);
        let y0 = f32_to_u32_clamp(self.y1.floor(), 0, frame.height);
        let x1 = f32_to_u32_clamp(self.x2.ceil(), 0, frame.width);
        let y1 = f32_to_u32_clamp(self.y2.ceil(), 0, frame.height);
        Region::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }
}

/// Face detection result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDetection {
    pub bbox: BoundingBox,
    pub score: f32,
}

/// SCRFD face detector using ONNX Runtime
pub struct FaceDetector {
    session: Session,
    input_size: (u32, u32),
    conf_threshold: f32,
    nms_threshold: f32,
    num_anchors: usize,
    strides: Vec<u32>,
    center_cache: HashMap<(u32, u32, u32), Vec<(f32, f32)>>,
}

impl FaceDetector {
    /// Load a face detector from an ONNX model file
    ///
    /// # Errors
    ///
    /// Returns an error if the ONNX runtime environment cannot be created or
    /// the model cannot be loaded.
    pub fn new<P: AsRef<Path>>(model_path: P, conf_threshold: f32, nms_threshold: f32) -> Result<Self> {
        log::info!("Initializing FaceDetector with model: {}", model_path.as_ref().display());
        let environment = Arc::new(
            Environment::builder()
                .with_name("face_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        let input_shape = &session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelInputError("Model has no inputs".to_string()))?
            .dimensions;

        // Input shape is [batch, channels, height, width]; dynamic axes fall back to the default
        let dim = |i: usize| {
            input_shape
                .get(i)
                .copied()
                .flatten()
                .and_then(|d| u32::try_from(d).ok())
                .unwrap_or(DEFAULT_DETECTOR_INPUT_SIZE)
        };
        let input_size = (dim(3), dim(2));

        // Outputs are grouped as scores, boxes and optionally keypoints per stride
        let (strides, num_anchors) = match session.outputs.len() {
            6 | 9 => (vec![8, 16, 32], 2),
            10 | 15 => (vec![8, 16, 32, 64, 128], 1),
            n => {
                warn!("Unknown model configuration with {n} outputs, using defaults");
                (vec![8, 16, 32], 2)
            }
        };

        Ok(Self {
            session,
            input_size,
            conf_threshold,
            nms_threshold,
            num_anchors,
            strides,
            center_cache: HashMap::new(),
        })
    }

    /// Detect faces, best score first
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails or the outputs have an unexpected shape.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceDetection>> {
        let (img_width, img_height) = image.dimensions();
        if img_width == 0 || img_height == 0 {
            return Ok(Vec::new());
        }

        // Letterbox into the model input, keeping the aspect ratio
        let (input_width, input_height) = self.input_size;
        let ratio_img = img_height as f32 / img_width as f32;
        let ratio_model = input_height as f32 / input_width as f32;
        let (new_width, new_height) = if ratio_img > ratio_model {
            ((input_height as f32 / ratio_img) as u32, input_height)
        } else {
            (input_width, (input_width as f32 * ratio_img) as u32)
        };
        let det_scale = new_height as f32 / img_height as f32;

        let resized = imageops::resize(image, new_width.max(1), new_height.max(1), imageops::FilterType::Triangle);
        let inputs = self.preprocess(&resized);

        let candidates = self.forward(inputs)?;
        let scaled = candidates
            .into_iter()
            .map(|d| FaceDetection {
                bbox: BoundingBox {
                    x1: d.bbox.x1 / det_scale,
                    y1: d.bbox.y1 / det_scale,
                    x2: d.bbox.x2 / det_scale,
                    y2: d.bbox.y2 / det_scale,
                },
                score: d.score,
            })
            .collect();

        let detections = nms(scaled, self.nms_threshold);
        debug!("FaceDetector found {} faces", detections.len());
        Ok(detections)
    }

    /// Normalize into a zero-padded NCHW tensor
    fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
        let (width, height) = (self.input_size.0 as usize, self.input_size.1 as usize);
        let mut array = Array4::zeros((1, 3, height, width));
        for (x, y, px) in image.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            if x >= width || y >= height {
                continue;
            }
            for ch in 0..3 {
                array[[0, ch, y, x]] = (f32::from(px[ch]) - IMAGE_NORMALIZATION_OFFSET) / IMAGE_NORMALIZATION_SCALE;
            }
        }
        array
    }

    /// Run the model and decode candidates above the confidence threshold
    #[allow(clippy::cast_precision_loss)]
    fn forward(&mut self, inputs: Array4<f32>) -> Result<Vec<FaceDetection>> {
        let cow_array = CowArray::from(inputs.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let offset = self.strides.len();
        let mut candidates = Vec::new();

        for (idx, &stride) in self.strides.iter().enumerate() {
            let scores_tensor = outputs
                .get(idx)
                .ok_or_else(|| Error::ModelOutputError(format!("Missing score output {idx}")))?
                .try_extract::<f32>()?;
            let scores_view = scores_tensor.view();
            let scores = scores_view
                .as_slice()
                .ok_or_else(|| Error::ModelOutputError("Score output is not contiguous".to_string()))?;

            let bbox_tensor = outputs
                .get(idx + offset)
                .ok_or_else(|| Error::ModelOutputError(format!("Missing box output {}", idx + offset)))?
                .try_extract::<f32>()?;
            let bbox_view = bbox_tensor.view();
            let distances = bbox_view
                .as_slice()
                .ok_or_else(|| Error::ModelOutputError("Box output is not contiguous".to_string()))?;

            let centers = anchor_centers(&mut self.center_cache, self.input_size, stride, self.num_anchors);
            if distances.len() < centers.len() * 4 || scores.len() < centers.len() {
                return Err(Error::ModelDataFormatError(format!(
                    "Stride {stride}: {} anchors but {} scores and {} box values",
                    centers.len(),
                    scores.len(),
                    distances.len()
                )));
            }

            let scale = stride as f32;
            for (i, &(cx, cy)) in centers.iter().enumerate() {
                if scores[i] < self.conf_threshold {
                    continue;
                }
                let d = &distances[i * 4..i * 4 + 4];
                candidates.push(FaceDetection {
                    bbox: distance_to_bbox((cx, cy), [d[0] * scale, d[1] * scale, d[2] * scale, d[3] * scale]),
                    score: scores[i],
                });
            }
        }

        Ok(candidates)
    }
}

/// Anchor centers for a stride, cached per input size
#[allow(clippy::cast_precision_loss)]
fn anchor_centers(
    cache: &mut HashMap<(u32, u32, u32), Vec<(f32, f32)>>,
    input_size: (u32, u32),
    stride: u32,
    num_anchors: usize,
) -> Vec<(f32, f32)> {
    let height = input_size.1 / stride;
    let width = input_size.0 / stride;

    cache
        .entry((height, width, stride))
        .or_insert_with(|| {
            let mut centers = Vec::with_capacity((height * width) as usize * num_anchors);
            for y in 0..height {
                for x in 0..width {
                    let center = ((x * stride) as f32, (y * stride) as f32);
                    centers.extend(std::iter::repeat(center).take(num_anchors));
                }
            }
            centers
        })
        .clone()
}

/// Decode left/top/right/bottom distances from an anchor center
#[must_use]
pub fn distance_to_bbox(center: (f32, f32), distances: [f32; 4]) -> BoundingBox {
    BoundingBox {
        x1: center.0 - distances[0],
        y1: center.1 - distances[1],
        x2: center.0 + distances[2],
        y2: center.1 + distances[3],
    }
}

/// Non-maximum suppression; returns the kept detections by descending score
#[must_use]
pub fn nms(mut detections: Vec<FaceDetection>, iou_threshold: f32) -> Vec<FaceDetection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<FaceDetection> = Vec::new();
    for candidate in detections {
        if keep.iter().all(|kept| kept.bbox.iou(&candidate.bbox) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> FaceDetection {
        FaceDetection {
            bbox: BoundingBox { x1, y1, x2, y2 },
            score,
        }
    }

    #[test]
    fn test_distance_to_bbox() {
        let bbox = distance_to_bbox((100.0, 100.0), [10.0, 10.0, 20.0, 20.0]);
        assert_eq!(bbox, BoundingBox { x1: 90.0, y1: 90.0, x2: 120.0, y2: 120.0 });

        let region = bbox.to_region(SurfaceSize::new(640, 480));
        assert_eq!(region, Region::new(90, 90, 30, 30));
    }

    #[test]
    fn test_nms_suppresses_overlaps() {
        let kept = nms(
            vec![
                detection(0.0, 0.0, 10.0, 10.0, 0.7),
                detection(1.0, 1.0, 11.0, 11.0, 0.9),
                detection(50.0, 50.0, 60.0, 60.0, 0.8),
            ],
            0.4,
        );
        assert_eq!(kept.len(), 2);
        assert!((kept[0].score - 0.9).abs() < f32::EPSILON);
        assert!((kept[1].score - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = BoundingBox { x1: 0.0, y1: 0.0, x2: 1.0, y2: 1.0 };
        let b = BoundingBox { x1: 2.0, y1: 2.0, x2: 3.0, y2: 3.0 };
        assert!(a.iou(&b).abs() < f32::EPSILON);
        assert!((a.iou(&a) - 1.0).abs() < f32::EPSILON);
    }
}
