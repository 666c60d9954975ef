//! Detector capability.
//!
//! The inference backend is an external collaborator. The session only needs
//! `infer`, so any backend (accelerator SDK, CPU model, replay) plugs in
//! behind [`Detector`].

use crate::error::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Raw detector output for one object
///
/// Coordinates are normalized to `[0, 1]` relative to the image size; `x`/`y`
/// is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Index into the class-name table
    pub label: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Confidence score
    pub score: f32,
}

impl Detection {
    pub fn new(label: usize, x: f32, y: f32, width: f32, height: f32, score: f32) -> Self {
        Self {
            label,
            x,
            y,
            width,
            height,
            score,
        }
    }
}

/// Object detector
pub trait Detector {
    /// Run inference on one image, returning boxes in emission order
    fn infer(&mut self, image: &RgbImage) -> Result<Vec<Detection>>;

    /// Human-readable backend name for logs
    fn name(&self) -> &str {
        "detector"
    }
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn infer(&mut self, image: &RgbImage) -> Result<Vec<Detection>> {
        (**self).infer(image)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Detector that replays a fixed list of detections for every image
///
/// Stands in for the accelerator backend on development machines and in
/// tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDetector {
    detections: Vec<Detection>,
}

impl StaticDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }
}

impl Detector for StaticDetector {
    fn infer(&mut self, image: &RgbImage) -> Result<Vec<Detection>> {
        log::trace!(
            "Static detector: {} detections for {}x{} image",
            self.detections.len(),
            image.width(),
            image.height()
        );
        Ok(self.detections.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_detector_replays() {
        let det = Detection::new(3, 0.1, 0.1, 0.2, 0.2, 0.9);
        let mut detector = StaticDetector::new(vec![det]);
        let img = RgbImage::new(8, 8);
        assert_eq!(detector.infer(&img).unwrap(), vec![det]);
        assert_eq!(detector.infer(&img).unwrap(), vec![det]);
    }

    #[test]
    fn test_boxed_detector_delegates() {
        let mut boxed: Box<dyn Detector> = Box::new(StaticDetector::default());
        assert_eq!(boxed.name(), "static");
        assert!(boxed.infer(&RgbImage::new(1, 1)).unwrap().is_empty());
    }
}
