//! Detection post-processing: normalized detector output to wire boxes.
//!
//! # Coordinate Convention
//!
//! ```text
//! x_min = nx * W + 1          y_min = ny * H + 1
//! x_max = x_min + nw * W      y_max = y_min + nh * H
//! ```
//!
//! The +1 gives the 1-indexed coordinates the annotation step draws with.
//! Clamping is one-sided per bound: a negative minimum snaps to 1 and a
//! maximum past the edge snaps to the edge. Minimums are never checked
//! against the far edge and maximums never against zero, and `x_max` is
//! computed before `x_min` is clamped. Peers compare results bit-for-bit, so
//! all arithmetic stays in `f32`.

use crate::detection::detector::Detection;
use crate::detection::labels::ClassLabels;
use crate::protocol::{BoundingBox, Message, RawImage, ReplyPayload, RequestPayload};
use image::RgbImage;

/// Everything the board produced for one request
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub image: RgbImage,
    /// Image with boxes drawn on it, present only if it was requested
    pub annotated: Option<RgbImage>,
    pub boxes: Vec<BoundingBox>,
}

/// Convert one detection into a clamped pixel-space box
pub fn to_bounding_box(
    detection: &Detection,
    width: u32,
    height: u32,
    labels: &ClassLabels,
) -> BoundingBox {
    let w = width as f32;
    let h = height as f32;

    let x_min = detection.x * w + 1.0;
    let y_min = detection.y * h + 1.0;
    let x_max = x_min + detection.width * w;
    let y_max = y_min + detection.height * h;

    let mut bbox = BoundingBox {
        label: labels.label_for(detection.label),
        x_min,
        y_min,
        x_max,
        y_max,
        confidence: clamp_confidence(detection.score),
    };
    clamp_to_image(&mut bbox, width, height);
    bbox
}

impl BoundingBox {
    /// Pixel-space box for `detection` on a `width` x `height` image
    pub fn from_detection(
        detection: &Detection,
        width: u32,
        height: u32,
        labels: &ClassLabels,
    ) -> Self {
        to_bounding_box(detection, width, height, labels)
    }
}

/// One-sided clamp of box extents to the image
pub fn clamp_to_image(bbox: &mut BoundingBox, width: u32, height: u32) {
    let w = width as f32;
    let h = height as f32;

    if bbox.x_min < 0.0 {
        bbox.x_min = 1.0;
    }
    if bbox.y_min < 0.0 {
        bbox.y_min = 1.0;
    }
    if bbox.x_max > w {
        bbox.x_max = w;
    }
    if bbox.y_max > h {
        bbox.y_max = h;
    }
}

/// Scores leave the board inside [0, 1]; NaN becomes 0
fn clamp_confidence(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Convert a detector's output list, preserving emission order
pub fn process_detections(
    detections: &[Detection],
    width: u32,
    height: u32,
    labels: &ClassLabels,
) -> Vec<BoundingBox> {
    detections
        .iter()
        .map(|d| to_bounding_box(d, width, height, labels))
        .collect()
}

/// Package a snapshot as the reply to request `id`
///
/// Images are attached only when the request asked for them and a snapshot
/// exists. Without a snapshot the reply carries no boxes.
pub fn build_reply(id: u32, request: &RequestPayload, snapshot: Option<&Snapshot>) -> Message {
    let mut reply = ReplyPayload::default();

    if let Some(snapshot) = snapshot {
        reply.bounding_boxes = snapshot.boxes.clone();
        if request.want_image {
            reply.image = Some(RawImage::from_rgb(&snapshot.image));
        }
        if request.want_bounding_box_image {
            reply.bounding_box_image = snapshot.annotated.as_ref().map(RawImage::from_rgb);
        }
    }

    Message::reply(id, reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scenario_640x480() {
        let det = Detection::new(3, 0.1, 0.1, 0.2, 0.2, 0.9);
        let b = to_bounding_box(&det, 640, 480, &ClassLabels::default());

        assert_eq!(b.label, "3");
        assert_relative_eq!(b.x_min, 65.0);
        assert_relative_eq!(b.y_min, 49.0);
        assert_relative_eq!(b.x_max, 193.0);
        assert_relative_eq!(b.y_max, 145.0);
        assert_relative_eq!(b.confidence, 0.9);
    }

    #[test]
    fn test_asymmetric_clamp_on_left_edge() {
        let det = Detection::new(0, -0.05, 0.5, 0.1, 0.1, 0.5);
        let b = to_bounding_box(&det, 100, 100, &ClassLabels::default());

        // x_min snaps to 1, x_max keeps the unclamped origin: -4 + 10
        assert_relative_eq!(b.x_min, 1.0);
        assert_relative_eq!(b.x_max, 6.0, epsilon = 1e-5);
        assert_relative_eq!(b.y_min, 51.0);
        assert_relative_eq!(b.y_max, 61.0);
    }

    #[test]
    fn test_max_clamped_to_edge() {
        let det = Detection::new(0, 0.9, 0.9, 0.5, 0.5, 0.5);
        let b = to_bounding_box(&det, 200, 100, &ClassLabels::default());
        assert_relative_eq!(b.x_max, 200.0);
        assert_relative_eq!(b.y_max, 100.0);
        assert_relative_eq!(b.x_min, 181.0);
        assert_relative_eq!(b.y_min, 91.0);
    }

    #[test]
    fn test_min_between_zero_and_one_not_clamped() {
        let mut b = BoundingBox {
            label: "x".into(),
            x_min: 0.5,
            y_min: 0.0,
            x_max: 10.0,
            y_max: 10.0,
            confidence: 1.0,
        };
        clamp_to_image(&mut b, 20, 20);
        assert_eq!(b.x_min, 0.5);
        assert_eq!(b.y_min, 0.0);
    }

    #[test]
    fn test_min_past_far_edge_not_clamped() {
        let det = Detection::new(0, 1.5, 0.0, 0.1, 0.1, 0.5);
        let b = to_bounding_box(&det, 100, 100, &ClassLabels::default());
        assert_relative_eq!(b.x_min, 151.0);
        assert_relative_eq!(b.x_max, 100.0);
    }

    #[test]
    fn test_labels_resolved() {
        let labels = ClassLabels::new(vec!["ship".into(), "buoy".into()]);
        let det = Detection::new(1, 0.0, 0.0, 0.1, 0.1, 0.7);
        assert_eq!(to_bounding_box(&det, 10, 10, &labels).label, "buoy");
    }

    #[test]
    fn test_confidence_clamped() {
        let labels = ClassLabels::default();
        let hi = Detection::new(0, 0.0, 0.0, 0.1, 0.1, 1.2);
        let nan = Detection::new(0, 0.0, 0.0, 0.1, 0.1, f32::NAN);
        assert_eq!(to_bounding_box(&hi, 10, 10, &labels).confidence, 1.0);
        assert_eq!(to_bounding_box(&nan, 10, 10, &labels).confidence, 0.0);
    }

    #[test]
    fn test_order_preserved() {
        let dets = vec![
            Detection::new(2, 0.5, 0.5, 0.1, 0.1, 0.3),
            Detection::new(0, 0.1, 0.1, 0.1, 0.1, 0.9),
            Detection::new(1, 0.3, 0.3, 0.1, 0.1, 0.6),
        ];
        let boxes = process_detections(&dets, 100, 100, &ClassLabels::default());
        let labels: Vec<&str> = boxes.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["2", "0", "1"]);
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            image: RgbImage::new(4, 3),
            annotated: Some(RgbImage::new(4, 3)),
            boxes: vec![BoundingBox {
                label: "0".into(),
                x_min: 1.0,
                y_min: 1.0,
                x_max: 2.0,
                y_max: 2.0,
                confidence: 0.5,
            }],
        }
    }

    #[test]
    fn test_build_reply_respects_flags() {
        let snap = snapshot();

        let msg = build_reply(7, &RequestPayload::new(true, false), Some(&snap));
        assert_eq!(msg.id, 7);
        let reply = msg.as_reply().unwrap();
        assert_eq!(reply.bounding_boxes.len(), 1);
        let img = reply.image.as_ref().unwrap();
        assert_eq!((img.width(), img.height(), img.channels()), (4, 3, 3));
        assert!(reply.bounding_box_image.is_none());

        let msg = build_reply(8, &RequestPayload::new(false, true), Some(&snap));
        let reply = msg.as_reply().unwrap();
        assert!(reply.image.is_none());
        assert!(reply.bounding_box_image.is_some());
    }

    #[test]
    fn test_from_detection_uses_label_table() {
        let labels = ClassLabels::new(vec!["boat".into(), "buoy".into()]);
        let det = Detection::new(1, 0.5, 0.5, 0.1, 0.1, 0.4);
        let b = BoundingBox::from_detection(&det, 200, 100, &labels);
        assert_eq!(b.label, "buoy");
        assert_eq!(b, to_bounding_box(&det, 200, 100, &labels));
    }

    #[test]
    fn test_build_reply_without_snapshot() {
        let msg = build_reply(9, &RequestPayload::new(true, true), None);
        let reply = msg.as_reply().unwrap();
        assert_eq!(msg.id, 9);
        assert!(reply.bounding_boxes.is_empty());
        assert!(reply.image.is_none());
        assert!(reply.bounding_box_image.is_none());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn clamp_is_noop_inside_image(
                w in 1u32..4000,
                h in 1u32..4000,
                a in 0.0f32..1.0,
                b in 0.0f32..1.0,
                c in 0.0f32..1.0,
                d in 0.0f32..1.0,
            ) {
                let (wf, hf) = (w as f32, h as f32);
                let x0 = 1.0 + a * (wf - 1.0);
                let x1 = x0 + b * (wf - x0);
                let y0 = 1.0 + c * (hf - 1.0);
                let y1 = y0 + d * (hf - y0);
                let inside = BoundingBox {
                    label: "p".into(),
                    x_min: x0,
                    y_min: y0,
                    x_max: x1.min(wf),
                    y_max: y1.min(hf),
                    confidence: 0.5,
                };
                let mut clamped = inside.clone();
                clamp_to_image(&mut clamped, w, h);
                prop_assert_eq!(&clamped, &inside);
                clamp_to_image(&mut clamped, w, h);
                prop_assert_eq!(clamped, inside);
            }

            #[test]
            fn in_range_detections_stay_in_bounds(
                x in 0.0f32..1.0,
                y in 0.0f32..1.0,
                bw in 0.0f32..1.0,
                bh in 0.0f32..1.0,
            ) {
                let det = Detection::new(0, x, y, bw, bh, 0.5);
                let b = to_bounding_box(&det, 640, 480, &ClassLabels::default());
                prop_assert!(b.x_min >= 1.0 && b.y_min >= 1.0);
                prop_assert!(b.x_max <= 640.0 && b.y_max <= 480.0);
            }
        }
    }
}
