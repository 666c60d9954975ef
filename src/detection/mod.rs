//! Detection pipeline around the external detector
//!
//! - [`detector`]: the `Detector` capability and a replay implementation
//! - [`source`]: image acquisition (`ImageSource`, file/directory source)
//! - [`postprocess`]: normalized output to clamped pixel boxes, reply packaging
//! - [`annotate`]: drawing boxes onto the returned image
//! - [`labels`]: class index to name table
//! - [`results`]: annotated images written beside their source

pub mod annotate;
pub mod detector;
pub mod labels;
pub mod postprocess;
pub mod results;
pub mod source;

pub use annotate::{AnnotationRenderer, BoxPainter};
pub use detector::{Detection, Detector, StaticDetector};
pub use labels::ClassLabels;
pub use postprocess::{Snapshot, build_reply, clamp_to_image, process_detections, to_bounding_box};
pub use source::{DirectorySource, Frame, ImageSource};
