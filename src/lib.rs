//! Drishti - object-detection snapshots between an edge board and a host
//!
//! The board runs a detector on its camera (or a directory of demo scenes)
//! and answers snapshot requests with labelled bounding boxes and,
//! optionally, the raw and annotated images. The host requests snapshots
//! periodically and stores what it receives.
//!
//! ## Layers
//!
//! - [`protocol`]: message model and protobuf codec
//! - [`transport`]: length-prefixed framing over TCP
//! - [`detection`]: detector seam, post-processing, annotation
//! - [`session`]: board and host request/reply loops

pub mod config;
pub mod detection;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use config::DrishtiConfig;
pub use error::{Error, Result};
pub use protocol::{Message, Payload, ReplyPayload, RequestPayload};
pub use session::{BoardSession, HostSession};
pub use transport::{Connection, Listener};
