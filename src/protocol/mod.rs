//! Wire codec for the detection snapshot protocol
//!
//! # Message Schema
//!
//! ```text
//! DetectionMessage
//! ├── command    REQUEST | REPLY
//! ├── id         u32, echoed from request to reply
//! ├── time_sent  f64 seconds since epoch, stamped on send
//! └── payload    oneof
//!     ├── Request { get_image, get_bounding_box_image }
//!     └── Reply   { bounding_boxes[], image?, bounding_box_image? }
//! ```
//!
//! The protobuf schema lives in `proto/drishti.proto`; [`proto`] holds the
//! matching prost types and [`message`] the domain types the rest of the
//! crate works with.

pub mod codec;
pub mod message;
pub mod proto;

pub use codec::{decode, encode, encoded_len};
pub use message::{
    BoundingBox, Command, Message, Payload, RawImage, ReplyPayload, RequestPayload,
    seconds_since_epoch,
};
