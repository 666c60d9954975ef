//! Error types for Drishti
//!
//! Transport-level errors (bind, listen, connect, accept, send, receive,
//! decode) end the owning session loop. [`Error::ProtocolViolation`] and
//! [`AcquisitionError`] are handled locally by the board session.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Drishti error type
#[derive(Debug, Error)]
pub enum Error {
    /// Listening socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Bound socket is not usable for listening
    #[error("Failed to listen on {addr}: {source}")]
    Listen {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Outbound connection failed
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Incoming connection could not be accepted
    #[error("Failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    /// Frame could not be written
    #[error("Failed to send message: {0}")]
    Send(#[source] std::io::Error),

    /// Frame could not be read or decoded
    #[error("Failed to receive message: {0}")]
    Receive(#[from] ReceiveError),

    /// Bytes do not form a valid message
    #[error("Failed to decode message: {0}")]
    Decode(#[from] DecodeError),

    /// No image could be acquired
    #[error("Image acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    /// Peer sent a command this side does not handle
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Detector backend failure
    #[error("Detector error: {0}")]
    Detector(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Received image has a layout that cannot be written to disk
    #[error("Unsupported image layout: {channels} channels")]
    UnsupportedImage { channels: u32 },

    /// Image encode/decode failure outside acquisition
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while reading one frame from the stream
#[derive(Debug, Error)]
pub enum ReceiveError {
    /// Zero-length read: the peer closed the connection
    #[error("Connection closed by peer")]
    PeerClosed,

    /// Socket error (reset, timeout, ...)
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    /// Length prefix exceeds the accepted maximum
    #[error("Frame too large: {len} bytes (max {max})")]
    FrameTooLarge { len: u64, max: u64 },

    /// Frame payload is not a valid message
    #[error("{0}")]
    Decode(#[from] DecodeError),
}

/// Failure while decoding a message payload
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Protobuf layer rejected the bytes
    #[error("Malformed payload: {0}")]
    Malformed(#[from] prost::DecodeError),

    /// Neither a request nor a reply payload is present
    #[error("Message has no payload")]
    MissingPayload,

    /// Command tag disagrees with the payload variant
    #[error("Command {command} does not match {payload} payload")]
    CommandMismatch {
        command: &'static str,
        payload: &'static str,
    },

    /// Command value outside the known set
    #[error("Unknown command value: {0}")]
    UnknownCommand(i32),

    /// Raster length does not match its dimensions
    #[error("Image data is {actual} bytes, expected {expected} ({width}x{height}x{channels})")]
    ImageSize {
        width: u32,
        height: u32,
        channels: u32,
        expected: u64,
        actual: usize,
    },

    /// Confidence outside [0, 1]
    #[error("Confidence {0} outside [0, 1]")]
    InvalidConfidence(f32),
}

/// Failure while acquiring an image from the source
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// Configured path does not exist
    #[error("Image path not found: {0}")]
    NotFound(PathBuf),

    /// Path exists but holds no image files
    #[error("No images available in {0}")]
    Empty(PathBuf),

    /// Image file could not be read or decoded
    #[error("Failed to load {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Directory listing failed
    #[error("Failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<prost::DecodeError> for Error {
    fn from(e: prost::DecodeError) -> Self {
        Error::Decode(DecodeError::Malformed(e))
    }
}
