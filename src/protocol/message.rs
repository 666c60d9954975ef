//! Domain message types.
//!
//! [`Message`] carries its payload as a sum type, so the command is derived
//! from the payload and a request can never hold reply data.

use crate::error::DecodeError;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Message kind on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Request,
    Reply,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Request => "REQUEST",
            Command::Reply => "REPLY",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit exchanged between host and board
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Correlation id chosen by the requester, echoed in the reply
    pub id: u32,
    /// Seconds since the Unix epoch, overwritten by the sender on transmit
    pub time_sent: f64,
    pub payload: Payload,
}

/// Command-specific content of a [`Message`]
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Request(RequestPayload),
    Reply(ReplyPayload),
}

impl Message {
    /// Build a request with an unstamped send time
    pub fn request(id: u32, request: RequestPayload) -> Self {
        Self {
            id,
            time_sent: 0.0,
            payload: Payload::Request(request),
        }
    }

    /// Build a reply with an unstamped send time
    pub fn reply(id: u32, reply: ReplyPayload) -> Self {
        Self {
            id,
            time_sent: 0.0,
            payload: Payload::Reply(reply),
        }
    }

    pub fn command(&self) -> Command {
        match self.payload {
            Payload::Request(_) => Command::Request,
            Payload::Reply(_) => Command::Reply,
        }
    }

    pub fn as_request(&self) -> Option<&RequestPayload> {
        match &self.payload {
            Payload::Request(r) => Some(r),
            Payload::Reply(_) => None,
        }
    }

    pub fn as_reply(&self) -> Option<&ReplyPayload> {
        match &self.payload {
            Payload::Reply(r) => Some(r),
            Payload::Request(_) => None,
        }
    }

    /// Overwrite `time_sent` with the current wall-clock time
    pub fn stamp(&mut self) {
        self.time_sent = seconds_since_epoch();
    }
}

/// Which optional images the requester wants echoed back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestPayload {
    pub want_image: bool,
    pub want_bounding_box_image: bool,
}

impl RequestPayload {
    pub fn new(want_image: bool, want_bounding_box_image: bool) -> Self {
        Self {
            want_image,
            want_bounding_box_image,
        }
    }
}

/// Detection results for one snapshot
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReplyPayload {
    /// Boxes in detector emission order
    pub bounding_boxes: Vec<BoundingBox>,
    pub image: Option<RawImage>,
    pub bounding_box_image: Option<RawImage>,
}

/// Pixel-space detection box
///
/// Coordinates follow the 1-indexed convention of the post-processor; see
/// [`crate::detection::postprocess`].
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub label: String,
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
    pub confidence: f32,
}

/// Uncompressed interleaved raster, row-major
///
/// `data.len() == width * height * channels` always holds.
#[derive(Clone, PartialEq)]
pub struct RawImage {
    width: u32,
    height: u32,
    channels: u32,
    data: Vec<u8>,
}

impl RawImage {
    /// Wrap raw pixel bytes, rejecting a length that disagrees with the shape
    pub fn new(width: u32, height: u32, channels: u32, data: Vec<u8>) -> Result<Self, DecodeError> {
        let expected = Self::expected_len(width, height, channels);
        if data.len() as u64 != expected {
            return Err(DecodeError::ImageSize {
                width,
                height,
                channels,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn expected_len(width: u32, height: u32, channels: u32) -> u64 {
        width as u64 * height as u64 * channels as u64
    }

    pub fn from_rgb(img: &RgbImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            channels: 3,
            data: img.as_raw().clone(),
        }
    }

    /// Keep grayscale, RGB and RGBA layouts as-is; anything else becomes RGB8
    pub fn from_dynamic(img: &DynamicImage) -> Self {
        match img {
            DynamicImage::ImageLuma8(gray) => Self {
                width: gray.width(),
                height: gray.height(),
                channels: 1,
                data: gray.as_raw().clone(),
            },
            DynamicImage::ImageRgb8(rgb) => Self::from_rgb(rgb),
            DynamicImage::ImageRgba8(rgba) => Self {
                width: rgba.width(),
                height: rgba.height(),
                channels: 4,
                data: rgba.as_raw().clone(),
            },
            other => Self::from_rgb(&other.to_rgb8()),
        }
    }

    /// Convert back into an `image` buffer; `None` for unsupported channel counts
    pub fn to_dynamic_image(&self) -> Option<DynamicImage> {
        let data = self.data.clone();
        match self.channels {
            1 => GrayImage::from_raw(self.width, self.height, data).map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(self.width, self.height, data).map(DynamicImage::ImageRgb8),
            4 => RgbaImage::from_raw(self.width, self.height, data).map(DynamicImage::ImageRgba8),
            _ => None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl fmt::Debug for RawImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// Wall-clock seconds since the Unix epoch
pub fn seconds_since_epoch() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
