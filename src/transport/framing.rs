//! Length-prefixed framing over any byte stream.
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────┐
//! │ Length (8 bytes)     │ Payload (variable)       │
//! │ u64, native-endian   │ Protobuf DetectionMessage│
//! └──────────────────────┴──────────────────────────┘
//! ```
//!
//! Both directions use the same framing and the same [`MAX_FRAME_LEN`] cap.
//! Reads and writes loop over short transfers until the whole frame has
//! moved, retrying on `Interrupted`.

use crate::error::ReceiveError;
use std::io::{self, ErrorKind, Read, Write};

/// Size of the length prefix in bytes
pub const LENGTH_PREFIX_LEN: usize = std::mem::size_of::<u64>();

/// Largest payload sent or accepted (64 MiB)
pub const MAX_FRAME_LEN: u64 = 64 * 1024 * 1024;

/// Write one frame: length prefix followed by `payload`
///
/// `scratch` is reused between calls to avoid an allocation per frame.
pub fn write_frame<W: Write + ?Sized>(
    writer: &mut W,
    payload: &[u8],
    scratch: &mut Vec<u8>,
) -> io::Result<()> {
    if payload.len() as u64 > MAX_FRAME_LEN {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            format!(
                "frame of {} bytes exceeds the {} byte limit",
                payload.len(),
                MAX_FRAME_LEN
            ),
        ));
    }

    scratch.clear();
    scratch.reserve(LENGTH_PREFIX_LEN + payload.len());
    scratch.extend_from_slice(&(payload.len() as u64).to_ne_bytes());
    scratch.extend_from_slice(payload);

    let mut sent = 0;
    while sent < scratch.len() {
        match writer.write(&scratch[sent..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    format!("wrote {} of {} frame bytes", sent, scratch.len()),
                ));
            }
            Ok(n) => sent += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    writer.flush()
}

/// Read one frame into `buffer`, replacing its contents with the payload
pub fn read_frame<R: Read + ?Sized>(
    reader: &mut R,
    buffer: &mut Vec<u8>,
) -> Result<(), ReceiveError> {
    let mut len_buf = [0u8; LENGTH_PREFIX_LEN];
    read_full(reader, &mut len_buf)?;

    let len = u64::from_ne_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(ReceiveError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    buffer.clear();
    buffer.resize(len as usize, 0);
    read_full(reader, buffer)
}

/// Fill `buf` completely; end of stream means the peer closed
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<(), ReceiveError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => ReceiveError::PeerClosed,
        _ => ReceiveError::Io(e),
    })
}
