//! Framed TCP transport
//!
//! Turns a byte-stream socket into a sequence of whole messages.
//!
//! # Connection Lifecycle
//!
//! ```text
//! Board                                Host
//! Listener::bind(0.0.0.0:12345)
//! Listener::accept()  ◄──────────────  Connection::connect(board:12345)
//! receive() ◄──── [len][Request] ────  send()
//! send()    ───── [len][Reply]   ────► receive()
//! ...                                  ...
//! ```
//!
//! There is no retry or reconnection: any transport error is returned to
//! the session loop, which ends.

pub mod connection;
pub mod framing;

pub use connection::{Connection, Listener};
pub use framing::{LENGTH_PREFIX_LEN, MAX_FRAME_LEN, read_frame, write_frame};
