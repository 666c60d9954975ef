//! Request/reply loops for both peers
//!
//! Both sides are strictly synchronous: every send is matched by exactly one
//! blocking receive before the next send.

pub mod board;
pub mod host;

pub use board::{BoardSession, BoardState};
pub use host::{HostSession, MissingImage, ReplySummary};
