//! ARDOP TNC host-link framing.
//!
//! The framing itself lives in [`frame`]; this crate also ships the `ardop`
//! inspection CLI (behind the `cli` feature) for decoding captured streams,
//! encoding host commands and monitoring a TNC over TCP.

/// Re-export frame types.
pub mod frame {
    pub use ardop_frame::*;
}

pub use ardop_frame::write_command;
