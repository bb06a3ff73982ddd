//! Frame reader and writer for the ARDOP TNC host link.
//!
//! A TNC talks to its host over one of two transports:
//! - a serial-like byte stream, where every frame starts with a type byte
//!   (`c` command, `d` data, `*` escape) and ends in a CRC-16 trailer, and host
//!   commands carry a `C:` prefix;
//! - a TCP socket pair, where command lines and data blocks travel bare on
//!   separate sockets.
//!
//! Command frames are `\r`-terminated text lines. Data frames are a
//! big-endian 16-bit length, a 3-character tag (`ARQ`, `FEC`, `ERR`, `IDF`)
//! and the payload.
//!
//! The checksum and control-message parser are pluggable through
//! [`Checksum`] and [`ControlParser`].

pub mod checksum;
pub mod codec;
pub mod control;
pub mod error;
pub mod frame;
pub mod ident;
pub mod mode;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use checksum::{Checksum, Crc16};
pub use codec::{decode_frame, encode_command, encode_frame, FrameConfig, Port, MAX_DATA_PAYLOAD};
pub use control::{ControlMessage, ControlParser, DefaultParser};
pub use error::{FrameError, Result};
pub use frame::{
    CommandFrame, DataFrame, DataKind, Frame, COMMAND_TYPE, DATA_TYPE, ESCAPE_MARKER,
};
pub use ident::{decode_identity, Identity};
pub use mode::Mode;
pub use reader::{read_frame_of_type, FrameReader};
pub use writer::{write_command, FrameWriter};

#[cfg(feature = "async")]
pub use async_codec::TncCodec;
