//! `tokio_util` codec for async host links.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::checksum::{Checksum, Crc16};
use crate::codec::{decode_frame, encode_command, FrameConfig, Port};
use crate::error::FrameError;
use crate::frame::{CommandFrame, Frame};
use crate::mode::Mode;

/// Decodes TNC frames and encodes host commands for `Framed` streams.
#[derive(Debug, Clone)]
pub struct TncCodec<C = Crc16> {
    mode: Mode,
    port: Port,
    checksum: C,
}

impl TncCodec {
    /// Codec for a link in `mode`; TCP links need [`TncCodec::with_port`].
    pub fn new(mode: Mode) -> Self {
        Self::with_checksum(mode, Port::Tagged, Crc16)
    }

    /// Codec for one socket of a TCP host link.
    pub fn with_port(config: &FrameConfig, port: Port) -> Self {
        Self::with_checksum(config.mode, port, Crc16)
    }
}

impl<C: Checksum> TncCodec<C> {
    pub fn with_checksum(mode: Mode, port: Port, checksum: C) -> Self {
        Self {
            mode,
            port,
            checksum,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn port(&self) -> Port {
        self.port
    }
}

impl<C: Checksum> Decoder for TncCodec<C> {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src, self.mode, self.port, &self.checksum)
    }
}

impl<C: Checksum> Encoder<&str> for TncCodec<C> {
    type Error = FrameError;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_command(item, self.mode, &self.checksum, dst)
    }
}

impl<C: Checksum> Encoder<CommandFrame> for TncCodec<C> {
    type Error = FrameError;

    fn encode(&mut self, item: CommandFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_command(item.text(), self.mode, &self.checksum, dst)
    }
}
