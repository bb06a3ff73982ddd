use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::net::TcpStream;

use crate::checksum::{Checksum, Crc16};
use crate::codec::{command_from_raw, data_from_block, verify_checksum, FrameConfig, Port};
use crate::error::{FrameError, Result};
use crate::frame::{
    CommandFrame, DataFrame, Frame, CHECKSUM_SIZE, COMMAND_TYPE, DATA_TYPE, ESCAPE_MARKER,
    ESCAPE_SEPARATOR, LENGTH_SIZE, TERMINATOR,
};
use crate::mode::Mode;

/// Read one frame whose leading type byte has already been consumed.
///
/// `frame_type` is `c` for a command line, `d` for a data block, or (on
/// serial links) `*` followed on the stream by the real type byte and a
/// separator. Only one level of escape is unwrapped.
///
/// Serial links verify the trailing CRC-16; a mismatch returns
/// [`FrameError::ChecksumMismatch`] with the whole frame consumed.
pub fn read_frame_of_type<R, C>(
    frame_type: u8,
    reader: &mut R,
    mode: Mode,
    checksum: &C,
) -> Result<Frame>
where
    R: BufRead + ?Sized,
    C: Checksum + ?Sized,
{
    let frame_type = unwrap_escape(frame_type, reader, mode)?;
    let frame = match frame_type {
        COMMAND_TYPE => Frame::Command(read_command_body(reader, mode, checksum)?),
        DATA_TYPE => Frame::Data(read_data_body(reader, mode, checksum)?),
        other => return Err(FrameError::UnknownFrameType(other)),
    };
    tracing::trace!(frame_type = %char::from(frame_type), %mode, "frame read");
    Ok(frame)
}

fn unwrap_escape<R>(frame_type: u8, reader: &mut R, mode: Mode) -> Result<u8>
where
    R: BufRead + ?Sized,
{
    if frame_type != ESCAPE_MARKER || !mode.has_checksum() {
        return Ok(frame_type);
    }

    let mut escaped = [0u8; 2];
    read_full(reader, &mut escaped)?;
    let [real_type, separator] = escaped;
    if separator != ESCAPE_SEPARATOR {
        tracing::debug!(separator, "unexpected escape separator, discarded");
    }
    if real_type == ESCAPE_MARKER {
        return Err(FrameError::NestedEscape);
    }
    tracing::debug!(frame_type = %char::from(real_type), "escaped frame");
    Ok(real_type)
}

fn read_command_body<R, C>(reader: &mut R, mode: Mode, checksum: &C) -> Result<CommandFrame>
where
    R: BufRead + ?Sized,
    C: Checksum + ?Sized,
{
    let mut raw = Vec::new();
    reader.read_until(TERMINATOR, &mut raw)?;
    if raw.last() != Some(&TERMINATOR) {
        return Err(FrameError::Io(ErrorKind::UnexpectedEof.into()));
    }

    if mode.has_checksum() {
        let received = read_checksum(reader)?;
        verify_checksum(checksum, &raw, received)?;
    }
    command_from_raw(&raw)
}

fn read_data_body<R, C>(reader: &mut R, mode: Mode, checksum: &C) -> Result<DataFrame>
where
    R: BufRead + ?Sized,
    C: Checksum + ?Sized,
{
    // The length field counts everything after itself but stays part of the block.
    let mut header = [0u8; LENGTH_SIZE];
    read_full(reader, &mut header)?;
    let len = u16::from_be_bytes(header) as usize;

    let mut block = vec![0u8; LENGTH_SIZE + len];
    block[..LENGTH_SIZE].copy_from_slice(&header);
    read_full(reader, &mut block[LENGTH_SIZE..])?;

    let received = if mode.has_checksum() {
        Some(read_checksum(reader)?)
    } else {
        None
    };

    let frame = data_from_block(&block)?;
    // Data checksums cover tag and payload only. A peer that also sums the
    // two length bytes fails here with ChecksumMismatch.
    if let Some(received) = received {
        verify_checksum(checksum, &block[LENGTH_SIZE..], received)?;
    }
    Ok(frame)
}

fn read_checksum<R: Read + ?Sized>(reader: &mut R) -> Result<u16> {
    let mut sum = [0u8; CHECKSUM_SIZE];
    read_full(reader, &mut sum)?;
    Ok(u16::from_be_bytes(sum))
}

/// Fill `buf` completely, retrying short and interrupted reads.
///
/// There is no bound on how long this waits; a stalled peer stalls the call
/// until the transport times out or is closed.
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(FrameError::Io(ErrorKind::UnexpectedEof.into())),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}

/// Reads frames from a buffered TNC stream in a fixed transport mode.
pub struct FrameReader<R, C = Crc16> {
    inner: R,
    checksum: C,
    config: FrameConfig,
}

impl<R: BufRead> FrameReader<R> {
    /// Create a reader for `mode` with the default CRC-16.
    pub fn new(inner: R, mode: Mode) -> Self {
        Self::with_config(inner, FrameConfig::new(mode))
    }

    /// Create a reader with explicit configuration.
    pub fn with_config(inner: R, config: FrameConfig) -> Self {
        Self::with_checksum(inner, config, Crc16)
    }
}

impl<R: BufRead, C: Checksum> FrameReader<R, C> {
    /// Create a reader that verifies frames with a custom checksum.
    pub fn with_checksum(inner: R, config: FrameConfig, checksum: C) -> Self {
        Self {
            inner,
            checksum,
            config,
        }
    }

    /// Read the next frame, taking its type byte from the stream.
    ///
    /// This is how a serial link is read. Returns
    /// `Err(FrameError::ConnectionClosed)` on EOF before a type byte.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let frame_type = self.read_type_byte()?;
        self.read_frame_of_type(frame_type)
    }

    /// Read a frame whose type byte the caller already consumed.
    pub fn read_frame_of_type(&mut self, frame_type: u8) -> Result<Frame> {
        read_frame_of_type(frame_type, &mut self.inner, self.config.mode, &self.checksum)
    }

    /// Read a frame from a stream whose framing is described by `port`.
    pub fn read_from(&mut self, port: Port) -> Result<Frame> {
        match port {
            Port::Tagged => self.read_frame(),
            Port::Command => self.read_command().map(Frame::Command),
            Port::Data => self.read_data().map(Frame::Data),
        }
    }

    /// Read one command line, as sent on a TCP command socket.
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` on EOF before the line.
    pub fn read_command(&mut self) -> Result<CommandFrame> {
        self.peek_byte()?;
        let frame = read_command_body(&mut self.inner, self.config.mode, &self.checksum)?;
        tracing::trace!(mode = %self.config.mode, "command line read");
        Ok(frame)
    }

    /// Read one data block, as sent on a TCP data socket.
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` on EOF before the block.
    pub fn read_data(&mut self) -> Result<DataFrame> {
        self.peek_byte()?;
        let frame = read_data_body(&mut self.inner, self.config.mode, &self.checksum)?;
        tracing::trace!(mode = %self.config.mode, tag = %frame.tag_str(), "data block read");
        Ok(frame)
    }

    fn read_type_byte(&mut self) -> Result<u8> {
        let byte = self.peek_byte()?;
        self.inner.consume(1);
        Ok(byte)
    }

    fn peek_byte(&mut self) -> Result<u8> {
        loop {
            match self.inner.fill_buf() {
                Ok(buf) => return buf.first().copied().ok_or(FrameError::ConnectionClosed),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<BufReader<TcpStream>> {
    /// Create a reader over a TCP stream and apply the read timeout from config.
    pub fn from_tcp(stream: TcpStream, config: FrameConfig) -> Result<Self> {
        stream.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(BufReader::new(stream), config))
    }
}
