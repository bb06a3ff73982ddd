use std::fmt;
use std::io::{ErrorKind, Write};
use std::net::TcpStream;

use bytes::BytesMut;

use crate::checksum::{Checksum, Crc16};
use crate::codec::{encode_command, FrameConfig};
use crate::error::{FrameError, Result};
use crate::frame::CommandFrame;
use crate::mode::Mode;

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Render a host command and write it in the wire format for `mode`.
///
/// The command is terminated with a single `\r`. Serial links also get the
/// `C:` prefix and a CRC-16 trailer. Nothing is rolled back if the stream
/// fails part-way; treat any error as fatal to the connection.
pub fn write_command<W, C>(
    mode: Mode,
    writer: &mut W,
    checksum: &C,
    args: fmt::Arguments<'_>,
) -> Result<()>
where
    W: Write + ?Sized,
    C: Checksum + ?Sized,
{
    let text = match args.as_str() {
        Some(text) => std::borrow::Cow::Borrowed(text),
        None => std::borrow::Cow::Owned(args.to_string()),
    };
    let mut buf = BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY);
    encode_command(&text, mode, checksum, &mut buf)?;
    write_all(writer, &buf)?;
    flush(writer)?;
    tracing::trace!(%mode, command = %text, "command written");
    Ok(())
}

/// Format and write a host command with the default CRC-16.
///
/// ```
/// use ardop_frame::{write_command, Mode};
///
/// let mut wire = Vec::new();
/// write_command!(Mode::Tcp, &mut wire, "ARQCALL {} {}", "LA5NTA", 5).unwrap();
/// assert_eq!(wire, b"ARQCALL LA5NTA 5\r");
/// ```
#[macro_export]
macro_rules! write_command {
    ($mode:expr, $writer:expr, $($arg:tt)+) => {
        $crate::writer::write_command(
            $mode,
            $writer,
            &$crate::checksum::Crc16,
            ::std::format_args!($($arg)+),
        )
    };
}

fn write_all<W: Write + ?Sized>(writer: &mut W, buf: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < buf.len() {
        match writer.write(&buf[offset..]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}

fn flush<W: Write + ?Sized>(writer: &mut W) -> Result<()> {
    loop {
        match writer.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
}

/// Writes host commands to a TNC stream in a fixed transport mode.
pub struct FrameWriter<W, C = Crc16> {
    inner: W,
    checksum: C,
    buf: BytesMut,
    config: FrameConfig,
}

impl<W: Write> FrameWriter<W> {
    /// Create a writer for `mode` with the default CRC-16.
    pub fn new(inner: W, mode: Mode) -> Self {
        Self::with_config(inner, FrameConfig::new(mode))
    }

    /// Create a writer with explicit configuration.
    pub fn with_config(inner: W, config: FrameConfig) -> Self {
        Self::with_checksum(inner, config, Crc16)
    }
}

impl<W: Write, C: Checksum> FrameWriter<W, C> {
    /// Create a writer that signs commands with a custom checksum.
    pub fn with_checksum(inner: W, config: FrameConfig, checksum: C) -> Self {
        Self {
            inner,
            checksum,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and send one command line.
    pub fn send(&mut self, text: &str) -> Result<()> {
        self.buf.clear();
        encode_command(text, self.config.mode, &self.checksum, &mut self.buf)?;
        write_all(&mut self.inner, &self.buf)?;
        self.flush()?;
        tracing::trace!(mode = %self.config.mode, command = text, "command written");
        Ok(())
    }

    /// Format and send one command line.
    pub fn send_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<()> {
        match args.as_str() {
            Some(text) => self.send(text),
            None => self.send(&args.to_string()),
        }
    }

    /// Send a command frame.
    pub fn write_command(&mut self, frame: &CommandFrame) -> Result<()> {
        self.send(frame.text())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        flush(&mut self.inner)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<TcpStream> {
    /// Create a writer over a TCP stream and apply the write timeout from config.
    pub fn from_tcp(stream: TcpStream, config: FrameConfig) -> Result<Self> {
        stream.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(stream, config))
    }
}
