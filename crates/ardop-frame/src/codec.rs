use std::time::Duration;

use bytes::{Buf, BufMut, BytesMut};

use crate::checksum::Checksum;
use crate::error::{FrameError, Result};
use crate::frame::{
    CommandFrame, DataFrame, Frame, CHECKSUM_SIZE, COMMAND_PREFIX, COMMAND_TYPE, DATA_TYPE,
    ESCAPE_MARKER, LENGTH_SIZE, TAG_SIZE, TERMINATOR,
};
use crate::mode::Mode;

/// Largest payload a data block can carry (16-bit length minus the tag).
pub const MAX_DATA_PAYLOAD: usize = u16::MAX as usize - TAG_SIZE;

/// Where the type of the next frame comes from.
///
/// On a serial link every frame starts with its type byte. A TCP host link
/// splits commands and data over two sockets, so the socket implies the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Port {
    /// The type byte is the first byte of each frame.
    #[default]
    Tagged,
    /// Every frame is a command line.
    Command,
    /// Every frame is a length-prefixed data block.
    Data,
}

impl Port {
    /// The type byte this port implies, if any.
    pub fn implied_type(self) -> Option<u8> {
        match self {
            Port::Tagged => None,
            Port::Command => Some(COMMAND_TYPE),
            Port::Data => Some(DATA_TYPE),
        }
    }
}

/// Per-connection framing configuration.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Transport mode. Default: serial.
    pub mode: Mode,
    /// Read timeout for blocking transports.
    pub read_timeout: Option<Duration>,
    /// Write timeout for blocking transports.
    pub write_timeout: Option<Duration>,
}

impl FrameConfig {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Serial,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Encode a host command.
///
/// Wire format:
/// ```text
/// serial: "C:" <text> '\r' <crc16 BE over text + '\r'>
/// tcp:         <text> '\r'
/// ```
pub fn encode_command<C: Checksum + ?Sized>(
    text: &str,
    mode: Mode,
    checksum: &C,
    dst: &mut BytesMut,
) -> Result<()> {
    if text.as_bytes().contains(&TERMINATOR) {
        return Err(FrameError::InvalidCommand);
    }

    dst.reserve(COMMAND_PREFIX.len() + text.len() + 1 + CHECKSUM_SIZE);
    if mode.has_checksum() {
        dst.put_slice(COMMAND_PREFIX);
    }
    let start = dst.len();
    dst.put_slice(text.as_bytes());
    dst.put_u8(TERMINATOR);
    if mode.has_checksum() {
        let sum = checksum.checksum(&dst[start..]);
        dst.put_u16(sum);
    }
    Ok(())
}

/// Encode a frame the way a TNC sends it to the host.
///
/// Serial links get the type byte and checksum trailer; TCP frames are bare
/// since the socket implies the type. Useful for loopback peers and fixtures.
pub fn encode_frame<C: Checksum + ?Sized>(
    frame: &Frame,
    mode: Mode,
    checksum: &C,
    dst: &mut BytesMut,
) -> Result<()> {
    match frame {
        Frame::Command(cmd) => {
            if cmd.text().as_bytes().contains(&TERMINATOR) {
                return Err(FrameError::InvalidCommand);
            }
            if mode.has_checksum() {
                dst.put_u8(COMMAND_TYPE);
            }
            let start = dst.len();
            dst.put_slice(cmd.text().as_bytes());
            dst.put_u8(TERMINATOR);
            if mode.has_checksum() {
                let sum = checksum.checksum(&dst[start..]);
                dst.put_u16(sum);
            }
        }
        Frame::Data(data) => {
            if data.payload().len() > MAX_DATA_PAYLOAD {
                return Err(FrameError::PayloadTooLarge {
                    size: data.payload().len(),
                    max: MAX_DATA_PAYLOAD,
                });
            }
            if mode.has_checksum() {
                dst.put_u8(DATA_TYPE);
            }
            dst.put_u16(data.block_len() as u16);
            let start = dst.len();
            dst.put_slice(data.tag());
            dst.put_slice(data.payload());
            if mode.has_checksum() {
                let sum = checksum.checksum(&dst[start..]);
                dst.put_u16(sum);
            }
        }
    }
    Ok(())
}

/// Decode one frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't hold a complete frame yet. On
/// success the frame bytes are consumed. Checksum, length and text errors
/// consume the offending frame and an unknown type consumes its type byte, so
/// the next call starts past the bad data.
pub fn decode_frame<C: Checksum + ?Sized>(
    src: &mut BytesMut,
    mode: Mode,
    port: Port,
    checksum: &C,
) -> Result<Option<Frame>> {
    let mut pos = 0usize;
    let mut frame_type = match port.implied_type() {
        Some(implied) => implied,
        None => match src.first() {
            Some(&b) => {
                pos = 1;
                b
            }
            None => return Ok(None),
        },
    };

    if frame_type == ESCAPE_MARKER && port == Port::Tagged && mode.has_checksum() {
        if src.len() < pos + 2 {
            return Ok(None);
        }
        frame_type = src[pos];
        pos += 2;
        if frame_type == ESCAPE_MARKER {
            src.advance(pos);
            return Err(FrameError::NestedEscape);
        }
    }

    let body_start = pos;
    let body_end = match frame_type {
        COMMAND_TYPE => match src[pos..].iter().position(|&b| b == TERMINATOR) {
            Some(idx) => pos + idx + 1,
            None => return Ok(None),
        },
        DATA_TYPE => {
            if src.len() < pos + LENGTH_SIZE {
                return Ok(None);
            }
            let len = u16::from_be_bytes([src[pos], src[pos + 1]]) as usize;
            pos + LENGTH_SIZE + len
        }
        other => {
            src.advance(pos.max(1));
            return Err(FrameError::UnknownFrameType(other));
        }
    };

    let trailer = if mode.has_checksum() { CHECKSUM_SIZE } else { 0 };
    let total = body_end + trailer;
    if src.len() < total {
        return Ok(None);
    }

    let frame_bytes = src.split_to(total);
    let body = &frame_bytes[body_start..body_end];
    let frame = if frame_type == COMMAND_TYPE {
        if mode.has_checksum() {
            verify_checksum(checksum, body, read_trailer(&frame_bytes[body_end..]))?;
        }
        Frame::Command(command_from_raw(body)?)
    } else {
        let data = data_from_block(body)?;
        // Tag and payload only, as in `read_data_body`; the length field is not summed.
        if mode.has_checksum() {
            verify_checksum(
                checksum,
                &body[LENGTH_SIZE..],
                read_trailer(&frame_bytes[body_end..]),
            )?;
        }
        Frame::Data(data)
    };
    Ok(Some(frame))
}

fn read_trailer(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

/// Compare a received checksum with the one computed over `input`.
pub(crate) fn verify_checksum<C: Checksum + ?Sized>(
    checksum: &C,
    input: &[u8],
    received: u16,
) -> Result<()> {
    let expected = checksum.checksum(input);
    if expected != received {
        tracing::warn!(
            expected = format_args!("{expected:#06x}"),
            actual = format_args!("{received:#06x}"),
            len = input.len(),
            "frame checksum mismatch"
        );
        return Err(FrameError::ChecksumMismatch {
            expected,
            actual: received,
        });
    }
    Ok(())
}

/// Build a command frame from a raw line that still ends in its terminator.
pub(crate) fn command_from_raw(raw: &[u8]) -> Result<CommandFrame> {
    let line = raw.strip_suffix(&[TERMINATOR]).unwrap_or(raw);
    let text = std::str::from_utf8(line).map_err(|_| FrameError::InvalidText)?;
    Ok(CommandFrame::new(text))
}

/// Split a full data block (length field included) into tag and payload.
pub(crate) fn data_from_block(block: &[u8]) -> Result<DataFrame> {
    if block.len() < LENGTH_SIZE + TAG_SIZE {
        return Err(FrameError::BlockTooShort {
            len: block.len().saturating_sub(LENGTH_SIZE),
        });
    }
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&block[LENGTH_SIZE..LENGTH_SIZE + TAG_SIZE]);
    let payload = block[LENGTH_SIZE + TAG_SIZE..].to_vec();
    Ok(DataFrame::with_tag(tag, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::Crc16;
    use crate::frame::DataKind;

    fn decode(src: &mut BytesMut, mode: Mode, port: Port) -> Result<Option<Frame>> {
        decode_frame(src, mode, port, &Crc16)
    }

    #[test]
    fn serial_command_has_prefix_and_checksum() {
        let mut buf = BytesMut::new();
        encode_command("LISTEN TRUE", Mode::Serial, &Crc16, &mut buf).unwrap();

        assert_eq!(&buf[..2], b"C:");
        assert_eq!(&buf[2..14], b"LISTEN TRUE\r");
        let sum = Crc16::sum(b"LISTEN TRUE\r");
        assert_eq!(&buf[14..], &sum.to_be_bytes());
    }

    #[test]
    fn tcp_command_is_bare_line() {
        let mut buf = BytesMut::new();
        encode_command("LISTEN TRUE", Mode::Tcp, &Crc16, &mut buf).unwrap();
        assert_eq!(buf.as_ref(), b"LISTEN TRUE\r");
    }

    #[test]
    fn command_with_terminator_rejected() {
        let mut buf = BytesMut::new();
        let err = encode_command("A\rB", Mode::Tcp, &Crc16, &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::InvalidCommand));
        assert!(buf.is_empty());
    }

    #[test]
    fn serial_frames_roundtrip_through_buffer() {
        let frames = [
            Frame::from(CommandFrame::new("NEWSTATE IRS")),
            Frame::from(DataFrame::new(DataKind::Arq, &b"\x00\x01binary"[..])),
        ];
        let mut buf = BytesMut::new();
        for frame in &frames {
            encode_frame(frame, Mode::Serial, &Crc16, &mut buf).unwrap();
        }

        for expected in &frames {
            let frame = decode(&mut buf, Mode::Serial, Port::Tagged).unwrap().unwrap();
            assert_eq!(&frame, expected);
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn incomplete_frames_wait_for_more() {
        let mut full = BytesMut::new();
        let frame = Frame::from(DataFrame::new(DataKind::Fec, &b"payload"[..]));
        encode_frame(&frame, Mode::Serial, &Crc16, &mut full).unwrap();

        for cut in 0..full.len() {
            let mut partial = BytesMut::from(&full[..cut]);
            assert!(decode(&mut partial, Mode::Serial, Port::Tagged)
                .unwrap()
                .is_none());
            assert_eq!(partial.len(), cut, "nothing consumed at cut {cut}");
        }
    }

    #[test]
    fn tcp_ports_imply_the_type() {
        let mut cmd = BytesMut::from(&b"PTT TRUE\r"[..]);
        let frame = decode(&mut cmd, Mode::Tcp, Port::Command).unwrap().unwrap();
        assert_eq!(frame, Frame::from(CommandFrame::new("PTT TRUE")));

        let mut data = BytesMut::new();
        encode_frame(
            &Frame::from(DataFrame::new(DataKind::Idf, &b"LA5NTA:[JP20QE]"[..])),
            Mode::Tcp,
            &Crc16,
            &mut data,
        )
        .unwrap();
        assert_eq!(&data[..2], &[0, 18]);
        let frame = decode(&mut data, Mode::Tcp, Port::Data).unwrap().unwrap();
        assert!(frame.as_data().unwrap().id_frame());
    }

    #[test]
    fn escape_is_unwrapped_once() {
        let mut buf = BytesMut::from(&b"*c;BUSY TRUE\r"[..]);
        buf.put_u16(Crc16::sum(b"BUSY TRUE\r"));
        let frame = decode(&mut buf, Mode::Serial, Port::Tagged).unwrap().unwrap();
        assert_eq!(frame, Frame::from(CommandFrame::new("BUSY TRUE")));
        assert!(buf.is_empty());
    }

    #[test]
    fn nested_escape_rejected() {
        let mut buf = BytesMut::from(&b"**;c"[..]);
        let err = decode(&mut buf, Mode::Serial, Port::Tagged).unwrap_err();
        assert!(matches!(err, FrameError::NestedEscape));
        assert_eq!(buf.as_ref(), b"c");
    }

    #[test]
    fn checksum_mismatch_consumes_frame() {
        let mut buf = BytesMut::from(&b"cPENDING\r\x00\x00cOK\r"[..]);
        buf.put_u16(Crc16::sum(b"OK\r"));

        let err = decode(&mut buf, Mode::Serial, Port::Tagged).unwrap_err();
        assert!(matches!(err, FrameError::ChecksumMismatch { actual: 0, .. }));

        let next = decode(&mut buf, Mode::Serial, Port::Tagged).unwrap().unwrap();
        assert_eq!(next, Frame::from(CommandFrame::new("OK")));
    }

    #[test]
    fn unknown_type_consumes_one_byte() {
        let mut buf = BytesMut::from(&b"xcOK"[..]);
        let err = decode(&mut buf, Mode::Serial, Port::Tagged).unwrap_err();
        assert!(matches!(err, FrameError::UnknownFrameType(b'x')));
        assert_eq!(buf.as_ref(), b"cOK");
    }

    #[test]
    fn short_block_rejected() {
        let mut buf = BytesMut::from(&b"\x00\x02AR"[..]);
        let err = decode(&mut buf, Mode::Tcp, Port::Data).unwrap_err();
        assert!(matches!(err, FrameError::BlockTooShort { len: 2 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn oversized_payload_rejected() {
        let frame = Frame::from(DataFrame::new(DataKind::Arq, vec![0u8; MAX_DATA_PAYLOAD + 1]));
        let mut buf = BytesMut::new();
        let err = encode_frame(&frame, Mode::Tcp, &Crc16, &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn config_defaults_to_serial_without_timeouts() {
        let cfg = FrameConfig::default();
        assert_eq!(cfg.mode, Mode::Serial);
        assert!(cfg.read_timeout.is_none() && cfg.write_timeout.is_none());
        assert_eq!(FrameConfig::new(Mode::Tcp).mode, Mode::Tcp);
    }
}
