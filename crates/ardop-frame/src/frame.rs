//! Typed TNC frames.

use std::fmt;

use bytes::Bytes;

use crate::control::ControlParser;
use crate::error::Result;
use crate::ident::{decode_identity, Identity};

/// Leading byte of a command (text) frame.
pub const COMMAND_TYPE: u8 = b'c';

/// Leading byte of a data (length-prefixed) frame.
pub const DATA_TYPE: u8 = b'd';

/// Leading byte announcing `[real type][separator]` on a serial link.
pub const ESCAPE_MARKER: u8 = b'*';

/// Separator expected after the real type byte of an escape sequence.
pub const ESCAPE_SEPARATOR: u8 = b';';

/// Prefix written before host commands on a serial link.
pub const COMMAND_PREFIX: &[u8; 2] = b"C:";

/// Line terminator for command frames.
pub const TERMINATOR: u8 = b'\r';

/// Size of the big-endian block length field of a data frame.
pub const LENGTH_SIZE: usize = 2;

/// Size of the ASCII type tag of a data frame.
pub const TAG_SIZE: usize = 3;

/// Size of the big-endian checksum trailer on a serial link.
pub const CHECKSUM_SIZE: usize = 2;

/// A single frame read from the TNC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A control command or response line.
    Command(CommandFrame),
    /// A tagged binary block.
    Data(DataFrame),
}

impl Frame {
    pub fn as_command(&self) -> Option<&CommandFrame> {
        match self {
            Frame::Command(cmd) => Some(cmd),
            Frame::Data(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&DataFrame> {
        match self {
            Frame::Data(data) => Some(data),
            Frame::Command(_) => None,
        }
    }

    /// The leading type byte this frame is read under.
    pub fn type_byte(&self) -> u8 {
        match self {
            Frame::Command(_) => COMMAND_TYPE,
            Frame::Data(_) => DATA_TYPE,
        }
    }
}

impl From<CommandFrame> for Frame {
    fn from(frame: CommandFrame) -> Self {
        Frame::Command(frame)
    }
}

impl From<DataFrame> for Frame {
    fn from(frame: DataFrame) -> Self {
        Frame::Data(frame)
    }
}

/// One line of control text, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandFrame(String);

impl CommandFrame {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    pub fn into_text(self) -> String {
        self.0
    }

    /// Hand the line to a control-message parser.
    pub fn parsed<P: ControlParser>(&self, parser: &P) -> P::Message {
        parser.parse(&self.0)
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CommandFrame {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Semantic kind of a data frame, named by its 3-character tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    /// Connected-mode (ARQ) payload.
    Arq,
    /// Broadcast (FEC) payload.
    Fec,
    /// Frame received with errors.
    Err,
    /// Station identification.
    Idf,
}

impl DataKind {
    pub const ALL: [DataKind; 4] = [DataKind::Arq, DataKind::Fec, DataKind::Err, DataKind::Idf];

    pub fn tag(self) -> &'static [u8; TAG_SIZE] {
        match self {
            DataKind::Arq => b"ARQ",
            DataKind::Fec => b"FEC",
            DataKind::Err => b"ERR",
            DataKind::Idf => b"IDF",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataKind::Arq => "ARQ",
            DataKind::Fec => "FEC",
            DataKind::Err => "ERR",
            DataKind::Idf => "IDF",
        }
    }

    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        DataKind::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tagged data block.
///
/// Tags outside the known vocabulary are kept verbatim; [`DataFrame::kind`]
/// returns `None` for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    tag: [u8; TAG_SIZE],
    payload: Bytes,
}

impl DataFrame {
    pub fn new(kind: DataKind, payload: impl Into<Bytes>) -> Self {
        Self::with_tag(*kind.tag(), payload)
    }

    pub fn with_tag(tag: [u8; TAG_SIZE], payload: impl Into<Bytes>) -> Self {
        Self {
            tag,
            payload: payload.into(),
        }
    }

    pub fn tag(&self) -> &[u8; TAG_SIZE] {
        &self.tag
    }

    /// The tag as text, lossily decoded for display.
    pub fn tag_str(&self) -> String {
        String::from_utf8_lossy(&self.tag).into_owned()
    }

    pub fn kind(&self) -> Option<DataKind> {
        DataKind::from_tag(&self.tag)
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_bytes(&self) -> Bytes {
        self.payload.clone()
    }

    pub fn arq_frame(&self) -> bool {
        self.kind() == Some(DataKind::Arq)
    }

    pub fn fec_frame(&self) -> bool {
        self.kind() == Some(DataKind::Fec)
    }

    pub fn err_frame(&self) -> bool {
        self.kind() == Some(DataKind::Err)
    }

    pub fn id_frame(&self) -> bool {
        self.kind() == Some(DataKind::Idf)
    }

    /// Decode an IDF frame into callsign and locator.
    pub fn identity(&self) -> Result<Identity> {
        decode_identity(self).map(|(callsign, locator)| Identity { callsign, locator })
    }

    /// Block length as announced on the wire (tag + payload).
    pub fn block_len(&self) -> usize {
        TAG_SIZE + self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_kind_answers_only_its_own_predicate() {
        for kind in DataKind::ALL {
            let frame = DataFrame::new(kind, Bytes::new());
            let answers = [
                frame.arq_frame(),
                frame.fec_frame(),
                frame.err_frame(),
                frame.id_frame(),
            ];
            let expected: Vec<bool> = DataKind::ALL.iter().map(|k| *k == kind).collect();
            assert_eq!(answers.to_vec(), expected, "predicates for {kind}");
        }
    }

    #[test]
    fn unknown_tag_is_kept_but_matches_nothing() {
        let frame = DataFrame::with_tag(*b"XYZ", &b"raw"[..]);
        assert_eq!(frame.kind(), None);
        assert_eq!(frame.tag_str(), "XYZ");
        assert!(!frame.arq_frame() && !frame.fec_frame() && !frame.err_frame() && !frame.id_frame());
    }

    #[test]
    fn tag_lookup_round_trips() {
        for kind in DataKind::ALL {
            assert_eq!(DataKind::from_tag(kind.as_str().as_bytes()), Some(kind));
        }
        assert_eq!(DataKind::from_tag(b"arq"), None);
    }

    #[test]
    fn frame_accessors() {
        let cmd: Frame = CommandFrame::new("BUFFER 0").into();
        assert_eq!(cmd.as_command().map(CommandFrame::text), Some("BUFFER 0"));
        assert!(cmd.as_data().is_none());
        assert_eq!(cmd.type_byte(), COMMAND_TYPE);

        let data: Frame = DataFrame::new(DataKind::Fec, &b"hi"[..]).into();
        assert_eq!(data.as_data().map(DataFrame::block_len), Some(5));
        assert_eq!(data.type_byte(), DATA_TYPE);
    }
}
