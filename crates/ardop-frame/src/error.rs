/// Errors that can occur while reading or writing TNC frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An I/O error occurred on the underlying stream (including premature EOF).
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a new frame began, or the sink accepted zero bytes.
    #[error("connection closed")]
    ConnectionClosed,

    /// The trailing CRC-16 does not match the frame contents.
    #[error("checksum mismatch (expected {expected:#06x}, got {actual:#06x})")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// The leading byte does not name a known frame type.
    #[error("unexpected frame type {:?}", char::from(*.0))]
    UnknownFrameType(u8),

    /// An escape marker was followed by another escape marker.
    #[error("nested escape marker")]
    NestedEscape,

    /// A data block too short to hold its 3-byte type tag.
    #[error("data block too short ({len} bytes, need at least 3)")]
    BlockTooShort { len: usize },

    /// A command line that is not valid UTF-8.
    #[error("command frame is not valid UTF-8")]
    InvalidText,

    /// A data payload too large for the 16-bit block length.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A command to be written contains the line terminator.
    #[error("command text must not contain a carriage return")]
    InvalidCommand,

    /// The frame does not carry the tag the operation requires.
    #[error("unexpected frame kind (expected {expected}, got {actual})")]
    UnexpectedFrameKind {
        expected: &'static str,
        actual: String,
    },

    /// The identification payload does not match `<callsign> [<locator>]`.
    #[error("unexpected ID format")]
    InvalidIdentity,
}

impl FrameError {
    /// Whether the stream is still usable after this error.
    ///
    /// Only I/O failures and closed connections are fatal; everything else is
    /// a protocol or content error the caller may skip past or resync from.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FrameError::Io(_) | FrameError::ConnectionClosed)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
