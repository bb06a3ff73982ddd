//! Host link transport modes.

use std::fmt;
use std::str::FromStr;

/// The transport a host link runs over.
///
/// Every read and write on one connection must use the same mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Serial-like byte stream: `C:` command prefix, `*` escapes and CRC-16
    /// trailers on every frame.
    #[default]
    Serial,
    /// TCP socket: plain frames, no prefix, no checksum.
    Tcp,
}

impl Mode {
    /// Returns true for [`Mode::Tcp`].
    pub fn is_tcp(self) -> bool {
        matches!(self, Mode::Tcp)
    }

    /// Whether frames in this mode carry a checksum trailer.
    pub fn has_checksum(self) -> bool {
        !self.is_tcp()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Serial => "serial",
            Mode::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "serial" => Ok(Mode::Serial),
            "tcp" => Ok(Mode::Tcp),
            other => Err(format!("unknown mode {other:?} (expected serial or tcp)")),
        }
    }
}
