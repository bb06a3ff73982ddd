use std::path::PathBuf;

use ardop_frame::{FrameError, Mode, Port};
use clap::{Args, Subcommand, ValueEnum};

use crate::exit::{frame_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod monitor;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode TNC frames from a capture file or stdin.
    Decode(DecodeArgs),
    /// Encode one host command to stdout or a file.
    Encode(EncodeArgs),
    /// Connect to a TNC over TCP, send commands and print what comes back.
    Monitor(MonitorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Serial,
    Tcp,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Serial => Mode::Serial,
            ModeArg::Tcp => Mode::Tcp,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PortArg {
    Command,
    Data,
}

impl From<PortArg> for Port {
    fn from(arg: PortArg) -> Self {
        match arg {
            PortArg::Command => Port::Command,
            PortArg::Data => Port::Data,
        }
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file to read. Default: stdin.
    pub input: Option<PathBuf>,
    /// Transport framing of the capture.
    #[arg(long, value_enum, default_value = "serial", env = "ARDOP_MODE")]
    pub mode: ModeArg,
    /// Socket the capture came from (TCP mode only).
    #[arg(long, value_enum, default_value = "command")]
    pub port: PortArg,
    /// Stop after N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Stop at the first bad frame instead of skipping it.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Command words, joined with single spaces.
    #[arg(required = true, num_args = 1..)]
    pub command: Vec<String>,
    /// Transport framing to produce.
    #[arg(long, value_enum, default_value = "serial", env = "ARDOP_MODE")]
    pub mode: ModeArg,
    /// Write to this file instead of stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// TNC command socket address (host:port).
    pub addr: String,
    /// TNC data socket address. Default: command port + 1.
    #[arg(long)]
    pub data_addr: Option<String>,
    /// Do not open the data socket.
    #[arg(long, conflicts_with = "data_addr")]
    pub no_data: bool,
    /// Command to send after connecting (repeatable).
    #[arg(long = "send", value_name = "COMMAND")]
    pub commands: Vec<String>,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Connect and write timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// What a frame loop should do after a failed read.
pub(crate) enum ReadDisposition {
    /// The stream ended cleanly.
    Closed,
    /// A bad frame was dropped; keep reading.
    Skip,
    Fatal(CliError),
}

pub(crate) fn classify_read_error(err: FrameError, strict: bool) -> ReadDisposition {
    match err {
        FrameError::ConnectionClosed => ReadDisposition::Closed,
        err if err.is_recoverable() && !strict => {
            tracing::warn!(error = %err, "skipping bad frame");
            ReadDisposition::Skip
        }
        err => ReadDisposition::Fatal(frame_error("read failed", err)),
    }
}
