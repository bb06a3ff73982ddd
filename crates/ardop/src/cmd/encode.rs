use std::fs::File;
use std::io::{self, Write};

use ardop_frame::{FrameConfig, FrameWriter, Mode};

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let text = args.command.join(" ");
    let config = FrameConfig::new(Mode::from(args.mode));

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path)
                .map_err(|err| io_error(&format!("failed creating {}", path.display()), err))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    let mut writer = FrameWriter::with_config(sink, config);
    writer
        .send(&text)
        .map_err(|err| frame_error("encode failed", err))?;
    tracing::debug!(mode = %writer.mode(), command = %text, "command encoded");
    Ok(SUCCESS)
}
