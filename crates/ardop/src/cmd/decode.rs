use std::fs::File;
use std::io::{self, BufRead, BufReader};

use ardop_frame::{FrameConfig, FrameReader, Mode, Port};

use crate::cmd::{classify_read_error, DecodeArgs, ReadDisposition};
use crate::exit::{io_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let (input, source): (Box<dyn BufRead>, String) = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
            (Box::new(BufReader::new(file)), path.display().to_string())
        }
        None => (Box::new(io::stdin().lock()), "stdin".to_string()),
    };

    let mode = Mode::from(args.mode);
    let port = match mode {
        Mode::Serial => Port::Tagged,
        Mode::Tcp => Port::from(args.port),
    };
    let mut reader = FrameReader::with_config(input, FrameConfig::new(mode));

    let mut printed = 0usize;
    let mut skipped = 0usize;
    loop {
        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
        match reader.read_from(port) {
            Ok(frame) => {
                print_frame(&frame, &source, format);
                printed += 1;
            }
            Err(err) => match classify_read_error(err, args.strict) {
                ReadDisposition::Closed => break,
                ReadDisposition::Skip => skipped += 1,
                ReadDisposition::Fatal(err) => return Err(err),
            },
        }
    }

    tracing::info!(%mode, frames = printed, skipped, "decode finished");
    if skipped > 0 {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}
