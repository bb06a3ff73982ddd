use std::io::BufRead;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ardop_frame::{FrameConfig, FrameReader, FrameWriter, Mode, Port};

use crate::cmd::{classify_read_error, MonitorArgs, ReadDisposition};
use crate::exit::{frame_error, io_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let config = FrameConfig {
        write_timeout: Some(timeout),
        ..FrameConfig::new(Mode::Tcp)
    };

    let command = connect(&args.addr, timeout)?;
    let data = if args.no_data {
        None
    } else {
        let addr = match &args.data_addr {
            Some(addr) => addr.clone(),
            None => data_addr_for(&command)?.to_string(),
        };
        Some(connect(&addr, timeout)?)
    };

    let link = Arc::new(Link::new(&command, data.as_ref())?);
    install_ctrlc_handler(Arc::clone(&link))?;

    let writer_stream = command
        .try_clone()
        .map_err(|err| io_error("failed cloning command socket", err))?;
    let mut writer = FrameWriter::from_tcp(writer_stream, config.clone())
        .map_err(|err| frame_error("command socket setup failed", err))?;
    for text in &args.commands {
        writer
            .send(text)
            .map_err(|err| frame_error("send failed", err))?;
        tracing::info!(command = %text, "sent");
    }

    let data_pump = match data {
        Some(stream) => {
            let reader = FrameReader::from_tcp(stream, config.clone())
                .map_err(|err| frame_error("data socket setup failed", err))?;
            let link = Arc::clone(&link);
            let count = args.count;
            Some(thread::spawn(move || {
                pump(reader, Port::Data, "data", format, count, &link)
            }))
        }
        None => None,
    };

    let reader = FrameReader::from_tcp(command, config)
        .map_err(|err| frame_error("command socket setup failed", err))?;
    let result = pump(reader, Port::Command, "command", format, args.count, &link);
    link.close();

    if let Some(handle) = data_pump {
        match handle.join() {
            Ok(data_result) => data_result?,
            Err(_) => return Err(CliError::new(INTERNAL, "data reader panicked")),
        }
    }
    result?;

    tracing::info!(frames = link.frames.load(Ordering::SeqCst), "monitor finished");
    Ok(SUCCESS)
}

/// The sockets of one TNC host link, shut down together.
struct Link {
    streams: Vec<TcpStream>,
    closing: AtomicBool,
    frames: AtomicUsize,
}

impl Link {
    fn new(command: &TcpStream, data: Option<&TcpStream>) -> CliResult<Self> {
        let streams = std::iter::once(command)
            .chain(data)
            .map(TcpStream::try_clone)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| io_error("failed cloning socket", err))?;
        Ok(Self {
            streams,
            closing: AtomicBool::new(false),
            frames: AtomicUsize::new(0),
        })
    }

    /// Close every socket; blocked readers then see EOF.
    fn close(&self) {
        self.closing.store(true, Ordering::SeqCst);
        for stream in &self.streams {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }
}

fn pump<R: BufRead>(
    mut reader: FrameReader<R>,
    port: Port,
    source: &str,
    format: OutputFormat,
    count: Option<usize>,
    link: &Link,
) -> CliResult<()> {
    loop {
        match reader.read_from(port) {
            Ok(frame) => {
                print_frame(&frame, source, format);
                let seen = link.frames.fetch_add(1, Ordering::SeqCst) + 1;
                if count.is_some_and(|count| seen >= count) {
                    link.close();
                    return Ok(());
                }
            }
            Err(err) => match classify_read_error(err, false) {
                ReadDisposition::Closed => return Ok(()),
                ReadDisposition::Skip => continue,
                ReadDisposition::Fatal(_) if link.is_closing() => return Ok(()),
                ReadDisposition::Fatal(err) => return Err(err),
            },
        }
    }
}

fn connect(addr: &str, timeout: Duration) -> CliResult<TcpStream> {
    let addrs: Vec<SocketAddr> = addr
        .to_socket_addrs()
        .map_err(|err| CliError::new(USAGE, format!("invalid address {addr}: {err}")))?
        .collect();

    let mut last_err = None;
    for candidate in addrs {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => {
                tracing::info!(addr = %candidate, "connected");
                return Ok(stream);
            }
            Err(err) => last_err = Some(err),
        }
    }
    match last_err {
        Some(err) => Err(io_error(&format!("connect to {addr} failed"), err)),
        None => Err(CliError::new(
            USAGE,
            format!("address {addr} did not resolve"),
        )),
    }
}

/// ARDOP TNCs listen for data on the port after the command port.
fn data_addr_for(command: &TcpStream) -> CliResult<SocketAddr> {
    let mut addr = command
        .peer_addr()
        .map_err(|err| io_error("failed reading peer address", err))?;
    let port = addr.port().checked_add(1).ok_or_else(|| {
        CliError::new(USAGE, "command port has no successor; pass --data-addr")
    })?;
    addr.set_port(port);
    Ok(addr)
}

fn install_ctrlc_handler(link: Arc<Link>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        link.close();
    })
    .map_err(|err| CliError::new(FAILURE, format!("signal handler setup failed: {err}")))
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn data_port_follows_command_port() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let local = listener.local_addr().unwrap();
        let stream = TcpStream::connect(local).unwrap();

        let data = data_addr_for(&stream).unwrap();
        assert_eq!(data.ip(), local.ip());
        assert_eq!(data.port(), local.port() + 1);
    }

    #[test]
    fn pump_stops_at_count() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let link = Link::new(&stream, None).unwrap();

        let reader = FrameReader::new(
            Cursor::new(b"NEWSTATE DISC\rBUFFER 0\rPENDING\r".to_vec()),
            Mode::Tcp,
        );
        pump(reader, Port::Command, "test", OutputFormat::Json, Some(2), &link).unwrap();

        assert_eq!(link.frames.load(Ordering::SeqCst), 2);
        assert!(link.is_closing());
    }

    #[test]
    fn pump_ends_quietly_on_eof() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let link = Link::new(&stream, None).unwrap();

        let mut wire = Vec::new();
        ardop_frame::write_command!(Mode::Tcp, &mut wire, "CONNECTED {} {}", "LA5NTA", 500)
            .unwrap();
        let reader = FrameReader::new(Cursor::new(wire), Mode::Tcp);
        pump(reader, Port::Command, "test", OutputFormat::Json, None, &link).unwrap();

        assert_eq!(link.frames.load(Ordering::SeqCst), 1);
        assert!(!link.is_closing());
    }
}
