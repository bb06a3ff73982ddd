use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use ardop_frame::{DataFrame, DefaultParser, Frame};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    payload_size: usize,
    payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    callsign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    locator: Option<String>,
    source: &'a str,
    timestamp: String,
}

impl<'a> FrameOutput<'a> {
    fn new(frame: &Frame, source: &'a str) -> Self {
        match frame {
            Frame::Command(cmd) => Self {
                kind: "command",
                tag: None,
                payload_size: cmd.text().len(),
                payload: cmd.text().to_string(),
                command: Some(cmd.parsed(&DefaultParser).command),
                callsign: None,
                locator: None,
                source,
                timestamp: now_unix_seconds(),
            },
            Frame::Data(data) => {
                let identity = identity_of(data);
                Self {
                    kind: "data",
                    tag: Some(data.tag_str()),
                    payload_size: data.payload().len(),
                    payload: payload_preview(data.payload()),
                    command: None,
                    callsign: identity.as_ref().map(|id| id.0.clone()),
                    locator: identity.map(|id| id.1),
                    source,
                    timestamp: now_unix_seconds(),
                }
            }
        }
    }

    fn label(&self) -> String {
        match &self.tag {
            Some(tag) => format!("{}:{}", self.kind, tag),
            None => self.kind.to_string(),
        }
    }
}

pub fn print_frame(frame: &Frame, source: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput::new(frame, source);
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let out = FrameOutput::new(frame, source);
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "SIZE", "SOURCE", "PAYLOAD"])
                .add_row(vec![
                    out.label(),
                    out.payload_size.to_string(),
                    source.to_string(),
                    out.payload.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let out = FrameOutput::new(frame, source);
            match (&out.callsign, &out.locator) {
                (Some(call), Some(loc)) => println!(
                    "{} size={} source={} callsign={} locator={}",
                    out.label(),
                    out.payload_size,
                    source,
                    call,
                    loc
                ),
                _ => println!(
                    "{} size={} source={} payload={}",
                    out.label(),
                    out.payload_size,
                    source,
                    out.payload
                ),
            }
        }
        OutputFormat::Raw => match frame {
            Frame::Command(cmd) => {
                let mut line = cmd.text().as_bytes().to_vec();
                line.push(b'\n');
                print_raw(&line);
            }
            Frame::Data(data) => print_raw(data.payload()),
        },
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn identity_of(data: &DataFrame) -> Option<(String, String)> {
    if !data.id_frame() {
        return None;
    }
    match data.identity() {
        Ok(id) => Some((id.callsign, id.locator)),
        Err(err) => {
            tracing::debug!(%err, "IDF frame without a readable identity");
            None
        }
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
