use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use lumalink_frame::Frame;
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
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
struct EncodedOutput<'a> {
    command: &'a str,
    frame: String,
    length: usize,
    checksum: String,
    keep_alive: bool,
}

impl<'a> EncodedOutput<'a> {
    fn new(command: &'a str, frame: &Frame) -> Self {
        Self {
            command,
            frame: frame.to_string(),
            length: frame.as_bytes().len(),
            checksum: format!("0x{:02x}", frame.checksum_byte()),
            keep_alive: frame.is_keep_alive(),
        }
    }
}

/// Print the frame produced by `command`.
pub fn print_encoded(command: &str, frame: &Frame, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EncodedOutput::new(command, frame);
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let out = EncodedOutput::new(command, frame);
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "FRAME", "CHECKSUM"])
                .add_row(vec![out.command.to_string(), out.frame, out.checksum]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "command={} frame={} checksum=0x{:02x}",
                command,
                frame,
                frame.checksum_byte()
            );
        }
        OutputFormat::Raw => print_raw(frame.as_bytes()),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use lumalink_frame::{encode_fixed, FixedFrame};

    use super::*;

    #[test]
    fn json_output_shape() {
        let frame = encode_fixed(FixedFrame::KeepAlive);
        let out = EncodedOutput::new("keep-alive", &frame);
        let value = serde_json::to_value(&out).expect("output should serialize");

        assert_eq!(value["command"], "keep-alive");
        assert_eq!(value["length"], 20);
        assert_eq!(value["keep_alive"], true);
        assert_eq!(value["frame"].as_str().map(str::len), Some(40));
    }
}
