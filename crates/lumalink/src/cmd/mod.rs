use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use lumalink_transport::DEFAULT_ADDRESS;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod encode;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bridge text clients to the light until interrupted.
    Serve(ServeArgs),
    /// Print the frame a text command produces.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Encode(args) => encode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChannelKind {
    /// WebSocket, one command per text message.
    Ws,
    /// Plain TCP, one command per line.
    Tcp,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Radio address of the light.
    #[arg(long, env = "LUMALINK_ADDRESS", default_value = DEFAULT_ADDRESS)]
    pub address: String,
    /// Characteristic to subscribe to before writing.
    #[arg(long, env = "LUMALINK_NOTIFY_UUID", default_value = "00010203-0405-0607-0809-0a0b0c0d2b10")]
    pub notify_uuid: String,
    /// Characteristic frames are written to.
    #[arg(long, env = "LUMALINK_WRITE_UUID", default_value = "00010203-0405-0607-0809-0a0b0c0d2b11")]
    pub write_uuid: String,
    /// Address the text channel listens on.
    #[arg(long, env = "LUMALINK_LISTEN", default_value = "0.0.0.0:8765")]
    pub listen: String,
    /// Text channel protocol.
    #[arg(long, value_enum, env = "LUMALINK_CHANNEL", default_value = "ws")]
    pub channel: ChannelKind,
    /// Bound on each connect attempt (e.g. 30s, 500ms).
    #[arg(long, env = "LUMALINK_CONNECT_TIMEOUT", default_value = "30s")]
    pub connect_timeout: String,
    /// Keep-alive period while connected.
    #[arg(long, env = "LUMALINK_KEEP_ALIVE", default_value = "2s")]
    pub keep_alive: String,
    /// Wait before reconnecting after a session ends.
    #[arg(long, env = "LUMALINK_BACKOFF", default_value = "5s")]
    pub backoff: String,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Command words, e.g. `color 255 0 0`.
    #[arg(
        required_unless_present = "keep_alive",
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
    /// Print the keep-alive frame instead.
    #[arg(long, conflicts_with = "command")]
    pub keep_alive: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms` or bare seconds.
pub fn parse_duration(name: &str, input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, format!("{name} must not be empty")));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid {name} value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, format!("{name} must be greater than zero")));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds() {
        assert_eq!(
            parse_duration("backoff", "5s").expect("valid"),
            Duration::from_secs(5)
        );
        assert_eq!(
            parse_duration("backoff", "2").expect("valid"),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn parse_duration_millis() {
        assert_eq!(
            parse_duration("keep-alive", "150ms").expect("valid"),
            Duration::from_millis(150)
        );
    }

    #[test]
    fn parse_duration_invalid() {
        for bad in ["0s", "bad", "", "-1s", "1.5s"] {
            let err = parse_duration("connect timeout", bad).expect_err("should be rejected");
            assert_eq!(err.code, USAGE);
        }
    }
}
