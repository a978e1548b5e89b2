mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "lumalink", version, about = "Text command bridge for BLE lights")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::ChannelKind;

    #[test]
    fn parses_serve_subcommand() {
        let cli = Cli::try_parse_from([
            "lumalink",
            "serve",
            "--channel",
            "tcp",
            "--listen",
            "127.0.0.1:9000",
            "--log-format",
            "json",
        ])
        .expect("serve args should parse");

        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.channel, ChannelKind::Tcp);
                assert_eq!(args.listen, "127.0.0.1:9000");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_encode_words() {
        let cli = Cli::try_parse_from(["lumalink", "encode", "color", "255", "0", "0"])
            .expect("encode args should parse");
        match cli.command {
            Command::Encode(args) => assert_eq!(args.command, ["color", "255", "0", "0"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn encode_accepts_negative_arguments() {
        let cli = Cli::try_parse_from(["lumalink", "encode", "brightness", "-5"])
            .expect("negative values are command words");
        assert!(matches!(cli.command, Command::Encode(_)));
    }

    #[test]
    fn rejects_keep_alive_with_command() {
        let err = Cli::try_parse_from(["lumalink", "encode", "--keep-alive", "on"])
            .expect_err("conflicting args should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_unknown_channel() {
        let err = Cli::try_parse_from(["lumalink", "serve", "--channel", "mqtt"])
            .expect_err("unknown channel should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
