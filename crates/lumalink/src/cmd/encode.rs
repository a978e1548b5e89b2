use lumalink_frame::command::normalize;
use lumalink_frame::{encode_command, encode_fixed, FixedFrame, Frame, LogicalCommand};

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let (label, frame) = if args.keep_alive {
        ("keep-alive".to_string(), encode_fixed(FixedFrame::KeepAlive))
    } else {
        let line = args.command.join(" ");
        (normalize(&line), encode_line(&line)?)
    };

    print_encoded(&label, &frame, format);
    Ok(SUCCESS)
}

fn encode_line(line: &str) -> CliResult<Frame> {
    let command = LogicalCommand::parse(line);
    match &command {
        LogicalCommand::Unknown(normalized) => {
            return Err(CliError::new(USAGE, format!("unknown command: {normalized}")))
        }
        LogicalCommand::Disconnect => {
            return Err(CliError::new(USAGE, "`exit` ends a client session and has no frame"))
        }
        _ => {}
    }

    encode_command(&command)
        .map_err(|err| frame_error("encode failed", err))?
        .ok_or_else(|| CliError::new(USAGE, format!("`{command}` has no frame")))
}
