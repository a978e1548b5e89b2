use std::fmt;
use std::io;

use lumalink_frame::FrameError;
use lumalink_transport::ChannelError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::AddrInUse | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn channel_error(context: &str, err: ChannelError) -> CliError {
    match err {
        ChannelError::Bind { source, .. } | ChannelError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_in_use_is_a_transport_error() {
        let err = channel_error(
            "bind failed",
            ChannelError::Bind {
                addr: "0.0.0.0:8765".to_string(),
                source: io::ErrorKind::AddrInUse.into(),
            },
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
        assert!(err.message.starts_with("bind failed: "));
    }

    #[test]
    fn permission_denied_keeps_its_code() {
        let err = io_error("bind failed", io::ErrorKind::PermissionDenied.into());
        assert_eq!(err.code, PERMISSION_DENIED);
    }

    #[test]
    fn frame_errors_are_invalid_data() {
        let err = frame_error(
            "encode failed",
            FrameError::InvalidParameter {
                name: "red",
                value: 300,
                min: 0,
                max: 255,
            },
        );
        assert_eq!(err.code, DATA_INVALID);
        assert_eq!(
            err.to_string(),
            "encode failed: red must be between 0 and 255 (got 300)"
        );
    }
}
