use std::time::Duration;

use uuid::Uuid;

/// Errors raised by the radio link.
///
/// Any of these is fatal to the session that observed it.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Failed to establish the radio connection.
    #[error("failed to connect to {address}: {reason}")]
    Connect { address: String, reason: String },

    /// The connect attempt exceeded its bound.
    #[error("connect to {address} timed out after {after:?}")]
    Timeout { address: String, after: Duration },

    /// The device does not expose a required characteristic.
    #[error("characteristic {0} not found on device")]
    CharacteristicNotFound(Uuid),

    /// Subscribing to notifications failed.
    #[error("subscribe to {characteristic} failed: {reason}")]
    Subscribe {
        characteristic: Uuid,
        reason: String,
    },

    /// A characteristic write failed.
    #[error("write to {characteristic} failed: {reason}")]
    Write {
        characteristic: Uuid,
        reason: String,
    },

    /// Tearing down the connection failed.
    #[error("disconnect failed: {0}")]
    Disconnect(String),

    /// The link was already released.
    #[error("radio link closed")]
    Closed,

    /// The local radio adapter misbehaved (missing, powered off, ...).
    #[error("radio adapter error: {0}")]
    Adapter(String),
}

/// Errors raised by a text channel or one of its clients.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Failed to bind the listening socket.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on a client stream.
    #[error("text channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The WebSocket layer reported a protocol error.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// A client sent a line longer than the configured maximum.
    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),

    /// The channel stopped accepting clients.
    #[error("text channel shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display_includes_address_and_bound() {
        let err = LinkError::Timeout {
            address: "C9:38:32:30:63:51".to_string(),
            after: Duration::from_secs(30),
        };
        assert_eq!(
            err.to_string(),
            "connect to C9:38:32:30:63:51 timed out after 30s"
        );
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LinkError>();
        assert_send_sync::<ChannelError>();
    }
}
