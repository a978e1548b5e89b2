use lumalink_transport::{ChannelError, LinkError};

/// Reasons a session ends.
///
/// Every variant is handled the same way by the supervisor: tear the
/// session down, back off, reconnect.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The radio link failed (connect, subscribe or a relayed write).
    #[error("radio link error: {0}")]
    Link(#[from] LinkError),

    /// A keep-alive write failed.
    #[error("keep-alive failed: {0}")]
    KeepAlive(#[source] LinkError),

    /// The text channel stopped accepting clients.
    #[error("text channel error: {0}")]
    Channel(#[from] ChannelError),

    /// A client relay task panicked or was cancelled unexpectedly.
    #[error("client task failed: {0}")]
    ClientTask(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
