use async_trait::async_trait;

use crate::error::ChannelError;

/// One connected control client.
#[async_trait]
pub trait TextClient: Send + 'static {
    /// Wait for the next line.
    ///
    /// Returns `Ok(None)` once the client has gone away cleanly.
    async fn recv_line(&mut self) -> Result<Option<String>, ChannelError>;

    /// Send one line back to the client.
    async fn send_line(&mut self, line: &str) -> Result<(), ChannelError>;

    /// Printable label for logs (usually the remote socket address).
    fn peer(&self) -> &str;
}

/// A server that hands out connected clients.
#[async_trait]
pub trait TextChannel: Send {
    type Client: TextClient;

    /// Wait for the next client.
    ///
    /// Implementations must be cancel-safe: dropping the returned future
    /// before it completes must not lose a client.
    async fn accept(&mut self) -> Result<Self::Client, ChannelError>;
}
