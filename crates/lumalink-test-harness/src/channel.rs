use async_trait::async_trait;
use lumalink_transport::{ChannelError, TextChannel, TextClient};
use tokio::sync::mpsc;

/// Build an in-memory text channel and the dialer that connects to it.
pub fn memory_channel() -> (MemoryChannel, MemoryDialer) {
    let (pending_tx, pending_rx) = mpsc::unbounded_channel();
    (
        MemoryChannel {
            pending: pending_rx,
        },
        MemoryDialer {
            pending: pending_tx,
            next_id: 0,
        },
    )
}

/// Server side of the in-memory channel.
pub struct MemoryChannel {
    pending: mpsc::UnboundedReceiver<MemoryClient>,
}

#[async_trait]
impl TextChannel for MemoryChannel {
    type Client = MemoryClient;

    async fn accept(&mut self) -> Result<MemoryClient, ChannelError> {
        self.pending.recv().await.ok_or(ChannelError::Shutdown)
    }
}

/// Test-side handle that opens new clients.
///
/// Dropping every dialer shuts the channel down.
pub struct MemoryDialer {
    pending: mpsc::UnboundedSender<MemoryClient>,
    next_id: usize,
}

impl MemoryDialer {
    /// Connect a new client. Lines sent before the server accepts are queued.
    pub fn connect(&mut self) -> MemoryPeer {
        let (to_server, from_peer) = mpsc::unbounded_channel();
        let (to_peer, from_server) = mpsc::unbounded_channel();
        let label = format!("memory-{}", self.next_id);
        self.next_id += 1;

        let client = MemoryClient {
            inbound: from_peer,
            outbound: to_peer,
            label: label.clone(),
        };
        // A closed channel simply never accepts; the peer sees no replies.
        let _ = self.pending.send(client);

        MemoryPeer {
            outbound: Some(to_server),
            inbound: from_server,
            label,
        }
    }
}

/// Server-side view of one in-memory client.
pub struct MemoryClient {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
    label: String,
}

#[async_trait]
impl TextClient for MemoryClient {
    async fn recv_line(&mut self) -> Result<Option<String>, ChannelError> {
        Ok(self.inbound.recv().await)
    }

    async fn send_line(&mut self, line: &str) -> Result<(), ChannelError> {
        self.outbound
            .send(line.to_string())
            .map_err(|_| ChannelError::Io(std::io::ErrorKind::BrokenPipe.into()))
    }

    fn peer(&self) -> &str {
        &self.label
    }
}

/// Test-side view of one in-memory client.
pub struct MemoryPeer {
    outbound: Option<mpsc::UnboundedSender<String>>,
    inbound: mpsc::UnboundedReceiver<String>,
    label: String,
}

impl MemoryPeer {
    /// Send one line to the server. Returns false once the server side is gone.
    pub fn send(&self, line: &str) -> bool {
        self.outbound
            .as_ref()
            .is_some_and(|outbound| outbound.send(line.to_string()).is_ok())
    }

    /// Next reply, or `None` once the server dropped the client.
    pub async fn recv(&mut self) -> Option<String> {
        self.inbound.recv().await
    }

    /// Send `line` and wait for the reply.
    pub async fn request(&mut self, line: &str) -> Option<String> {
        if !self.send(line) {
            return None;
        }
        self.recv().await
    }

    /// Close the sending half; the server sees end of stream.
    pub fn hang_up(&mut self) {
        self.outbound = None;
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}
