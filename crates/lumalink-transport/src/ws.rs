use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{accept_async, WebSocketStream};

use crate::error::ChannelError;
use crate::text::{TextChannel, TextClient};

/// Clients that finished their handshake but were not picked up yet.
const PENDING_CLIENTS: usize = 32;

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// WebSocket text channel: one text message per command line.
///
/// TCP accept and the WebSocket handshake run on background tasks, so
/// [`TextChannel::accept`] only waits on a queue and stays cancel-safe.
pub struct WsChannel {
    local_addr: SocketAddr,
    incoming: mpsc::Receiver<WsClient>,
    acceptor: JoinHandle<()>,
}

impl WsChannel {
    /// Bind to `addr` (`host:port`) and start accepting.
    pub async fn bind(addr: &str) -> Result<Self, ChannelError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ChannelError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        let (tx, incoming) = mpsc::channel(PENDING_CLIENTS);
        let acceptor = tokio::spawn(accept_loop(listener, tx));

        tracing::info!(addr = %local_addr, "websocket text channel listening");
        Ok(Self {
            local_addr,
            incoming,
            acceptor,
        })
    }

    /// Bound socket address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

#[async_trait]
impl TextChannel for WsChannel {
    type Client = WsClient;

    async fn accept(&mut self) -> Result<WsClient, ChannelError> {
        self.incoming.recv().await.ok_or(ChannelError::Shutdown)
    }
}

async fn accept_loop(listener: TcpListener, ready: mpsc::Sender<WsClient>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                tracing::warn!(error = %err, "websocket accept failed");
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };

        let ready = ready.clone();
        tokio::spawn(async move {
            match accept_async(stream).await {
                Ok(ws) => {
                    tracing::debug!(%peer, "websocket client connected");
                    let client = WsClient {
                        ws,
                        peer: peer.to_string(),
                    };
                    if ready.send(client).await.is_err() {
                        tracing::debug!(%peer, "text channel closed before client was served");
                    }
                }
                Err(err) => tracing::warn!(%peer, error = %err, "websocket handshake failed"),
            }
        });
    }
}

/// One client of a [`WsChannel`].
pub struct WsClient {
    ws: WebSocketStream<TcpStream>,
    peer: String,
}

#[async_trait]
impl TextClient for WsClient {
    async fn recv_line(&mut self) -> Result<Option<String>, ChannelError> {
        loop {
            let message = match self.ws.next().await {
                None => return Ok(None),
                Some(Ok(message)) => message,
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => return Ok(None),
                Some(Err(err)) => return Err(ChannelError::WebSocket(err.to_string())),
            };

            match message {
                Message::Text(text) => return Ok(Some(text)),
                Message::Binary(data) => return Ok(Some(String::from_utf8_lossy(&data).into_owned())),
                Message::Close(_) => return Ok(None),
                // Ping/pong are answered by tungstenite itself.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    async fn send_line(&mut self, line: &str) -> Result<(), ChannelError> {
        self.ws
            .send(Message::Text(line.to_string()))
            .await
            .map_err(|err| ChannelError::WebSocket(err.to_string()))
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}
