use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};

use crate::error::ChannelError;
use crate::text::{TextChannel, TextClient};

/// Longest accepted command line in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Newline-delimited text channel over plain TCP.
pub struct LineChannel {
    listener: TcpListener,
    max_line_length: usize,
}

impl LineChannel {
    /// Bind to `addr` (`host:port`).
    pub async fn bind(addr: &str) -> Result<Self, ChannelError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ChannelError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr = %listener.local_addr()?, "tcp text channel listening");
        Ok(Self {
            listener,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        })
    }

    /// Override the maximum accepted line length.
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Bound socket address.
    pub fn local_addr(&self) -> Result<SocketAddr, ChannelError> {
        Ok(self.listener.local_addr()?)
    }
}

#[async_trait]
impl TextChannel for LineChannel {
    type Client = LineClient;

    async fn accept(&mut self) -> Result<LineClient, ChannelError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    tracing::debug!(%peer, "tcp client connected");
                    return Ok(LineClient {
                        framed: Framed::new(
                            stream,
                            LinesCodec::new_with_max_length(self.max_line_length),
                        ),
                        peer: peer.to_string(),
                        max_line_length: self.max_line_length,
                    });
                }
                // Per-connection failures (reset before accept, fd exhaustion) are transient.
                Err(err) => {
                    tracing::warn!(error = %err, "tcp accept failed");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }
    }
}

/// One client of a [`LineChannel`].
pub struct LineClient {
    framed: Framed<TcpStream, LinesCodec>,
    peer: String,
    max_line_length: usize,
}

#[async_trait]
impl TextClient for LineClient {
    async fn recv_line(&mut self) -> Result<Option<String>, ChannelError> {
        match self.framed.next().await {
            None => Ok(None),
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(err)) => Err(self.codec_error(err)),
        }
    }

    async fn send_line(&mut self, line: &str) -> Result<(), ChannelError> {
        self.framed
            .send(line)
            .await
            .map_err(|err| self.codec_error(err))
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}

impl LineClient {
    fn codec_error(&self, err: LinesCodecError) -> ChannelError {
        match err {
            LinesCodecError::MaxLineLengthExceeded => {
                ChannelError::LineTooLong(self.max_line_length)
            }
            LinesCodecError::Io(err) => ChannelError::Io(err),
        }
    }
}
