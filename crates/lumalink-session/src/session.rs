use std::sync::atomic::{AtomicU64, Ordering};

use lumalink_frame::Frame;
use lumalink_transport::{inert_handler, DeviceProfile, LinkError, RadioLink};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One live radio session.
///
/// Owns the link for its whole lifetime. Every write goes through one async
/// mutex held for the duration of the write, so frames from the keep-alive
/// and from any number of clients never interleave on the air.
pub struct Session<L> {
    link: Mutex<Option<L>>,
    write_characteristic: Uuid,
    address: String,
    frames_sent: AtomicU64,
}

impl<L: RadioLink> Session<L> {
    /// Subscribe to notifications on a freshly connected link and wrap it.
    ///
    /// The light ignores writes until a subscription exists. If subscribing
    /// fails the link is disconnected before the error is returned.
    pub async fn open(link: L, device: &DeviceProfile) -> Result<Self, LinkError> {
        let session = Self::wrap(link, device);
        let subscribed = session.subscribe(device.notify_characteristic).await;
        session.finish_open(subscribed).await
    }

    /// Like [`Session::open`], but gives up once `cancel` fires.
    ///
    /// Returns `Ok(None)` when cancelled; the link is disconnected first.
    pub async fn open_until(
        link: L,
        device: &DeviceProfile,
        cancel: &CancellationToken,
    ) -> Result<Option<Self>, LinkError> {
        let session = Self::wrap(link, device);
        let subscribed = tokio::select! {
            _ = cancel.cancelled() => None,
            subscribed = session.subscribe(device.notify_characteristic) => Some(subscribed),
        };

        match subscribed {
            Some(subscribed) => session.finish_open(subscribed).await.map(Some),
            None => {
                tracing::info!(address = %session.address, "open abandoned on shutdown");
                if let Err(err) = session.close().await {
                    tracing::debug!(address = %session.address, error = %err, "disconnect after abandoned open");
                }
                Ok(None)
            }
        }
    }

    fn wrap(link: L, device: &DeviceProfile) -> Self {
        Self {
            address: link.address().to_string(),
            link: Mutex::new(Some(link)),
            write_characteristic: device.write_characteristic,
            frames_sent: AtomicU64::new(0),
        }
    }

    async fn subscribe(&self, characteristic: Uuid) -> Result<(), LinkError> {
        let mut guard = self.link.lock().await;
        let link = guard.as_mut().ok_or(LinkError::Closed)?;
        link.subscribe_notify(characteristic, inert_handler()).await
    }

    async fn finish_open(self, subscribed: Result<(), LinkError>) -> Result<Self, LinkError> {
        if let Err(err) = subscribed {
            if let Err(disconnect_err) = self.close().await {
                tracing::debug!(address = %self.address, error = %disconnect_err, "disconnect after failed subscribe");
            }
            return Err(err);
        }

        tracing::info!(address = %self.address, "radio session opened");
        Ok(self)
    }

    /// Write one frame, waiting for any write in progress to finish first.
    pub async fn send(&self, frame: &Frame) -> Result<(), LinkError> {
        let mut guard = self.link.lock().await;
        let link = guard.as_mut().ok_or(LinkError::Closed)?;
        link.write(self.write_characteristic, frame.as_bytes()).await?;
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(address = %self.address, frame = %frame, "frame written");
        Ok(())
    }

    /// Release the link. Safe to call more than once.
    pub async fn close(&self) -> Result<(), LinkError> {
        let link = self.link.lock().await.take();
        match link {
            Some(mut link) => {
                link.disconnect().await?;
                tracing::info!(
                    address = %self.address,
                    frames_sent = self.frames_sent(),
                    "radio session closed"
                );
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub async fn is_open(&self) -> bool {
        self.link.lock().await.is_some()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Frames successfully written over the life of the session.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }
}
