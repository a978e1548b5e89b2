//! Bluetooth Low Energy radio backend built on `btleplug`.
//!
//! Connecting scans the first local adapter until a peripheral with the
//! requested address shows up, connects, and discovers its GATT services.
//! Scanning may use two thirds of the connect timeout; connecting and
//! discovery get whatever remains. A peripheral that was found but never
//! handed out as a [`BleLink`] is disconnected in the background.

use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    BDAddr, Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::{LinkError, Result};
use crate::radio::{NotifyHandler, RadioConnector, RadioLink};

const DEFAULT_SCAN_POLL: Duration = Duration::from_millis(250);

/// One part in this many of the connect timeout is kept back from scanning.
const CONNECT_SHARE: u32 = 3;

/// Opens [`BleLink`]s through the first available Bluetooth adapter.
#[derive(Debug, Clone)]
pub struct BleConnector {
    scan_poll: Duration,
}

impl Default for BleConnector {
    fn default() -> Self {
        Self {
            scan_poll: DEFAULT_SCAN_POLL,
        }
    }
}

impl BleConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// How often the discovered peripheral list is re-checked while scanning.
    pub fn with_scan_poll(mut self, scan_poll: Duration) -> Self {
        self.scan_poll = scan_poll;
        self
    }
}

#[async_trait]
impl RadioConnector for BleConnector {
    type Link = BleLink;

    async fn connect(&self, address: &str, timeout: Duration) -> Result<BleLink> {
        let target: BDAddr = address.parse().map_err(|err| LinkError::Connect {
            address: address.to_string(),
            reason: format!("invalid address: {err}"),
        })?;

        let deadline = Instant::now() + timeout;
        let adapter = first_adapter().await?;
        adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(adapter_error)?;
        let scan = scan_budget(timeout);
        tracing::debug!(%address, ?scan, "scanning for device");

        let found = tokio::time::timeout(scan, find_peripheral(&adapter, target, self.scan_poll)).await;
        if let Err(err) = adapter.stop_scan().await {
            tracing::debug!(error = %err, "stop scan failed");
        }
        let peripheral = match found {
            Ok(found) => found?,
            Err(_) => {
                return Err(LinkError::Timeout {
                    address: address.to_string(),
                    after: scan,
                })
            }
        };

        let release = ReleaseOnDrop::new({
            let peripheral = peripheral.clone();
            let address = address.to_string();
            move || spawn_disconnect(peripheral, address)
        });
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining, establish(&peripheral)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(connect_error(address, err)),
            Err(_) => {
                return Err(LinkError::Timeout {
                    address: address.to_string(),
                    after: timeout,
                })
            }
        }
        release.disarm();

        Ok(BleLink {
            peripheral,
            address: address.to_string(),
            notifications: None,
        })
    }
}

/// Share of the connect timeout spent scanning for the device.
fn scan_budget(timeout: Duration) -> Duration {
    timeout.saturating_sub(timeout / CONNECT_SHARE)
}

async fn establish(peripheral: &Peripheral) -> btleplug::Result<()> {
    peripheral.connect().await?;
    peripheral.discover_services().await
}

/// Runs a release action when dropped, unless disarmed first.
struct ReleaseOnDrop {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ReleaseOnDrop {
    fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    fn disarm(mut self) {
        self.release = None;
    }
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

fn spawn_disconnect(peripheral: Peripheral, address: String) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        tracing::debug!(%address, "no runtime left to release peripheral");
        return;
    };
    runtime.spawn(async move {
        match peripheral.disconnect().await {
            Ok(()) => tracing::debug!(%address, "released half-connected peripheral"),
            Err(err) => tracing::debug!(%address, error = %err, "release of half-connected peripheral failed"),
        }
    });
}

/// A connected BLE peripheral.
pub struct BleLink {
    peripheral: Peripheral,
    address: String,
    notifications: Option<JoinHandle<()>>,
}

impl BleLink {
    fn characteristic(&self, uuid: Uuid) -> Result<Characteristic> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|characteristic| characteristic.uuid == uuid)
            .ok_or(LinkError::CharacteristicNotFound(uuid))
    }
}

#[async_trait]
impl RadioLink for BleLink {
    async fn subscribe_notify(&mut self, characteristic: Uuid, handler: NotifyHandler) -> Result<()> {
        let target = self.characteristic(characteristic)?;
        let subscribe_error = |err: btleplug::Error| LinkError::Subscribe {
            characteristic,
            reason: err.to_string(),
        };

        self.peripheral
            .subscribe(&target)
            .await
            .map_err(subscribe_error)?;
        let mut stream = self
            .peripheral
            .notifications()
            .await
            .map_err(subscribe_error)?;

        let drain = tokio::spawn(async move {
            while let Some(notification) = stream.next().await {
                if notification.uuid == characteristic {
                    handler(&notification.value);
                }
            }
        });
        if let Some(previous) = self.notifications.replace(drain) {
            previous.abort();
        }
        Ok(())
    }

    async fn write(&mut self, characteristic: Uuid, data: &[u8]) -> Result<()> {
        let target = self.characteristic(characteristic)?;
        self.peripheral
            .write(&target, data, WriteType::WithResponse)
            .await
            .map_err(|err| LinkError::Write {
                characteristic,
                reason: err.to_string(),
            })
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(drain) = self.notifications.take() {
            drain.abort();
        }
        self.peripheral
            .disconnect()
            .await
            .map_err(|err| LinkError::Disconnect(err.to_string()))
    }

    fn address(&self) -> &str {
        &self.address
    }
}

impl Drop for BleLink {
    fn drop(&mut self) {
        if let Some(drain) = self.notifications.take() {
            drain.abort();
        }
    }
}

async fn first_adapter() -> Result<Adapter> {
    let manager = Manager::new().await.map_err(adapter_error)?;
    manager
        .adapters()
        .await
        .map_err(adapter_error)?
        .into_iter()
        .next()
        .ok_or_else(|| LinkError::Adapter("no bluetooth adapter found".to_string()))
}

async fn find_peripheral(adapter: &Adapter, target: BDAddr, poll: Duration) -> Result<Peripheral> {
    loop {
        let peripherals = adapter.peripherals().await.map_err(adapter_error)?;
        if let Some(found) = peripherals.into_iter().find(|p| p.address() == target) {
            return Ok(found);
        }
        tokio::time::sleep(poll).await;
    }
}

fn adapter_error(err: btleplug::Error) -> LinkError {
    LinkError::Adapter(err.to_string())
}

fn connect_error(address: &str, err: btleplug::Error) -> LinkError {
    LinkError::Connect {
        address: address.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn scan_leaves_a_third_for_connecting() {
        assert_eq!(scan_budget(Duration::from_secs(30)), Duration::from_secs(20));
        assert_eq!(scan_budget(Duration::from_millis(300)), Duration::from_millis(200));
        assert_eq!(scan_budget(Duration::ZERO), Duration::ZERO);
    }

    fn flagged() -> (Arc<AtomicBool>, ReleaseOnDrop) {
        let released = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&released);
        let guard = ReleaseOnDrop::new(move || flag.store(true, Ordering::SeqCst));
        (released, guard)
    }

    #[test]
    fn dropped_guard_releases() {
        let (released, guard) = flagged();
        drop(guard);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn disarmed_guard_keeps_peripheral() {
        let (released, guard) = flagged();
        guard.disarm();
        assert!(!released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancelled_attempt_releases() {
        let (released, guard) = flagged();
        let attempt = async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        };

        let outcome = tokio::time::timeout(Duration::from_millis(10), attempt).await;
        assert!(outcome.is_err());
        assert!(released.load(Ordering::SeqCst));
    }
}
