use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{LinkError, Result};

/// Hardware address of the light the bridge was deployed against.
pub const DEFAULT_ADDRESS: &str = "C9:38:32:30:63:51";

/// Characteristic the light publishes notifications on.
pub const DEFAULT_NOTIFY_CHARACTERISTIC: Uuid =
    Uuid::from_u128(0x00010203_0405_0607_0809_0a0b0c0d2b10);

/// Characteristic command frames are written to.
pub const DEFAULT_WRITE_CHARACTERISTIC: Uuid =
    Uuid::from_u128(0x00010203_0405_0607_0809_0a0b0c0d2b11);

/// Callback invoked with each notification payload.
pub type NotifyHandler = Box<dyn Fn(&[u8]) + Send + Sync + 'static>;

/// A handler that ignores every notification.
///
/// The light never sends anything the bridge acts on, but it only accepts
/// writes once a notification subscription exists.
pub fn inert_handler() -> NotifyHandler {
    Box::new(|_payload: &[u8]| {})
}

/// Which device to talk to and through which characteristics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Radio address of the light (`AA:BB:CC:DD:EE:FF`).
    pub address: String,
    /// Characteristic subscribed to before any write.
    pub notify_characteristic: Uuid,
    /// Characteristic frames are written to.
    pub write_characteristic: Uuid,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            notify_characteristic: DEFAULT_NOTIFY_CHARACTERISTIC,
            write_characteristic: DEFAULT_WRITE_CHARACTERISTIC,
        }
    }
}

/// One established radio connection.
///
/// Not safe for concurrent writes; callers serialize access (see the
/// session layer).
#[async_trait]
pub trait RadioLink: Send + Sync {
    /// Subscribe to notifications on `characteristic`.
    async fn subscribe_notify(
        &mut self,
        characteristic: Uuid,
        handler: NotifyHandler,
    ) -> Result<()>;

    /// Write `data` to `characteristic`, returning once the write completed.
    async fn write(&mut self, characteristic: Uuid, data: &[u8]) -> Result<()>;

    /// Release the connection.
    async fn disconnect(&mut self) -> Result<()>;

    /// Address of the connected device.
    fn address(&self) -> &str;
}

/// Opens radio links by address.
#[async_trait]
pub trait RadioConnector: Send + Sync {
    type Link: RadioLink + 'static;

    /// Connect to the device at `address`.
    ///
    /// `timeout` is a hint for backends that scan before connecting; the
    /// hard bound is applied by [`connect_within`].
    async fn connect(&self, address: &str, timeout: Duration) -> Result<Self::Link>;
}

/// Connect with a hard upper bound on the whole attempt.
pub async fn connect_within<C>(connector: &C, address: &str, timeout: Duration) -> Result<C::Link>
where
    C: RadioConnector + ?Sized,
{
    match tokio::time::timeout(timeout, connector.connect(address, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(LinkError::Timeout {
            address: address.to_string(),
            after: timeout,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverConnects;

    struct NoLink;

    #[async_trait]
    impl RadioLink for NoLink {
        async fn subscribe_notify(&mut self, _: Uuid, _: NotifyHandler) -> Result<()> {
            Ok(())
        }

        async fn write(&mut self, _: Uuid, _: &[u8]) -> Result<()> {
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<()> {
            Ok(())
        }

        fn address(&self) -> &str {
            "00:00:00:00:00:00"
        }
    }

    #[async_trait]
    impl RadioConnector for NeverConnects {
        type Link = NoLink;

        async fn connect(&self, _address: &str, _timeout: Duration) -> Result<NoLink> {
            std::future::pending().await
        }
    }

    struct Refuses;

    #[async_trait]
    impl RadioConnector for Refuses {
        type Link = NoLink;

        async fn connect(&self, address: &str, _timeout: Duration) -> Result<NoLink> {
            Err(LinkError::Connect {
                address: address.to_string(),
                reason: "device not found".to_string(),
            })
        }
    }

    #[test]
    fn default_profile_matches_deployed_light() {
        let profile = DeviceProfile::default();
        assert_eq!(profile.address, "C9:38:32:30:63:51");
        assert_eq!(
            profile.notify_characteristic.to_string(),
            "00010203-0405-0607-0809-0a0b0c0d2b10"
        );
        assert_eq!(
            profile.write_characteristic.to_string(),
            "00010203-0405-0607-0809-0a0b0c0d2b11"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn connect_within_times_out() {
        let err = connect_within(&NeverConnects, DEFAULT_ADDRESS, Duration::from_secs(30))
            .await
            .err()
            .expect("connect should time out");
        assert!(matches!(
            err,
            LinkError::Timeout { after, .. } if after == Duration::from_secs(30)
        ));
    }

    #[tokio::test]
    async fn connect_within_passes_errors_through() {
        let err = connect_within(&Refuses, DEFAULT_ADDRESS, Duration::from_secs(1))
            .await
            .err()
            .expect("connect should fail");
        assert!(matches!(err, LinkError::Connect { .. }));
    }

    #[test]
    fn inert_handler_accepts_payloads() {
        let handler = inert_handler();
        handler(&[0x01, 0x02]);
        handler(&[]);
    }
}
