//! Capabilities lumalink consumes from the outside world.
//!
//! Two seams, each a trait plus concrete backends:
//! - [`RadioConnector`] / [`RadioLink`]: the short-range radio connection to
//!   the light. The BLE backend lives behind the `ble` feature.
//! - [`TextChannel`] / [`TextClient`]: the line-oriented control channel
//!   clients use. WebSocket (`websocket` feature) and newline-delimited TCP
//!   (`tcp` feature) backends are provided.
//!
//! Everything above this layer only talks to the traits, so tests can swap
//! in fakes without touching real hardware or sockets.

pub mod error;
pub mod radio;
pub mod text;

#[cfg(feature = "ble")]
pub mod ble;

#[cfg(feature = "tcp")]
pub mod tcp;

#[cfg(feature = "websocket")]
pub mod ws;

pub use error::{ChannelError, LinkError, Result};
pub use radio::{
    connect_within, inert_handler, DeviceProfile, NotifyHandler, RadioConnector, RadioLink,
    DEFAULT_ADDRESS, DEFAULT_NOTIFY_CHARACTERISTIC, DEFAULT_WRITE_CHARACTERISTIC,
};
pub use text::{TextChannel, TextClient};

#[cfg(feature = "ble")]
pub use ble::{BleConnector, BleLink};

#[cfg(feature = "tcp")]
pub use tcp::{LineChannel, LineClient};

#[cfg(feature = "websocket")]
pub use ws::{WsChannel, WsClient};
