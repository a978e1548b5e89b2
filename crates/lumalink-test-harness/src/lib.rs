//! Test doubles for lumalink.
//!
//! - [`MockRadio`] implements [`RadioConnector`](lumalink_transport::RadioConnector)
//!   with scripted connect outcomes and per-link write failures, and records
//!   everything that crosses the fake radio.
//! - [`memory_channel`] builds an in-memory
//!   [`TextChannel`](lumalink_transport::TextChannel) whose clients are
//!   driven from the test through [`MemoryPeer`].
//!
//! All timestamps use `tokio::time::Instant`, so tests running with a paused
//! clock can assert exact delays.

pub mod channel;
pub mod radio;

pub use channel::{memory_channel, MemoryChannel, MemoryClient, MemoryDialer, MemoryPeer};
pub use radio::{ConnectOutcome, LinkScript, MockLink, MockRadio, RadioLog, WriteRecord};
