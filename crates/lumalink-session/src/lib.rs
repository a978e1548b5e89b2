//! Keeps one radio session alive and relays text commands onto it.
//!
//! - [`Session`] owns the radio link and serializes every frame write.
//! - [`KeepAlive`] pings the light on a fixed interval; its failure is the
//!   primary signal that the link is dead.
//! - [`relay_client`] runs the per-client command loop.
//! - [`Supervisor`] ties it together: connect, serve, tear down, back off,
//!   repeat until shutdown.

pub mod config;
pub mod error;
pub mod keepalive;
pub mod relay;
pub mod session;
pub mod supervisor;

pub use config::{
    SupervisorConfig, DEFAULT_BACKOFF, DEFAULT_CONNECT_TIMEOUT, DEFAULT_KEEP_ALIVE_INTERVAL,
};
pub use error::{Result, SessionError};
pub use keepalive::{KeepAlive, KeepAliveState};
pub use relay::{handle_line, relay_client, LineDisposition};
pub use session::Session;
pub use supervisor::{Supervisor, SupervisorState};
