//! Bridge a line-oriented text command channel to a BLE light.
//!
//! Clients send commands such as `on` or `color 255 0 0` over a WebSocket
//! (or plain TCP lines); lumalink encodes them into the light's 20-byte
//! frames and writes them over a single, kept-alive radio session that is
//! re-established whenever it drops.
//!
//! # Crate Structure
//!
//! - [`frame`]: command grammar and the binary frame codec
//! - [`transport`]: radio link and text channel traits plus their backends
//!   (BLE behind the `ble` feature)
//! - [`session`]: serialized session, keep-alive, command relay and the
//!   reconnection supervisor

/// Re-export frame types.
pub mod frame {
    pub use lumalink_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use lumalink_transport::*;
}

/// Re-export session types.
pub mod session {
    pub use lumalink_session::*;
}
