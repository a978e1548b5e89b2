//! Command frames for the lumalink light protocol.
//!
//! Every frame on the radio link is exactly [`FRAME_LEN`] bytes:
//! - A 1-byte command family (`0x33` for commands, `0xAA` for keep-alive)
//! - A fixed-layout payload, zero-padded
//! - A trailing checksum byte, the XOR of every preceding byte
//!
//! This layer is pure: text in, bytes out. Nothing here touches the radio.

pub mod codec;
pub mod command;
pub mod error;

pub use codec::{
    checksum, encode_brightness, encode_color, encode_command, encode_fixed, verify_checksum,
    FixedFrame, Frame, FRAME_LEN,
};
pub use command::LogicalCommand;
pub use error::{FrameError, Result};
