use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::command::LogicalCommand;
use crate::error::{FrameError, Result};

/// Every frame is 19 body bytes plus one checksum byte.
pub const FRAME_LEN: usize = 20;

const BODY_LEN: usize = FRAME_LEN - 1;

const COMMAND_FAMILY: u8 = 0x33;
const KEEP_ALIVE_FAMILY: u8 = 0xAA;

const OP_BRIGHTNESS: u8 = 0x04;
const OP_COLOR: u8 = 0x05;

/// Color mode selector sent between the opcode and the RGB triple.
const COLOR_MODE_MANUAL: [u8; 2] = [0x15, 0x01];

/// Segment following the RGB triple: five zero bytes, then `FF FF FF 3F`,
/// then zero padding up to the checksum.
const COLOR_TAIL: [u8; 12] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0x3F, 0x00, 0x00, 0x00,
];

const MAX_BRIGHTNESS: i64 = 100;
const MAX_CHANNEL: i64 = 255;

#[rustfmt::skip]
static TURN_ON: [u8; FRAME_LEN] = [
    0x33, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x33,
];

#[rustfmt::skip]
static TURN_OFF: [u8; FRAME_LEN] = [
    0x33, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x32,
];

#[rustfmt::skip]
static KEEP_ALIVE: [u8; FRAME_LEN] = [
    0xAA, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xAA,
];

#[rustfmt::skip]
static ILLUMINATE: [u8; FRAME_LEN] = [
    0x33, 0x05, 0x04, 0x3F, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0D,
];

/// The protocol frames that carry no parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixedFrame {
    TurnOn,
    TurnOff,
    KeepAlive,
    Illuminate,
}

/// A complete frame ready for the radio link.
///
/// Always [`FRAME_LEN`] bytes, always ending in a valid checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    fn from_static(bytes: &'static [u8; FRAME_LEN]) -> Self {
        Self {
            bytes: Bytes::from_static(bytes),
        }
    }

    /// Append the checksum to a fully built body.
    fn seal(mut body: BytesMut) -> Self {
        debug_assert_eq!(body.len(), BODY_LEN);
        let sum = checksum(&body);
        body.put_u8(sum);
        Self {
            bytes: body.freeze(),
        }
    }

    /// The wire bytes, checksum included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The trailing checksum byte.
    pub fn checksum_byte(&self) -> u8 {
        self.bytes[BODY_LEN]
    }

    pub fn is_keep_alive(&self) -> bool {
        self.bytes[0] == KEEP_ALIVE_FAMILY
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.bytes.iter() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Running XOR of every byte.
pub fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0u8, |acc, byte| acc ^ byte)
}

/// Check length and trailing checksum of raw wire bytes.
pub fn verify_checksum(bytes: &[u8]) -> bool {
    match bytes.split_last() {
        Some((sum, body)) if bytes.len() == FRAME_LEN => checksum(body) == *sum,
        _ => false,
    }
}

/// Return one of the protocol-constant frames.
pub fn encode_fixed(kind: FixedFrame) -> Frame {
    match kind {
        FixedFrame::TurnOn => Frame::from_static(&TURN_ON),
        FixedFrame::TurnOff => Frame::from_static(&TURN_OFF),
        FixedFrame::KeepAlive => Frame::from_static(&KEEP_ALIVE),
        FixedFrame::Illuminate => Frame::from_static(&ILLUMINATE),
    }
}

/// Encode a brightness frame.
///
/// Wire format:
/// ```text
/// ┌──────┬──────┬─────────┬──────────────────┬──────────┐
/// │ 0x33 │ 0x04 │ percent │ 16 × 0x00        │ checksum │
/// └──────┴──────┴─────────┴──────────────────┴──────────┘
/// ```
pub fn encode_brightness(percent: i64) -> Result<Frame> {
    let percent = in_range("brightness", percent, MAX_BRIGHTNESS)?;

    let mut body = BytesMut::with_capacity(FRAME_LEN);
    body.put_u8(COMMAND_FAMILY);
    body.put_u8(OP_BRIGHTNESS);
    body.put_u8(percent);
    body.put_bytes(0x00, BODY_LEN - body.len());
    Ok(Frame::seal(body))
}

/// Encode a solid color frame.
///
/// Wire format:
/// ```text
/// ┌──────┬──────┬───────────┬─────┬─────┬─────┬──────────────────────────┬──────────┐
/// │ 0x33 │ 0x05 │ 0x15 0x01 │  R  │  G  │  B  │ 00×5 FF FF FF 3F 00×3    │ checksum │
/// └──────┴──────┴───────────┴─────┴─────┴─────┴──────────────────────────┴──────────┘
/// ```
pub fn encode_color(red: i64, green: i64, blue: i64) -> Result<Frame> {
    let red = in_range("red", red, MAX_CHANNEL)?;
    let green = in_range("green", green, MAX_CHANNEL)?;
    let blue = in_range("blue", blue, MAX_CHANNEL)?;

    let mut body = BytesMut::with_capacity(FRAME_LEN);
    body.put_u8(COMMAND_FAMILY);
    body.put_u8(OP_COLOR);
    body.put_slice(&COLOR_MODE_MANUAL);
    body.put_slice(&[red, green, blue]);
    body.put_slice(&COLOR_TAIL);
    Ok(Frame::seal(body))
}

/// Encode a parsed text command.
///
/// Returns `Ok(None)` for commands that never reach the radio
/// ([`LogicalCommand::Disconnect`] and [`LogicalCommand::Unknown`]).
pub fn encode_command(command: &LogicalCommand) -> Result<Option<Frame>> {
    let frame = match command {
        LogicalCommand::TurnOn => encode_fixed(FixedFrame::TurnOn),
        LogicalCommand::TurnOff => encode_fixed(FixedFrame::TurnOff),
        LogicalCommand::Illuminate => encode_fixed(FixedFrame::Illuminate),
        LogicalCommand::SetBrightness(percent) => encode_brightness(*percent)?,
        LogicalCommand::SetColor(red, green, blue) => encode_color(*red, *green, *blue)?,
        LogicalCommand::Disconnect | LogicalCommand::Unknown(_) => return Ok(None),
    };
    tracing::trace!(%command, frame = %frame, "encoded command");
    Ok(Some(frame))
}

fn in_range(name: &'static str, value: i64, max: i64) -> Result<u8> {
    if !(0..=max).contains(&value) {
        return Err(FrameError::InvalidParameter {
            name,
            value,
            min: 0,
            max,
        });
    }
    Ok(value as u8)
}
