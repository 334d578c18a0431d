//! GDL90 link-layer framing.
//!
//! Responsibilities:
//! - Check the 0x7E flag bytes that bound every frame
//! - Remove byte stuffing (0x7D escape, next byte XOR 0x20)
//! - Package the logical payload into `Gdl90Frame`
//! - Build stuffed frames from messages (used by tests and tooling)
//!
//! Size checks per message type belong to the decoders, not here.

use crate::crc;
use crate::types::{message_name, Gdl90Error, Result};

pub const FLAG_BYTE: u8 = 0x7E;
pub const ESCAPE_BYTE: u8 = 0x7D;
const ESCAPE_XOR: u8 = 0x20;

// ---------------------------------------------------------------------------
// Stuffing
// ---------------------------------------------------------------------------

/// Strip the flags from `raw` and undo byte stuffing.
///
/// The first byte of the result is the message id. An escape as the last
/// byte before the closing flag has nothing to unescape and is rejected.
pub fn destuff(raw: &[u8]) -> Result<Vec<u8>> {
    if raw.is_empty() {
        return Err(Gdl90Error::Framing("empty buffer"));
    }
    if raw.len() < 2 || raw[0] != FLAG_BYTE || raw[raw.len() - 1] != FLAG_BYTE {
        return Err(Gdl90Error::Framing("missing flag byte"));
    }

    let inner = &raw[1..raw.len() - 1];
    let mut payload = Vec::with_capacity(inner.len());
    let mut bytes = inner.iter();
    while let Some(&b) = bytes.next() {
        if b == ESCAPE_BYTE {
            match bytes.next() {
                Some(&escaped) => payload.push(escaped ^ ESCAPE_XOR),
                None => return Err(Gdl90Error::Framing("dangling escape byte")),
            }
        } else {
            payload.push(b);
        }
    }
    Ok(payload)
}

/// Escape flag and escape bytes in `payload` and wrap it in flags.
pub fn stuff(payload: &[u8]) -> Vec<u8> {
    let mut raw = Vec::with_capacity(payload.len() + 4);
    raw.push(FLAG_BYTE);
    for &b in payload {
        if b == FLAG_BYTE || b == ESCAPE_BYTE {
            raw.push(ESCAPE_BYTE);
            raw.push(b ^ ESCAPE_XOR);
        } else {
            raw.push(b);
        }
    }
    raw.push(FLAG_BYTE);
    raw
}

/// Append the CRC to a message (id + data) and stuff it into a wire frame.
pub fn encode_frame(message: &[u8]) -> Vec<u8> {
    let mut payload = message.to_vec();
    crc::append_crc(&mut payload);
    stuff(&payload)
}

// ---------------------------------------------------------------------------
// Gdl90Frame
// ---------------------------------------------------------------------------

/// A de-stuffed GDL90 frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Gdl90Frame {
    /// Message id, data and trailing CRC.
    pub payload: Vec<u8>,
    /// Caller-supplied receive time.
    pub timestamp: f64,
}

impl Gdl90Frame {
    /// `None` for an empty payload.
    pub fn msg_id(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    pub fn msg_name(&self) -> Option<&'static str> {
        self.msg_id().map(message_name)
    }

    /// Message data without the id byte and CRC.
    pub fn data(&self) -> &[u8] {
        if self.payload.len() < 3 {
            return &[];
        }
        &self.payload[1..self.payload.len() - 2]
    }

    pub fn crc(&self) -> Option<u16> {
        crc::trailing_crc(&self.payload)
    }

    pub fn crc_ok(&self) -> bool {
        crc::validate(&self.payload)
    }
}

/// Parse one flag-delimited frame.
///
/// Fails on framing errors or when nothing remains between the flags.
pub fn parse_frame(raw: &[u8], timestamp: f64) -> Result<Gdl90Frame> {
    let payload = destuff(raw)?;
    if payload.is_empty() {
        return Err(Gdl90Error::Framing("no message id"));
    }
    Ok(Gdl90Frame { payload, timestamp })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
