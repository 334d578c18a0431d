//! CRC-16 validation for GDL90 frames.
//!
//! CCITT polynomial 0x1021, MSB-first, initial value 0. The CRC covers the
//! message id and message data (everything between the flags, before
//! stuffing, except the CRC itself) and is transmitted least significant
//! byte first.

const POLYNOMIAL: u16 = 0x1021;

// ---------------------------------------------------------------------------
// CRC lookup table (compile-time)
// ---------------------------------------------------------------------------

const fn build_crc_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ POLYNOMIAL;
            } else {
                crc <<= 1;
            }
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static CRC_TABLE: [u16; 256] = build_crc_table();

// ---------------------------------------------------------------------------
// Core CRC functions
// ---------------------------------------------------------------------------

/// GDL90 CRC-16 of `data`.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for &byte in data {
        crc = CRC_TABLE[(crc >> 8) as usize] ^ (crc << 8) ^ byte as u16;
    }
    crc
}

/// Trailing CRC field of a de-stuffed payload (last two bytes, LSB first).
///
/// Returns `None` when the payload is too short to carry a CRC.
pub fn trailing_crc(payload: &[u8]) -> Option<u16> {
    if payload.len() < 3 {
        return None;
    }
    let n = payload.len();
    Some(u16::from_le_bytes([payload[n - 2], payload[n - 1]]))
}

/// Compare the trailing CRC field against the CRC of everything before it.
///
/// Returns `(carried, computed)`.
pub fn check(payload: &[u8]) -> Option<(u16, u16)> {
    let carried = trailing_crc(payload)?;
    let computed = crc16(&payload[..payload.len() - 2]);
    Some((carried, computed))
}

/// True when the payload's trailing CRC matches its contents.
pub fn validate(payload: &[u8]) -> bool {
    matches!(check(payload), Some((carried, computed)) if carried == computed)
}

/// Append the CRC of `message` in wire order.
pub fn append_crc(message: &mut Vec<u8>) {
    let crc = crc16(message);
    message.extend_from_slice(&crc.to_le_bytes());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
