//! Field codecs shared by the GDL90 and UAT decoders.
//!
//! Callers bounds-check the buffer before calling the fixed-offset readers
//! here; the readers themselves index directly.

use serde::Serialize;

/// Degrees per LSB of a 24-bit geodetic field (180 / 2^23).
pub const LAT_LON_RESOLUTION: f64 = 180.0 / 8_388_608.0;

/// Raw 12-bit altitude value reserved for "no altitude".
pub const ALTITUDE_INVALID: u16 = 0xFFF;

/// Rules applied to fields where deployed receivers and the GDL90 ICD disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Convention {
    /// Vertical velocity sign handled by the legacy range test, UAT latitude
    /// above 90 reduced by 90. Matches existing consumers of the output.
    #[default]
    Legacy,
    /// 12-bit two's complement vertical velocity, UAT latitude wrapped at 180.
    Icd,
}

impl Convention {
    pub fn as_str(&self) -> &'static str {
        match self {
            Convention::Legacy => "legacy",
            Convention::Icd => "icd",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Some(Convention::Legacy),
            "icd" => Some(Convention::Icd),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Integer reads
// ---------------------------------------------------------------------------

pub fn be_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

pub fn be_i16(buf: &[u8], offset: usize) -> i16 {
    i16::from_be_bytes([buf[offset], buf[offset + 1]])
}

pub fn be_u24(buf: &[u8], offset: usize) -> u32 {
    (buf[offset] as u32) << 16 | (buf[offset + 1] as u32) << 8 | buf[offset + 2] as u32
}

pub fn be_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

pub fn le_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

pub fn le_u24(buf: &[u8], offset: usize) -> u32 {
    buf[offset] as u32 | (buf[offset + 1] as u32) << 8 | (buf[offset + 2] as u32) << 16
}

// ---------------------------------------------------------------------------
// Geodetic fixed point
// ---------------------------------------------------------------------------

/// Signed 24-bit fixed-point coordinate in degrees.
pub fn geodetic_24(raw: u32) -> f64 {
    let raw = (raw & 0xFF_FFFF) as i32;
    let signed = if raw >= 0x80_0000 { raw - 0x100_0000 } else { raw };
    signed as f64 * LAT_LON_RESOLUTION
}

/// Unsigned coordinate field (UAT 23/24-bit lat/lon) in degrees.
pub fn geodetic_unsigned(raw: u32) -> f64 {
    raw as f64 * LAT_LON_RESOLUTION
}

/// Latitude decodes above 90 carry a 90 degree offset.
pub fn normalize_latitude(deg: f64) -> f64 {
    if deg > 90.0 {
        deg - 90.0
    } else {
        deg
    }
}

pub fn normalize_longitude(deg: f64) -> f64 {
    if deg > 180.0 {
        deg - 360.0
    } else {
        deg
    }
}

/// UAT latitude under the selected convention.
pub fn uat_latitude(raw23: u32, convention: Convention) -> f64 {
    let deg = geodetic_unsigned(raw23);
    match convention {
        Convention::Legacy => normalize_latitude(deg),
        Convention::Icd if deg > 90.0 => deg - 180.0,
        Convention::Icd => deg,
    }
}

// ---------------------------------------------------------------------------
// Altitude and velocity
// ---------------------------------------------------------------------------

/// 12-bit altitude code to feet (25 ft steps from -1000 ft).
pub fn altitude_ft(raw: u16) -> i32 {
    raw as i32 * 25 - 1000
}

/// GDL90 traffic altitude; `None` for the reserved value.
pub fn traffic_altitude(raw: u16) -> Option<i32> {
    if raw == ALTITUDE_INVALID {
        None
    } else {
        Some(altitude_ft(raw))
    }
}

/// Map the 12-bit horizontal velocity onto its stored value.
pub fn horizontal_velocity(raw: u16) -> u16 {
    match raw {
        0xFFF => crate::types::HVEL_NO_DATA,
        0xFFE => crate::types::HVEL_SATURATED,
        kt => kt,
    }
}

/// 12-bit vertical velocity in ft/min.
pub fn vertical_velocity(raw: u16, convention: Convention) -> i32 {
    let raw = raw & 0xFFF;
    match convention {
        Convention::Legacy => {
            if raw <= 0x1FD {
                raw as i32 * 64
            } else if raw == 0x800 {
                0
            } else {
                -((raw & 0x7FFF) as i32) * 64
            }
        }
        Convention::Icd => {
            if raw == 0x800 {
                0
            } else if raw & 0x800 != 0 {
                (raw as i32 - 0x1000) * 64
            } else {
                raw as i32 * 64
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Callsigns
// ---------------------------------------------------------------------------

/// Eight-byte ASCII callsign: cut at the first NUL, trailing spaces removed.
pub fn trim_callsign(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let text: String = bytes[..end].iter().map(|&b| b as char).collect();
    text.trim_end_matches(' ').to_string()
}

/// UAT base-40 character set. Index 36 is space; 37 is '.'; 38-39 are unused.
pub const BASE40_CHARSET: &[u8; 40] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ .  ";

/// Decode the six-byte base-40 block of a UAT mode status element.
///
/// Returns `(emitter_category, callsign)`; the callsign is 8 characters
/// before trimming.
pub fn decode_base40(bytes: &[u8]) -> (u8, String) {
    let ch = |v: u16| BASE40_CHARSET[(v % 40) as usize] as char;

    let v1 = be_u16(bytes, 0);
    let v2 = be_u16(bytes, 2);
    let v3 = be_u16(bytes, 4);

    let emitter = ((v1 / 1600) % 40) as u8;
    let callsign: String = [
        ch(v1 / 40),
        ch(v1),
        ch(v2 / 1600),
        ch(v2 / 40),
        ch(v2),
        ch(v3 / 1600),
        ch(v3 / 40),
        ch(v3),
    ]
    .iter()
    .collect();

    (emitter, callsign.trim_end().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
