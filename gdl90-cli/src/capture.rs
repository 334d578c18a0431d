//! Capture file input for GDL90 data.
//!
//! Input modes:
//! - Binary: a raw byte stream as recorded from a serial port or UDP socket,
//!   split on 0x7E flag bytes
//! - Hex text: one frame per line, optionally `hex;timestamp`
//!
//! Frames come out still stuffed and flag-delimited; the decoder does the rest.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use gdl90_core::frame::FLAG_BYTE;
use gdl90_core::types::hex_decode;

/// Seconds added per frame when the capture carries no timestamps.
const AUTO_INTERVAL: f64 = 0.1;

/// One flag-delimited frame from a capture.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub bytes: Vec<u8>,
    pub timestamp: f64,
}

/// Read every frame from a capture file.
///
/// `force_hex` skips format detection and parses the file as hex text.
pub fn read_capture(path: &Path, force_hex: bool) -> io::Result<Vec<RawFrame>> {
    let data = fs::read(path)?;
    let hex = force_hex || looks_like_hex(&data);
    let frames: Vec<RawFrame> = if hex {
        read_hex(&String::from_utf8_lossy(&data))
    } else {
        split_stream(&data)
            .into_iter()
            .enumerate()
            .map(|(i, bytes)| RawFrame {
                bytes,
                timestamp: i as f64 * AUTO_INTERVAL,
            })
            .collect()
    };
    debug!(path = %path.display(), hex, frames = frames.len(), "capture read");
    Ok(frames)
}

/// True when every byte is something a hex capture would contain.
pub fn looks_like_hex(data: &[u8]) -> bool {
    let mut text = String::from_utf8_lossy(data).into_owned();
    // Comment lines may hold anything.
    text = text
        .lines()
        .filter(|l| !l.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");
    !text.trim().is_empty()
        && text
            .bytes()
            .all(|b| b.is_ascii_hexdigit() || b.is_ascii_whitespace() || b == b';' || b == b'.')
}

// ---------------------------------------------------------------------------
// Binary stream
// ---------------------------------------------------------------------------

/// Split a byte stream into flag-delimited frames.
///
/// Adjacent frames may share a flag (`7E a 7E b 7E`) or carry their own
/// (`7E a 7E 7E b 7E`). Bytes before the first flag and after the last are
/// dropped as partial frames.
pub fn split_stream(data: &[u8]) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    let mut start: Option<usize> = None;

    for (i, &b) in data.iter().enumerate() {
        if b != FLAG_BYTE {
            continue;
        }
        if let Some(s) = start {
            if i > s + 1 {
                frames.push(data[s..=i].to_vec());
            }
        }
        start = Some(i);
    }

    frames
}

// ---------------------------------------------------------------------------
// Hex text
// ---------------------------------------------------------------------------

/// Parse hex text, one frame per line.
pub fn read_hex(text: &str) -> Vec<RawFrame> {
    let mut frames = Vec::new();
    let mut timestamp = 0.0f64;

    for (lineno, line) in text.lines().enumerate() {
        let Some((hex, ts)) = split_timestamp(line) else {
            continue;
        };
        let ts = ts.unwrap_or(timestamp);
        timestamp = ts + AUTO_INTERVAL;

        match clean_hex_line(hex) {
            Some(bytes) => frames.push(RawFrame {
                bytes,
                timestamp: ts,
            }),
            None => warn!(line = lineno + 1, "skipping line that is not hex"),
        }
    }

    frames
}

/// Separate an optional `;timestamp` suffix. `None` for blank and comment lines.
fn split_timestamp(line: &str) -> Option<(&str, Option<f64>)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    match line.split_once(';') {
        Some((h, t)) => Some((h.trim(), t.trim().parse::<f64>().ok())),
        None => Some((line, None)),
    }
}

/// Decode a hex line into a flag-delimited frame.
///
/// Lines without flags are taken as the stuffed frame body and wrapped.
pub fn clean_hex_line(line: &str) -> Option<Vec<u8>> {
    let bytes = hex_decode(line.trim())?;
    if bytes.is_empty() {
        return None;
    }
    if bytes.first() == Some(&FLAG_BYTE) && bytes.last() == Some(&FLAG_BYTE) && bytes.len() > 1
    {
        return Some(bytes);
    }

    let mut framed = Vec::with_capacity(bytes.len() + 2);
    framed.push(FLAG_BYTE);
    framed.extend_from_slice(&bytes);
    framed.push(FLAG_BYTE);
    Some(framed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
