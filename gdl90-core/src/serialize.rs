//! Delimited-text rendering of traffic table entries.
//!
//! One line per entry, fields in this order:
//! heartbeat timestamp, callsign, address type, address (hex), registration,
//! latitude, longitude, altitude, alert, misc, integrity, accuracy,
//! horizontal velocity, vertical velocity, track, emitter, emergency code,
//! range, bearing.

use crate::codec::ALTITUDE_INVALID;
use crate::decoder::Decoder;
use crate::table::TrafficEntry;

/// Altitude written when the report carries none.
pub const ALTITUDE_NOT_AVAILABLE: i32 = ALTITUDE_INVALID as i32 * 25 - 1000;

/// Render one entry as a newline-terminated delimited line.
///
/// `timestamp` is the latest heartbeat time, not the entry's own.
pub fn serialize_entry(entry: &TrafficEntry, timestamp: u32, delimiter: char) -> String {
    let r = &entry.report;
    let range = entry.range.unwrap_or_default();

    let fields = [
        timestamp.to_string(),
        r.callsign.clone(),
        r.address_type.code().to_string(),
        format!("{:x}", r.participant_address),
        entry.owner.registration.clone(),
        format!("{:.12}", r.latitude),
        format!("{:.12}", r.longitude),
        r.altitude_ft.unwrap_or(ALTITUDE_NOT_AVAILABLE).to_string(),
        r.alert_status.to_string(),
        r.misc_indicators.to_string(),
        r.integrity_code.to_string(),
        r.accuracy_code.to_string(),
        r.horizontal_velocity_kt.to_string(),
        r.vertical_velocity_fpm.to_string(),
        format!("{:.6}", r.track_deg),
        r.emitter_category.code().to_string(),
        r.emergency_code.code().to_string(),
        format!("{:.6}", range.range_nm),
        format!("{:.6}", range.bearing_deg),
    ];

    let mut line = fields.join(&delimiter.to_string());
    line.push('\n');
    line
}

/// Render the entry at `index` using the decoder's latest heartbeat time.
pub fn serialize_index(decoder: &Decoder, index: usize, delimiter: char) -> Option<String> {
    let entry = decoder.table().get(index)?;
    Some(serialize_entry(
        entry,
        decoder.latest_timestamp().unwrap_or(0),
        delimiter,
    ))
}

/// Every entry of the decoder's table, one line each.
pub fn serialize_table(decoder: &Decoder, delimiter: char) -> String {
    let ts = decoder.latest_timestamp().unwrap_or(0);
    decoder
        .table()
        .iter()
        .map(|e| serialize_entry(e, ts, delimiter))
        .collect()
}

/// Field names matching `serialize_entry`, for a header row.
pub fn header(delimiter: char) -> String {
    const NAMES: [&str; 19] = [
        "timestamp",
        "callsign",
        "address_type",
        "address",
        "registration",
        "latitude",
        "longitude",
        "altitude_ft",
        "alert",
        "misc",
        "integrity",
        "accuracy",
        "hvel_kt",
        "vvel_fpm",
        "track_deg",
        "emitter",
        "emergency",
        "range_nm",
        "bearing_deg",
    ];
    let mut line = NAMES.join(&delimiter.to_string());
    line.push('\n');
    line
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
