//! Stateful GDL90 decoder.
//!
//! Pure state machine: call `decode()` with one flag-delimited frame, get
//! back an `Outcome`. Traffic and ownship reports land in the owned
//! `TrafficTable`; the latest heartbeat, vendor status and UAT messages are
//! kept on the instance for the query surface.
//!
//! A frame either decodes completely or leaves the decoder untouched apart
//! from its counters.

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::codec::Convention;
use crate::decode;
use crate::frame::parse_frame;
use crate::table::{TableMode, TrafficTable};
use crate::types::*;
use crate::uat::{self, Uplink, UatReportMessage};

/// External consumer of Mode S payloads found in UAT reports.
///
/// Receives 7 bytes for downlink format 0 and 14 bytes for format 16.
pub trait ModeSDecoder {
    fn decode(&mut self, msg: &[u8], timestamp: f64);
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do with a traffic/ownship report whose CRC does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CrcPolicy {
    /// Drop the report and return `CrcMismatch`.
    #[default]
    Reject,
    /// Log and count the mismatch, then store the report anyway.
    Report,
    /// Skip the check.
    Ignore,
}

impl CrcPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrcPolicy::Reject => "reject",
            CrcPolicy::Report => "report",
            CrcPolicy::Ignore => "ignore",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Some(CrcPolicy::Reject),
            "report" => Some(CrcPolicy::Report),
            "ignore" => Some(CrcPolicy::Ignore),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DecoderConfig {
    pub crc_policy: CrcPolicy,
    pub convention: Convention,
    pub table_mode: TableMode,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// A successfully decoded message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Heartbeat(HeartbeatStatus),
    /// Traffic or ownship report stored at `index` in the table.
    Traffic {
        index: usize,
        inserted: bool,
        ownship: bool,
    },
    GeoAltitude(OwnshipGeoAltitude),
    Uplink(Uplink),
    UatReport {
        report: UatReportMessage,
        /// True when the payload was handed to the Mode S decoder.
        mode_s_forwarded: bool,
    },
    StratuxHeartbeat(StratuxHeartbeat),
    StratuxAhrs(AhrsSample),
    ForeFlightAhrs(AhrsSample),
    ReceiverStatus(ReceiverStatus),
}

/// Result of feeding one frame to the decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Decoded(Message),
    /// Well-formed frame of a type this decoder does not interpret.
    Unhandled { msg_id: u8, sub_id: Option<u8> },
}

/// Per-decoder counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecoderStats {
    pub frames: u64,
    pub decoded: u64,
    pub unhandled: u64,
    pub framing_errors: u64,
    pub length_errors: u64,
    pub crc_failures: u64,
    pub app_frame_errors: u64,
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Decoder {
    config: DecoderConfig,
    table: TrafficTable,

    heartbeat: Option<HeartbeatStatus>,
    stratux_heartbeat: Option<StratuxHeartbeat>,
    stratux_ahrs: Option<AhrsSample>,
    foreflight_ahrs: Option<AhrsSample>,
    receiver_status: Option<ReceiverStatus>,
    geo_altitude: Option<OwnshipGeoAltitude>,
    last_uplink: Option<Uplink>,
    last_uat_report: Option<UatReportMessage>,

    last_message_type: Option<u16>,
    last_callsign: Option<String>,
    last_data_index: Option<usize>,
    ownship_callsign: Option<String>,

    mode_s: Option<Box<dyn ModeSDecoder>>,
    stats: DecoderStats,
}

impl Decoder {
    pub fn new(config: DecoderConfig) -> Self {
        Decoder {
            config,
            table: TrafficTable::new(config.table_mode),
            ..Default::default()
        }
    }

    /// Attach a consumer for Mode S payloads carried in UAT reports.
    pub fn with_mode_s(mut self, mode_s: Box<dyn ModeSDecoder>) -> Self {
        self.mode_s = Some(mode_s);
        self
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode one flag-delimited frame received at `timestamp`.
    pub fn decode(&mut self, raw: &[u8], timestamp: f64) -> Result<Outcome> {
        self.stats.frames += 1;
        let frame = match parse_frame(raw, timestamp) {
            Ok(f) => f,
            Err(e) => {
                self.record_error(&e);
                return Err(e);
            }
        };
        self.dispatch(&frame.payload, timestamp)
    }

    /// Decode an already de-stuffed payload (message id, data, CRC).
    pub fn decode_payload(&mut self, payload: &[u8], timestamp: f64) -> Result<Outcome> {
        self.stats.frames += 1;
        self.dispatch(payload, timestamp)
    }

    fn dispatch(&mut self, payload: &[u8], timestamp: f64) -> Result<Outcome> {
        let Some(&msg_id) = payload.first() else {
            let e = Gdl90Error::Framing("no message id");
            self.record_error(&e);
            return Err(e);
        };

        self.last_message_type = Some(match (msg_id, payload.get(1)) {
            (MSG_STRATUX_STATUS, Some(&STRATUX_STATUS_SUB_ID)) => STRATUX_STATUS_TYPE,
            _ => msg_id as u16,
        });

        match self.decode_message(msg_id, payload, timestamp) {
            Ok(outcome) => {
                match &outcome {
                    Outcome::Decoded(_) => {
                        self.stats.decoded += 1;
                        trace!(msg_id, name = message_name(msg_id), "decoded");
                    }
                    Outcome::Unhandled { msg_id, sub_id } => {
                        self.stats.unhandled += 1;
                        debug!(
                            msg_id,
                            ?sub_id,
                            payload = %hex_encode(payload),
                            "unhandled message type"
                        );
                    }
                }
                Ok(outcome)
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    fn decode_message(&mut self, msg_id: u8, payload: &[u8], ts: f64) -> Result<Outcome> {
        let message = match msg_id {
            MSG_HEARTBEAT => {
                let hb = decode::decode_heartbeat(payload)?;
                self.heartbeat = Some(hb.clone());
                Message::Heartbeat(hb)
            }
            MSG_UPLINK => {
                let uplink = uat::decode_uplink(payload, self.config.convention)?;
                self.last_uplink = Some(uplink.clone());
                Message::Uplink(uplink)
            }
            MSG_OWNSHIP | MSG_TRAFFIC => self.handle_traffic(payload, ts)?,
            MSG_OWNSHIP_GEO_ALTITUDE => {
                let geo = decode::decode_geo_altitude(payload)?;
                self.geo_altitude = Some(geo);
                Message::GeoAltitude(geo)
            }
            MSG_BASIC_REPORT | MSG_LONG_REPORT => self.handle_uat_report(payload, ts)?,
            MSG_STRATUX_HEARTBEAT => {
                let hb = decode::decode_stratux_heartbeat(payload)?;
                self.stratux_heartbeat = Some(hb);
                Message::StratuxHeartbeat(hb)
            }
            MSG_STRATUX_AHRS => {
                let ahrs = decode::decode_stratux_ahrs(payload)?;
                self.stratux_ahrs = Some(ahrs);
                Message::StratuxAhrs(ahrs)
            }
            MSG_STRATUX_STATUS if payload.get(1) == Some(&STRATUX_STATUS_SUB_ID) => {
                let status = decode::decode_stratux_status(payload)?;
                self.receiver_status = Some(status.clone());
                Message::ReceiverStatus(status)
            }
            MSG_FOREFLIGHT if payload.get(1) == Some(&FOREFLIGHT_AHRS) => {
                let ahrs = decode::decode_foreflight_ahrs(payload)?;
                self.foreflight_ahrs = Some(ahrs);
                Message::ForeFlightAhrs(ahrs)
            }
            MSG_STRATUX_STATUS | MSG_FOREFLIGHT => {
                return Ok(Outcome::Unhandled {
                    msg_id,
                    sub_id: payload.get(1).copied(),
                })
            }
            _ => return Ok(Outcome::Unhandled { msg_id, sub_id: None }),
        };
        Ok(Outcome::Decoded(message))
    }

    fn handle_traffic(&mut self, payload: &[u8], ts: f64) -> Result<Message> {
        let report = decode::decode_traffic(payload, self.config.convention)?;

        match self.config.crc_policy {
            CrcPolicy::Reject => decode::check_traffic_crc(payload)?,
            CrcPolicy::Report => {
                if let Err(e) = decode::check_traffic_crc(payload) {
                    self.stats.crc_failures += 1;
                    warn!(callsign = %report.callsign, error = %e, "storing report with bad CRC");
                }
            }
            CrcPolicy::Ignore => {}
        }

        let ownship = report.is_ownship;
        let callsign = report.callsign.clone();
        let up = self.table.upsert(report, ts);

        if ownship && up.inserted {
            debug!(callsign = %callsign, "ownship identified");
            self.ownship_callsign = Some(callsign.clone());
        }
        self.last_callsign = Some(callsign);
        self.last_data_index = Some(up.index);

        Ok(Message::Traffic {
            index: up.index,
            inserted: up.inserted,
            ownship,
        })
    }

    fn handle_uat_report(&mut self, payload: &[u8], ts: f64) -> Result<Message> {
        let report = uat::decode_report_message(payload, self.config.convention)?;

        let mut mode_s_forwarded = false;
        if let Some(mode_s) = self.mode_s.as_mut() {
            if let Some(bytes) = uat::mode_s_bytes(uat::report_payload(payload)?) {
                mode_s.decode(bytes, ts);
                mode_s_forwarded = true;
            }
        }

        self.last_uat_report = Some(report.clone());
        Ok(Message::UatReport {
            report,
            mode_s_forwarded,
        })
    }

    fn record_error(&mut self, e: &Gdl90Error) {
        match e {
            Gdl90Error::Framing(reason) => {
                self.stats.framing_errors += 1;
                debug!(reason, "framing error");
            }
            Gdl90Error::Length {
                msg_id,
                expected,
                actual,
            } => {
                self.stats.length_errors += 1;
                debug!(msg_id, expected, actual, "message too short");
            }
            Gdl90Error::CrcMismatch {
                msg_id,
                expected,
                computed,
            } => {
                self.stats.crc_failures += 1;
                warn!(msg_id, expected, computed, "CRC mismatch, report dropped");
            }
            Gdl90Error::AppFrame { offset, reason } => {
                self.stats.app_frame_errors += 1;
                warn!(offset, reason, "uplink application data rejected");
            }
            other => debug!(error = %other, "decode failed"),
        }
    }

    // -- Query surface ------------------------------------------------------

    pub fn table(&self) -> &TrafficTable {
        &self.table
    }

    /// Mutable table access for enrichment setters.
    pub fn table_mut(&mut self) -> &mut TrafficTable {
        &mut self.table
    }

    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// Number of traffic table entries.
    pub fn traffic_count(&self) -> usize {
        self.table.len()
    }

    /// Message id of the last frame seen; `0x5358` for receiver status.
    pub fn last_message_type(&self) -> Option<u16> {
        self.last_message_type
    }

    pub fn last_callsign(&self) -> Option<&str> {
        self.last_callsign.as_deref()
    }

    pub fn last_data_index(&self) -> Option<usize> {
        self.last_data_index
    }

    pub fn ownship_callsign(&self) -> Option<&str> {
        self.ownship_callsign.as_deref()
    }

    pub fn heartbeat(&self) -> Option<&HeartbeatStatus> {
        self.heartbeat.as_ref()
    }

    /// Seconds since 0000Z from the latest heartbeat.
    pub fn latest_timestamp(&self) -> Option<u32> {
        self.heartbeat.as_ref().map(|hb| hb.timestamp)
    }

    pub fn stratux_heartbeat(&self) -> Option<&StratuxHeartbeat> {
        self.stratux_heartbeat.as_ref()
    }

    pub fn stratux_ahrs(&self) -> Option<&AhrsSample> {
        self.stratux_ahrs.as_ref()
    }

    pub fn foreflight_ahrs(&self) -> Option<&AhrsSample> {
        self.foreflight_ahrs.as_ref()
    }

    pub fn receiver_status(&self) -> Option<&ReceiverStatus> {
        self.receiver_status.as_ref()
    }

    pub fn geo_altitude(&self) -> Option<&OwnshipGeoAltitude> {
        self.geo_altitude.as_ref()
    }

    pub fn last_uplink(&self) -> Option<&Uplink> {
        self.last_uplink.as_ref()
    }

    pub fn last_uat_report(&self) -> Option<&UatReportMessage> {
        self.last_uat_report.as_ref()
    }

    pub fn satellite_count(&self) -> Option<u8> {
        self.receiver_status.as_ref().map(|s| s.satellites_locked)
    }

    /// UAT and 1090 targets reported by the receiver.
    pub fn target_count(&self) -> Option<u32> {
        self.receiver_status
            .as_ref()
            .map(|s| s.targets_978 as u32 + s.targets_1090 as u32)
    }

    pub fn tower_count(&self) -> Option<usize> {
        self.receiver_status.as_ref().map(|s| s.tower_count())
    }

    /// Forget all traffic and bookkeeping. Counters and config are kept.
    pub fn clear(&mut self) {
        self.table.clear();
        self.last_callsign = None;
        self.last_data_index = None;
        self.ownship_callsign = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc;
    use crate::frame::encode_frame;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Heartbeat: UTC OK, timestamp 12345 s.
    const HEARTBEAT_FRAME: &[u8] = &[
        0x7E, 0x00, 0x81, 0x01, 0x39, 0x30, 0x00, 0x05, 0xE7, 0x15, 0x7E,
    ];

    /// Traffic "N12345", address 0xA1B27E (stuffed), 45.0 / -90.0, 5000 ft.
    const TRAFFIC_FRAME: &[u8] = &[
        0x7E, 0x14, 0x00, 0xA1, 0xB2, 0x7D, 0x5E, 0x20, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x0F,
        0x09, 0x89, 0x07, 0x80, 0x0A, 0x40, 0x01, 0x4E, 0x31, 0x32, 0x33, 0x34, 0x35, 0x20,
        0x20, 0x00, 0x3A, 0xFF, 0x7E,
    ];

    /// Same aircraft, latitude moved to 46.40625.
    const TRAFFIC_FRAME_MOVED: &[u8] = &[
        0x7E, 0x14, 0x00, 0xA1, 0xB2, 0x7D, 0x5E, 0x21, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x0F,
        0x09, 0x89, 0x07, 0x80, 0x0A, 0x40, 0x01, 0x4E, 0x31, 0x32, 0x33, 0x34, 0x35, 0x20,
        0x20, 0x00, 0xCC, 0x2A, 0x7E,
    ];

    fn traffic_message(msg_id: u8, callsign: &[u8; 8]) -> Vec<u8> {
        let mut msg = vec![
            msg_id, 0x00, 0xA1, 0xB2, 0x7E, 0x20, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x0F, 0x09,
            0x89, 0x07, 0x80, 0x0A, 0x40, 0x01,
        ];
        msg.extend_from_slice(callsign);
        msg.push(0x00);
        msg
    }

    // -- End to end ---------------------------------------------------------

    #[test]
    fn test_heartbeat_then_traffic() {
        let mut dec = Decoder::default();

        let out = dec.decode(HEARTBEAT_FRAME, 1.0).unwrap();
        match out {
            Outcome::Decoded(Message::Heartbeat(hb)) => {
                assert!(hb.utc_ok);
                assert!(hb.gps_position_valid);
                assert_eq!(hb.timestamp, 12345);
            }
            other => panic!("expected heartbeat, got {other:?}"),
        }
        assert_eq!(dec.latest_timestamp(), Some(12345));

        let out = dec.decode(TRAFFIC_FRAME, 2.0).unwrap();
        assert_eq!(
            out,
            Outcome::Decoded(Message::Traffic {
                index: 0,
                inserted: true,
                ownship: false
            })
        );

        let entry = dec.table().find("N12345").unwrap();
        assert_eq!(entry.report.participant_address, 0xA1B27E);
        assert_eq!(entry.report.latitude, 45.0);
        assert_eq!(entry.report.longitude, -90.0);
        assert_eq!(entry.report.altitude_ft, Some(5000));
        assert_eq!(entry.report.horizontal_velocity_kt, 120);
        assert_eq!(entry.report.vertical_velocity_fpm, 640);
        assert_eq!(entry.report.track_deg, 90.0);
        assert_eq!(entry.report.integrity_code, 8);
        assert_eq!(entry.report.accuracy_code, 9);
        assert_eq!(entry.report.emitter_category, EmitterCategory::Light);

        assert_eq!(dec.last_callsign(), Some("N12345"));
        assert_eq!(dec.last_data_index(), Some(0));
        assert_eq!(dec.last_message_type(), Some(MSG_TRAFFIC as u16));
        assert_eq!(dec.stats().decoded, 2);
    }

    #[test]
    fn test_repeat_traffic_updates_in_place() {
        let mut dec = Decoder::default();
        dec.decode(TRAFFIC_FRAME, 1.0).unwrap();
        dec.table_mut()
            .set_range_bearing(
                "N12345",
                RangeBearing {
                    range_nm: 3.0,
                    bearing_deg: 180.0,
                },
            )
            .unwrap();

        let out = dec.decode(TRAFFIC_FRAME_MOVED, 2.0).unwrap();
        assert_eq!(
            out,
            Outcome::Decoded(Message::Traffic {
                index: 0,
                inserted: false,
                ownship: false
            })
        );
        assert_eq!(dec.traffic_count(), 1);
        assert_eq!(dec.table().location("N12345").unwrap().0, 46.40625);
        assert_eq!(dec.table().range_bearing("N12345").unwrap().range_nm, 3.0);
    }

    #[test]
    fn test_append_mode_keeps_every_report() {
        let mut dec = Decoder::new(DecoderConfig {
            table_mode: TableMode::Append,
            ..Default::default()
        });
        dec.decode(TRAFFIC_FRAME, 1.0).unwrap();
        dec.decode(TRAFFIC_FRAME_MOVED, 2.0).unwrap();
        assert_eq!(dec.traffic_count(), 2);
        assert_eq!(dec.last_data_index(), Some(1));
    }

    // -- CRC policy ---------------------------------------------------------

    fn corrupted_traffic() -> Vec<u8> {
        let mut raw = TRAFFIC_FRAME.to_vec();
        let n = raw.len();
        raw[n - 2] ^= 0x01;
        raw
    }

    #[test]
    fn test_crc_reject_leaves_table_untouched() {
        let mut dec = Decoder::default();
        let err = dec.decode(&corrupted_traffic(), 1.0).unwrap_err();
        assert!(matches!(err, Gdl90Error::CrcMismatch { msg_id: 0x14, .. }));
        assert!(dec.table().is_empty());
        assert_eq!(dec.last_callsign(), None);
        assert_eq!(dec.stats().crc_failures, 1);
        assert_eq!(dec.stats().decoded, 0);
    }

    #[test]
    fn test_crc_report_stores_and_counts() {
        let mut dec = Decoder::new(DecoderConfig {
            crc_policy: CrcPolicy::Report,
            ..Default::default()
        });
        dec.decode(&corrupted_traffic(), 1.0).unwrap();
        assert_eq!(dec.traffic_count(), 1);
        assert_eq!(dec.stats().crc_failures, 1);
    }

    #[test]
    fn test_crc_ignore() {
        let mut dec = Decoder::new(DecoderConfig {
            crc_policy: CrcPolicy::Ignore,
            ..Default::default()
        });
        dec.decode(&corrupted_traffic(), 1.0).unwrap();
        assert_eq!(dec.traffic_count(), 1);
        assert_eq!(dec.stats().crc_failures, 0);
    }

    #[test]
    fn test_crc_policy_parse() {
        assert_eq!(CrcPolicy::parse("Reject"), Some(CrcPolicy::Reject));
        assert_eq!(CrcPolicy::parse(" report "), Some(CrcPolicy::Report));
        assert_eq!(CrcPolicy::parse("ignore"), Some(CrcPolicy::Ignore));
        assert_eq!(CrcPolicy::parse("maybe"), None);
        assert_eq!(CrcPolicy::Report.as_str(), "report");
    }

    // -- Ownship ------------------------------------------------------------

    #[test]
    fn test_ownship_callsign_follows_new_entry() {
        let mut dec = Decoder::default();
        dec.decode(&encode_frame(&traffic_message(MSG_OWNSHIP, b"OWN1    ")), 1.0)
            .unwrap();
        dec.decode(&encode_frame(&traffic_message(MSG_OWNSHIP, b"OWN2    ")), 2.0)
            .unwrap();
        assert_eq!(dec.ownship_callsign(), Some("OWN2"));
        assert!(dec.table().find("OWN1").unwrap().report.is_ownship);
        assert_eq!(dec.traffic_count(), 2);

        // An update of an existing entry does not change the identity.
        dec.decode(&encode_frame(&traffic_message(MSG_OWNSHIP, b"OWN1    ")), 3.0)
            .unwrap();
        assert_eq!(dec.ownship_callsign(), Some("OWN2"));
    }

    #[test]
    fn test_ownship_blank_callsign_replaced() {
        let mut dec = Decoder::default();
        dec.decode(&encode_frame(&traffic_message(MSG_OWNSHIP, b"        ")), 1.0)
            .unwrap();
        assert_eq!(dec.ownship_callsign(), Some(""));
        dec.decode(&encode_frame(&traffic_message(MSG_OWNSHIP, b"N512TX  ")), 2.0)
            .unwrap();
        assert_eq!(dec.ownship_callsign(), Some("N512TX"));
    }

    #[test]
    fn test_clear_resets_traffic() {
        let mut dec = Decoder::default();
        dec.decode(&encode_frame(&traffic_message(MSG_OWNSHIP, b"OWN1    ")), 1.0)
            .unwrap();
        dec.clear();
        assert_eq!(dec.traffic_count(), 0);
        assert_eq!(dec.ownship_callsign(), None);
        assert_eq!(dec.stats().decoded, 1);
    }

    // -- Errors and unhandled types -----------------------------------------

    #[test]
    fn test_framing_error() {
        let mut dec = Decoder::default();
        assert!(matches!(
            dec.decode(&[0x00, 0x81, 0x7E], 0.0),
            Err(Gdl90Error::Framing(_))
        ));
        assert!(matches!(dec.decode(&[], 0.0), Err(Gdl90Error::Framing(_))));
        assert!(matches!(
            dec.decode(&[0x7E, 0x7E], 0.0),
            Err(Gdl90Error::Framing(_))
        ));
        assert_eq!(dec.stats().framing_errors, 3);
        assert_eq!(dec.stats().frames, 3);
    }

    #[test]
    fn test_short_traffic_is_length_error() {
        let mut dec = Decoder::default();
        let err = dec.decode(&encode_frame(&[0x14, 0x00, 0xA1]), 0.0).unwrap_err();
        assert!(matches!(err, Gdl90Error::Length { msg_id: 0x14, .. }));
        assert_eq!(dec.stats().length_errors, 1);
        assert!(dec.table().is_empty());
    }

    #[test]
    fn test_unhandled_types() {
        let mut dec = Decoder::default();
        for msg in [
            vec![MSG_INITIALIZATION, 0x00, 0x00],
            vec![MSG_HEIGHT_ABOVE_TERRAIN, 0x01, 0x00],
            vec![b'T', 0x01],
            vec![0x42],
        ] {
            let out = dec.decode(&encode_frame(&msg), 0.0).unwrap();
            assert_eq!(
                out,
                Outcome::Unhandled {
                    msg_id: msg[0],
                    sub_id: None
                }
            );
        }
        let out = dec
            .decode(&encode_frame(&[MSG_FOREFLIGHT, FOREFLIGHT_ID, 0x01]), 0.0)
            .unwrap();
        assert_eq!(
            out,
            Outcome::Unhandled {
                msg_id: MSG_FOREFLIGHT,
                sub_id: Some(FOREFLIGHT_ID)
            }
        );
        assert_eq!(dec.stats().unhandled, 5);
        assert_eq!(dec.stats().decoded, 0);
    }

    // -- Vendor messages ----------------------------------------------------

    #[test]
    fn test_receiver_status_message_type() {
        let mut msg = vec![0u8; 29];
        msg[0] = MSG_STRATUX_STATUS;
        msg[1] = STRATUX_STATUS_SUB_ID;
        msg[16] = 9; // satellites locked
        msg[19] = 3; // 978 targets
        msg[21] = 4; // 1090 targets
        msg[28] = 1; // one tower
        msg.extend_from_slice(&[0x20, 0x00, 0x00, 0xC0, 0x00, 0x00]);

        let mut dec = Decoder::default();
        let out = dec.decode(&encode_frame(&msg), 0.0).unwrap();
        assert!(matches!(out, Outcome::Decoded(Message::ReceiverStatus(_))));
        assert_eq!(dec.last_message_type(), Some(STRATUX_STATUS_TYPE));
        assert_eq!(dec.satellite_count(), Some(9));
        assert_eq!(dec.target_count(), Some(7));
        assert_eq!(dec.tower_count(), Some(1));
        assert_eq!(dec.receiver_status().unwrap().towers[0], (45.0, -90.0));
    }

    #[test]
    fn test_stratux_heartbeat() {
        let mut dec = Decoder::default();
        dec.decode(&encode_frame(&[MSG_STRATUX_HEARTBEAT, 0x03, 0x01]), 0.0)
            .unwrap();
        let hb = dec.stratux_heartbeat().unwrap();
        assert!(hb.ahrs_valid && hb.gps_valid);
        assert_eq!(dec.last_message_type(), Some(0xCC));
    }

    #[test]
    fn test_foreflight_ahrs() {
        let msg = [
            MSG_FOREFLIGHT,
            FOREFLIGHT_AHRS,
            0x00,
            0x64, // roll 10.0
            0xFF,
            0x9C, // pitch -10.0
            0x83,
            0x84, // magnetic 90.0
            0xFF,
            0xFF, // no IAS
            0x00,
            0x78, // TAS 120
        ];
        let mut dec = Decoder::default();
        let out = dec.decode(&encode_frame(&msg), 0.0).unwrap();
        assert!(matches!(out, Outcome::Decoded(Message::ForeFlightAhrs(_))));
        let ahrs = dec.foreflight_ahrs().unwrap();
        assert_eq!(ahrs.roll_deg, 10.0);
        assert_eq!(ahrs.pitch_deg, -10.0);
        assert_eq!(ahrs.heading_deg, Some(90.0));
        assert!(ahrs.heading_magnetic);
        assert_eq!(ahrs.indicated_airspeed_kt, None);
        assert_eq!(ahrs.true_airspeed_kt, Some(120));
    }

    // -- Mode S forwarding --------------------------------------------------

    struct Recorder(Rc<RefCell<Vec<Vec<u8>>>>);

    impl ModeSDecoder for Recorder {
        fn decode(&mut self, msg: &[u8], _timestamp: f64) {
            self.0.borrow_mut().push(msg.to_vec());
        }
    }

    fn basic_report(first_byte: u8) -> Vec<u8> {
        let mut msg = vec![MSG_BASIC_REPORT, 0x10, 0x20, 0x30];
        let mut uat = vec![0u8; uat::BASIC_PAYLOAD_LEN];
        uat[0] = first_byte;
        for (i, b) in uat.iter_mut().enumerate().skip(1) {
            *b = i as u8;
        }
        msg.extend_from_slice(&uat);
        msg
    }

    #[test]
    fn test_mode_s_format_0_forwarded() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut dec = Decoder::default().with_mode_s(Box::new(Recorder(seen.clone())));

        // Payload type 0, qualifier 0, format 0.
        let out = dec.decode(&encode_frame(&basic_report(0x00)), 0.0).unwrap();
        match out {
            Outcome::Decoded(Message::UatReport {
                report,
                mode_s_forwarded,
            }) => {
                assert!(mode_s_forwarded);
                assert_eq!(report.time_of_reception, 0x302010);
                assert!(!report.long);
            }
            other => panic!("expected UAT report, got {other:?}"),
        }
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_mode_s_other_format_not_forwarded() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut dec = Decoder::default().with_mode_s(Box::new(Recorder(seen.clone())));

        // Payload type 7, format 24.
        dec.decode(&encode_frame(&basic_report(0x38)), 0.0).unwrap();
        assert!(seen.borrow().is_empty());
        assert!(dec.last_uat_report().is_some());
    }

    #[test]
    fn test_uat_report_without_mode_s_consumer() {
        let mut dec = Decoder::default();
        let out = dec.decode(&encode_frame(&basic_report(0x00)), 0.0).unwrap();
        assert!(matches!(
            out,
            Outcome::Decoded(Message::UatReport {
                mode_s_forwarded: false,
                ..
            })
        ));
    }

    // -- Uplink -------------------------------------------------------------

    #[test]
    fn test_uplink_bad_app_frame_counted() {
        // Header with app-data-valid set, then a frame claiming 0x40 bytes.
        let mut msg = vec![MSG_UPLINK, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x20, 0];
        msg.extend_from_slice(&[0x20, 0x00, 0xAA, 0xBB]);
        let mut payload = msg.clone();
        crc::append_crc(&mut payload);

        let mut dec = Decoder::default();
        let err = dec.decode_payload(&payload, 0.0).unwrap_err();
        assert!(matches!(err, Gdl90Error::AppFrame { offset: 0, .. }));
        assert_eq!(dec.stats().app_frame_errors, 1);
        assert!(dec.last_uplink().is_none());
    }

    #[test]
    fn test_uplink_decoded() {
        let mut msg = vec![MSG_UPLINK, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x20, 0];
        // One 4-byte frame of type 0, then padding.
        msg.extend_from_slice(&[0x02, 0x00, 0xAA, 0xBB, 0x00, 0x00]);

        let mut dec = Decoder::default();
        dec.decode(&encode_frame(&msg), 0.0).unwrap();
        let uplink = dec.last_uplink().unwrap();
        assert_eq!(uplink.frames.len(), 1);
        assert_eq!(uplink.frames[0].length, 4);
    }
}
