//! Fixed-layout GDL90 report decoders.
//!
//! Each decoder takes the de-stuffed payload (message id first, CRC last),
//! checks its length before touching any field and returns a fresh record.
//!
//! Covers:
//! - 0x00 Heartbeat
//! - 0x0A/0x14 Ownship and Traffic reports
//! - 0x0B Ownship geometric altitude
//! - Vendor extensions: Stratux heartbeat (0xCC), Stratux AHRS (0x4C),
//!   Stratux receiver status (0x53 'X'), ForeFlight AHRS (0x65 0x01)

use crate::codec::{self, Convention};
use crate::crc;
use crate::types::*;

/// Trailing CRC bytes on every GDL90 message.
pub const CRC_LEN: usize = 2;

pub const HEARTBEAT_LEN: usize = 7 + CRC_LEN;
pub const TRAFFIC_LEN: usize = 28 + CRC_LEN;
pub const GEO_ALTITUDE_LEN: usize = 5 + CRC_LEN;
pub const STRATUX_HEARTBEAT_LEN: usize = 3 + CRC_LEN;
pub const STRATUX_AHRS_LEN: usize = 16 + CRC_LEN;
pub const STRATUX_STATUS_LEN: usize = 29 + CRC_LEN;
pub const FOREFLIGHT_AHRS_LEN: usize = 12 + CRC_LEN;

const STRATUX_INVALID: i16 = 0x7FFF;
const FOREFLIGHT_INVALID: u16 = 0xFFFF;

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

/// Decode a heartbeat. The CRC field is stored as received, not checked.
pub fn decode_heartbeat(payload: &[u8]) -> Result<HeartbeatStatus> {
    ensure_len(payload, HEARTBEAT_LEN)?;

    let s1 = payload[1];
    let s2 = payload[2];
    let timestamp_msb = s2 & 0x80 != 0;

    Ok(HeartbeatStatus {
        gps_position_valid: s1 & 0x80 != 0,
        maintenance_required: s1 & 0x40 != 0,
        ident: s1 & 0x20 != 0,
        address_type_talkback: s1 & 0x10 != 0,
        gps_battery_low: s1 & 0x08 != 0,
        ratcs: s1 & 0x04 != 0,
        uat_initialized: s1 & 0x01 != 0,
        timestamp_msb,
        csa_requested: s2 & 0x40 != 0,
        csa_not_available: s2 & 0x20 != 0,
        utc_ok: s2 & 0x01 != 0,
        // Low 16 bits are sent LSB first.
        timestamp: (timestamp_msb as u32) << 16 | codec::le_u16(payload, 3) as u32,
        message_count: codec::be_u16(payload, 5),
        crc: codec::le_u16(payload, 7),
    })
}

// ---------------------------------------------------------------------------
// Traffic / Ownship
// ---------------------------------------------------------------------------

/// Decode an ownship (0x0A) or traffic (0x14) report.
///
/// Builds a fresh record; nothing is returned unless every field decoded.
/// The CRC field is stored; use [`check_traffic_crc`] to validate it.
pub fn decode_traffic(payload: &[u8], convention: Convention) -> Result<TrafficReport> {
    ensure_len(payload, TRAFFIC_LEN)?;

    let lat = codec::geodetic_24(codec::be_u24(payload, 5));
    let lon = codec::geodetic_24(codec::be_u24(payload, 8));

    let alt_raw = (payload[11] as u16) << 4 | (payload[12] >> 4) as u16;
    let hvel_raw = (payload[14] as u16) << 4 | (payload[15] >> 4) as u16;
    let vvel_raw = ((payload[15] & 0x0F) as u16) << 8 | payload[16] as u16;

    Ok(TrafficReport {
        alert_status: payload[1] >> 4,
        address_type: AddressType::from_code(payload[1] & 0x0F),
        participant_address: codec::be_u24(payload, 2),
        latitude: codec::normalize_latitude(lat),
        longitude: codec::normalize_longitude(lon),
        altitude_ft: codec::traffic_altitude(alt_raw),
        misc_indicators: payload[12] & 0x0F,
        integrity_code: payload[13] >> 4,
        accuracy_code: payload[13] & 0x0F,
        horizontal_velocity_kt: codec::horizontal_velocity(hvel_raw),
        vertical_velocity_fpm: codec::vertical_velocity(vvel_raw, convention),
        track_deg: payload[17] as f64 * 360.0 / 256.0,
        emitter_category: EmitterCategory::from_code(payload[18]),
        callsign: codec::trim_callsign(&payload[19..27]),
        emergency_code: EmergencyCode::from_code(payload[27] >> 4),
        crc: codec::le_u16(payload, 28),
        is_ownship: payload[0] == MSG_OWNSHIP,
    })
}

/// Check the CRC of a traffic/ownship report against its first 28 bytes.
pub fn check_traffic_crc(payload: &[u8]) -> Result<()> {
    ensure_len(payload, TRAFFIC_LEN)?;
    match crc::check(&payload[..TRAFFIC_LEN]) {
        Some((expected, computed)) if expected != computed => Err(Gdl90Error::CrcMismatch {
            msg_id: payload[0],
            expected,
            computed,
        }),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Ownship geometric altitude
// ---------------------------------------------------------------------------

pub fn decode_geo_altitude(payload: &[u8]) -> Result<OwnshipGeoAltitude> {
    ensure_len(payload, GEO_ALTITUDE_LEN)?;

    let metrics = codec::be_u16(payload, 3);
    let vfom = metrics & 0x7FFF;

    Ok(OwnshipGeoAltitude {
        altitude_ft: codec::be_i16(payload, 1) as i32 * 5,
        vertical_warning: metrics & 0x8000 != 0,
        vfom_m: (vfom != 0x7FFF).then_some(vfom),
    })
}

// ---------------------------------------------------------------------------
// Vendor extensions
// ---------------------------------------------------------------------------

pub fn decode_stratux_heartbeat(payload: &[u8]) -> Result<StratuxHeartbeat> {
    ensure_len(payload, STRATUX_HEARTBEAT_LEN)?;

    let flags = payload[1];
    Ok(StratuxHeartbeat {
        ahrs_valid: flags & 0x01 != 0,
        gps_valid: flags & 0x02 != 0,
        protocol_valid: flags & 0x04 != 0,
        protocol_version: payload[2],
    })
}

fn tenths(raw: i16) -> Option<f64> {
    (raw != STRATUX_INVALID).then(|| raw as f64 * 0.1)
}

/// Stratux AHRS (0x4C). Signed tenths; 0x7FFF marks a value invalid.
pub fn decode_stratux_ahrs(payload: &[u8]) -> Result<AhrsSample> {
    ensure_len(payload, STRATUX_AHRS_LEN)?;

    Ok(AhrsSample {
        roll_deg: codec::be_i16(payload, 2) as f64 * 0.1,
        pitch_deg: codec::be_i16(payload, 4) as f64 * 0.1,
        heading_deg: tenths(codec::be_i16(payload, 6)),
        heading_magnetic: false,
        magnetic_heading_deg: tenths(codec::be_i16(payload, 8)),
        slip_skid_deg: tenths(codec::be_i16(payload, 10)),
        turn_rate_dps: tenths(codec::be_i16(payload, 12)),
        g_load: tenths(codec::be_i16(payload, 14)),
        indicated_airspeed_kt: None,
        true_airspeed_kt: None,
    })
}

/// Stratux receiver status ('S' 'X').
pub fn decode_stratux_status(payload: &[u8]) -> Result<ReceiverStatus> {
    ensure_len(payload, STRATUX_STATUS_LEN)?;

    let tower_count = payload[28] as usize;
    ensure_len(payload, STRATUX_STATUS_LEN + 6 * tower_count)?;

    let towers = (0..tower_count)
        .map(|i| {
            let at = 29 + 6 * i;
            (
                codec::geodetic_24(codec::be_u24(payload, at)),
                codec::geodetic_24(codec::be_u24(payload, at + 3)),
            )
        })
        .collect();

    Ok(ReceiverStatus {
        version: payload[3],
        firmware: [payload[4], payload[5], payload[6], payload[7]],
        hardware_revision: codec::be_u32(payload, 8),
        valid_flags: codec::be_u16(payload, 12),
        connected_hardware: codec::be_u16(payload, 14),
        satellites_locked: payload[16],
        satellites_connected: payload[17],
        targets_978: codec::be_u16(payload, 18),
        targets_1090: codec::be_u16(payload, 20),
        rate_978: codec::be_u16(payload, 22),
        rate_1090: codec::be_u16(payload, 24),
        cpu_temp_c: codec::be_i16(payload, 26) as f64 * 0.1,
        towers,
    })
}

/// ForeFlight AHRS (0x65 sub-id 0x01).
///
/// Heading bit 15 selects magnetic; 0xFFFF marks heading or airspeed invalid.
pub fn decode_foreflight_ahrs(payload: &[u8]) -> Result<AhrsSample> {
    ensure_len(payload, FOREFLIGHT_AHRS_LEN)?;

    let heading = codec::be_u16(payload, 6);
    let airspeed = |offset| {
        let v = codec::be_u16(payload, offset);
        (v != FOREFLIGHT_INVALID).then_some(v)
    };

    Ok(AhrsSample {
        roll_deg: codec::be_i16(payload, 2) as f64 * 0.1,
        pitch_deg: codec::be_i16(payload, 4) as f64 * 0.1,
        heading_deg: (heading != FOREFLIGHT_INVALID).then(|| (heading & 0x7FFF) as f64 * 0.1),
        heading_magnetic: heading != FOREFLIGHT_INVALID && heading & 0x8000 != 0,
        indicated_airspeed_kt: airspeed(8),
        true_airspeed_kt: airspeed(10),
        ..Default::default()
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn with_crc(message: &[u8]) -> Vec<u8> {
        let mut payload = message.to_vec();
        crc::append_crc(&mut payload);
        payload
    }

    const HEARTBEAT: &[u8] = &[0x00, 0x81, 0x41, 0xDB, 0xD0, 0x08, 0x02, 0xB3, 0x8B];

    const TRAFFIC: &[u8] = &[
        0x14, 0x00, 0xA1, 0xB2, 0xC3, 0x1A, 0xD8, 0x3F, 0xA8, 0xDE, 0xAF, 0x23, 0xF9, 0x79,
        0x04, 0x2F, 0xF0, 0x57, 0x03, b'e', b'a', b'T', b'E', b'S', b'T', b'1', b'2', 0x00,
        0x4D, 0xDE,
    ];

    #[test]
    fn test_heartbeat() {
        let hb = decode_heartbeat(HEARTBEAT).unwrap();
        assert!(hb.gps_position_valid);
        assert!(hb.uat_initialized);
        assert!(!hb.maintenance_required);
        assert!(hb.utc_ok);
        assert!(hb.csa_requested);
        assert!(!hb.csa_not_available);
        assert!(!hb.timestamp_msb);
        assert_eq!(hb.timestamp, 0xD0DB);
        assert_eq!(hb.message_count, 0x0802);
        assert_eq!(hb.crc, 0x8BB3);
    }

    #[test]
    fn test_heartbeat_timestamp_msb() {
        let hb = decode_heartbeat(&with_crc(&[0x00, 0x00, 0x80, 0x01, 0x00, 0, 0])).unwrap();
        assert!(hb.timestamp_msb);
        assert_eq!(hb.timestamp, 0x10001);
    }

    #[test]
    fn test_heartbeat_crc_not_validated() {
        let mut payload = HEARTBEAT.to_vec();
        payload[8] ^= 0xFF;
        assert!(decode_heartbeat(&payload).is_ok());
    }

    #[test]
    fn test_heartbeat_too_short() {
        assert!(matches!(
            decode_heartbeat(&HEARTBEAT[..5]),
            Err(Gdl90Error::Length { expected: 9, actual: 5, .. })
        ));
    }

    #[test]
    fn test_traffic_reference_frame() {
        let r = decode_traffic(TRAFFIC, Convention::Legacy).unwrap();
        assert_eq!(r.alert_status, 0);
        assert_eq!(r.address_type, AddressType::AdsbIcao);
        assert_eq!(r.participant_address, 0xA1B2C3);
        assert!((r.latitude - 37.750375).abs() < 1e-5);
        assert!((r.longitude + 122.526762).abs() < 1e-5);
        assert_eq!(r.altitude_ft, Some(13375));
        assert_eq!(r.misc_indicators, 9);
        assert!(r.airborne());
        assert!(r.track_valid());
        assert_eq!(r.integrity_code, 7);
        assert_eq!(r.accuracy_code, 9);
        assert_eq!(r.horizontal_velocity_kt, 66);
        assert_eq!(r.vertical_velocity_fpm, -(0xFF0 * 64));
        assert_eq!(r.track_deg, 122.34375);
        assert_eq!(r.emitter_category, EmitterCategory::Large);
        assert_eq!(r.callsign, "eaTEST12");
        assert_eq!(r.emergency_code, EmergencyCode::None);
        assert_eq!(r.crc, 0xDE4D);
        assert!(!r.is_ownship);
        assert!(check_traffic_crc(TRAFFIC).is_ok());
    }

    #[test]
    fn test_traffic_icd_vertical_velocity() {
        let r = decode_traffic(TRAFFIC, Convention::Icd).unwrap();
        assert_eq!(r.vertical_velocity_fpm, -1024);
    }

    #[test]
    fn test_traffic_sentinels() {
        let mut msg = TRAFFIC[..28].to_vec();
        // altitude 0xFFF, hvel 0xFFF, vvel 0x800
        msg[11] = 0xFF;
        msg[12] = 0xF9;
        msg[14] = 0xFF;
        msg[15] = 0xF8;
        msg[16] = 0x00;
        let r = decode_traffic(&with_crc(&msg), Convention::Legacy).unwrap();
        assert_eq!(r.altitude_ft, None);
        assert_eq!(r.horizontal_velocity_kt, HVEL_NO_DATA);
        assert_eq!(r.horizontal_velocity(), HorizontalVelocity::NoData);
        assert_eq!(r.vertical_velocity_fpm, 0);

        // hvel 0xFFE, vvel 0x1FE
        msg[14] = 0xFF;
        msg[15] = 0xE1;
        msg[16] = 0xFE;
        let r = decode_traffic(&with_crc(&msg), Convention::Legacy).unwrap();
        assert_eq!(r.horizontal_velocity_kt, HVEL_SATURATED);
        assert_eq!(r.vertical_velocity_fpm, -(0x1FE * 64));
    }

    #[test]
    fn test_traffic_latitude_over_90_wraps() {
        let mut msg = TRAFFIC[..28].to_vec();
        msg[5..8].copy_from_slice(&[0x40, 0x00, 0x01]);
        let r = decode_traffic(&with_crc(&msg), Convention::Legacy).unwrap();
        assert!(r.latitude > 0.0 && r.latitude < 1e-4);

        msg[5..8].copy_from_slice(&[0x40, 0x00, 0x00]);
        let r = decode_traffic(&with_crc(&msg), Convention::Legacy).unwrap();
        assert_eq!(r.latitude, 90.0);
    }

    #[test]
    fn test_traffic_callsign_trim() {
        let mut msg = TRAFFIC[..28].to_vec();
        msg[19..27].copy_from_slice(b"N123  \0\0");
        let r = decode_traffic(&with_crc(&msg), Convention::Legacy).unwrap();
        assert_eq!(r.callsign, "N123");
    }

    #[test]
    fn test_traffic_codes() {
        let mut msg = TRAFFIC[..28].to_vec();
        msg[0] = MSG_OWNSHIP;
        msg[1] = 0x12;
        msg[27] = 0x30;
        let r = decode_traffic(&with_crc(&msg), Convention::Legacy).unwrap();
        assert!(r.is_ownship);
        assert_eq!(r.alert_status, 1);
        assert_eq!(r.address_type, AddressType::TisbIcao);
        assert_eq!(r.emergency_code, EmergencyCode::MinimumFuel);
    }

    #[test]
    fn test_traffic_crc_mismatch() {
        let mut payload = TRAFFIC.to_vec();
        payload[10] ^= 0x40;
        match check_traffic_crc(&payload) {
            Err(Gdl90Error::CrcMismatch {
                msg_id, expected, ..
            }) => {
                assert_eq!(msg_id, 0x14);
                assert_eq!(expected, 0xDE4D);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_traffic_truncated() {
        for len in [1, 10, 28, 29] {
            assert!(matches!(
                decode_traffic(&TRAFFIC[..len], Convention::Legacy),
                Err(Gdl90Error::Length { expected: 30, .. })
            ));
        }
    }

    #[test]
    fn test_geo_altitude() {
        // 1000 * 5 ft, warning clear, VFOM 10 m
        let payload = with_crc(&[0x0B, 0x03, 0xE8, 0x00, 0x0A]);
        let alt = decode_geo_altitude(&payload).unwrap();
        assert_eq!(alt.altitude_ft, 5000);
        assert!(!alt.vertical_warning);
        assert_eq!(alt.vfom_m, Some(10));

        let payload = with_crc(&[0x0B, 0xFF, 0xFE, 0xFF, 0xFF]);
        let alt = decode_geo_altitude(&payload).unwrap();
        assert_eq!(alt.altitude_ft, -10);
        assert!(alt.vertical_warning);
        assert_eq!(alt.vfom_m, None);
    }

    #[test]
    fn test_stratux_heartbeat() {
        let hb = decode_stratux_heartbeat(&with_crc(&[0xCC, 0x03, 0x01])).unwrap();
        assert!(hb.ahrs_valid);
        assert!(hb.gps_valid);
        assert!(!hb.protocol_valid);
        assert_eq!(hb.protocol_version, 1);
    }

    #[test]
    fn test_stratux_ahrs() {
        let mut msg = vec![0x4C, 0x45];
        for v in [-125i16, 42, 2705, 0x7FFF, 0, 30, 10] {
            msg.extend_from_slice(&v.to_be_bytes());
        }
        let ahrs = decode_stratux_ahrs(&with_crc(&msg)).unwrap();
        assert!((ahrs.roll_deg + 12.5).abs() < 1e-9);
        assert!((ahrs.pitch_deg - 4.2).abs() < 1e-9);
        assert!((ahrs.heading_deg.unwrap() - 270.5).abs() < 1e-9);
        assert_eq!(ahrs.magnetic_heading_deg, None);
        assert_eq!(ahrs.slip_skid_deg, Some(0.0));
        assert!((ahrs.g_load.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_stratux_status_with_towers() {
        let mut msg = vec![0x53, 0x58, 0x01, 0x01, 1, 4, 2, 0];
        msg.extend_from_slice(&0x0000_0003u32.to_be_bytes());
        msg.extend_from_slice(&0x0003u16.to_be_bytes());
        msg.extend_from_slice(&0x0001u16.to_be_bytes());
        msg.extend_from_slice(&[9, 12]);
        for v in [5u16, 17, 120, 850] {
            msg.extend_from_slice(&v.to_be_bytes());
        }
        msg.extend_from_slice(&452i16.to_be_bytes());
        msg.push(1);
        msg.extend_from_slice(&[0x20, 0x00, 0x00, 0xC0, 0x00, 0x00]);

        let status = decode_stratux_status(&with_crc(&msg)).unwrap();
        assert_eq!(status.version, 1);
        assert_eq!(status.firmware, [1, 4, 2, 0]);
        assert_eq!(status.hardware_revision, 3);
        assert_eq!(status.satellites_locked, 9);
        assert_eq!(status.satellites_connected, 12);
        assert_eq!(status.targets_978, 5);
        assert_eq!(status.targets_1090, 17);
        assert_eq!(status.rate_978, 120);
        assert_eq!(status.rate_1090, 850);
        assert!((status.cpu_temp_c - 45.2).abs() < 1e-9);
        assert_eq!(status.tower_count(), 1);
        assert_eq!(status.towers[0], (45.0, -90.0));
    }

    #[test]
    fn test_stratux_status_truncated_towers() {
        let mut msg = vec![0u8; 29];
        msg[0] = 0x53;
        msg[1] = 0x58;
        msg[28] = 3;
        assert!(matches!(
            decode_stratux_status(&with_crc(&msg)),
            Err(Gdl90Error::Length { expected: 49, .. })
        ));
    }

    #[test]
    fn test_foreflight_ahrs() {
        let mut msg = vec![0x65, 0x01];
        msg.extend_from_slice(&(-50i16).to_be_bytes());
        msg.extend_from_slice(&25i16.to_be_bytes());
        msg.extend_from_slice(&(0x8000u16 | 900).to_be_bytes());
        msg.extend_from_slice(&110u16.to_be_bytes());
        msg.extend_from_slice(&0xFFFFu16.to_be_bytes());

        let ahrs = decode_foreflight_ahrs(&with_crc(&msg)).unwrap();
        assert!((ahrs.roll_deg + 5.0).abs() < 1e-9);
        assert!((ahrs.pitch_deg - 2.5).abs() < 1e-9);
        assert!((ahrs.heading_deg.unwrap() - 90.0).abs() < 1e-9);
        assert!(ahrs.heading_magnetic);
        assert_eq!(ahrs.indicated_airspeed_kt, Some(110));
        assert_eq!(ahrs.true_airspeed_kt, None);
    }

    #[test]
    fn test_foreflight_invalid_heading() {
        let mut msg = vec![0x65, 0x01, 0, 0, 0, 0, 0xFF, 0xFF];
        msg.extend_from_slice(&[0, 100, 0, 105]);
        let ahrs = decode_foreflight_ahrs(&with_crc(&msg)).unwrap();
        assert_eq!(ahrs.heading_deg, None);
        assert!(!ahrs.heading_magnetic);
        assert_eq!(ahrs.true_airspeed_kt, Some(105));
    }
}
