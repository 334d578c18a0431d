//! UAT payloads carried inside GDL90 messages.
//!
//! - 0x07 Uplink: ground station header plus a walk over the application
//!   data frames
//! - 0x1E/0x1F Basic and Long reports: payload header, State Vector, Mode
//!   Status, Auxiliary State Vector and Target State elements
//!
//! Element offsets are relative to the start of the UAT payload (after the
//! GDL90 message id and 3-byte time of reception).

use serde::Serialize;

use crate::codec::{self, Convention};
use crate::decode::CRC_LEN;
use crate::types::*;

/// Message id plus 24-bit time of reception.
const REPORT_PREFIX: usize = 4;

pub const BASIC_PAYLOAD_LEN: usize = 18;
pub const LONG_PAYLOAD_LEN: usize = 34;
pub const BASIC_REPORT_LEN: usize = REPORT_PREFIX + BASIC_PAYLOAD_LEN + CRC_LEN;
pub const LONG_REPORT_LEN: usize = REPORT_PREFIX + LONG_PAYLOAD_LEN + CRC_LEN;

const HEADER_LEN: usize = 4;
const STATE_VECTOR_OFFSET: usize = 4;
const STATE_VECTOR_LEN: usize = 13;
const MODE_STATUS_OFFSET: usize = 17;
const MODE_STATUS_LEN: usize = 12;
const AUX_STATE_VECTOR_OFFSET: usize = 29;
const AUX_STATE_VECTOR_LEN: usize = 5;
const TARGET_STATE_LEN: usize = 5;

/// Uplink header is 8 bytes after the message id and time of reception.
const UPLINK_HEADER_LEN: usize = 8;
pub const UPLINK_MIN_LEN: usize = REPORT_PREFIX + UPLINK_HEADER_LEN + CRC_LEN;

/// Mode S downlink formats forwarded to an external decoder, with their sizes.
const MODE_S_SHORT: (u8, usize) = (0, 7);
const MODE_S_LONG: (u8, usize) = (16, 14);

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// UAT payload header (first 4 bytes of every basic/long report).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UatHeader {
    pub address_qualifier: AddressType,
    pub payload_type: u8,
    pub address: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AltitudeType {
    Barometric,
    Geometric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AirGroundState {
    AirborneSubsonic,
    AirborneSupersonic,
    OnGround,
    Reserved,
}

impl AirGroundState {
    fn from_code(code: u8) -> Self {
        match code & 0x03 {
            0 => AirGroundState::AirborneSubsonic,
            1 => AirGroundState::AirborneSupersonic,
            2 => AirGroundState::OnGround,
            _ => AirGroundState::Reserved,
        }
    }
}

/// State Vector element.
///
/// Velocity components are signed knots: negative north means southbound,
/// negative east means westbound. `None` means no velocity data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateVector {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_type: AltitudeType,
    /// `None` when the altitude code is 0 (not available).
    pub altitude_ft: Option<i32>,
    pub nic: u8,
    pub air_ground: AirGroundState,
    pub north_velocity_kt: Option<i32>,
    pub east_velocity_kt: Option<i32>,
    pub vertical_rate_barometric: bool,
    pub vertical_rate_fpm: Option<i32>,
    pub utc_coupled: bool,
}

/// Mode Status element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeStatus {
    pub emitter_category: EmitterCategory,
    pub callsign: String,
    pub emergency_priority: EmergencyCode,
    pub mops_version: u8,
    pub sil: u8,
    pub transmit_mso: u8,
    pub nacp: u8,
    pub nacv: u8,
    pub nic_baro: bool,
    /// Bit 1 CDTI, bit 0 TCAS/ACAS.
    pub capability_codes: u8,
    pub operational_modes: u8,
    pub heading_magnetic: bool,
    /// True when `callsign` is a call sign, false when it is a flight plan ID.
    pub callsign_id: bool,
}

/// Auxiliary State Vector element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuxStateVector {
    /// Secondary altitude (the type not carried in the State Vector).
    pub secondary_altitude_ft: Option<i32>,
}

/// Target State element. Field layout is not decoded; the raw bytes are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TargetState {
    pub raw: [u8; TARGET_STATE_LEN],
}

/// A decoded UAT basic or long report payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UatReport {
    pub header: UatHeader,
    pub state_vector: Option<StateVector>,
    pub mode_status: Option<ModeStatus>,
    pub aux_state_vector: Option<AuxStateVector>,
    pub target_state: Option<TargetState>,
}

/// GDL90 basic (0x1E) or long (0x1F) report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UatReportMessage {
    /// 24-bit time of reception, 80 ns ticks since the UTC second.
    pub time_of_reception: u32,
    pub long: bool,
    pub report: UatReport,
    /// Mode S format field (low 5 bits of the first payload byte).
    pub mode_s_format: u8,
}

// ---------------------------------------------------------------------------
// Basic / Long reports
// ---------------------------------------------------------------------------

/// UAT payload bytes of a basic/long report message (no prefix, no CRC).
pub fn report_payload(payload: &[u8]) -> Result<&[u8]> {
    let expected = if payload.first() == Some(&MSG_LONG_REPORT) {
        LONG_REPORT_LEN
    } else {
        BASIC_REPORT_LEN
    };
    ensure_len(payload, expected)?;
    Ok(&payload[REPORT_PREFIX..payload.len() - CRC_LEN])
}

pub fn decode_report_message(payload: &[u8], convention: Convention) -> Result<UatReportMessage> {
    let uat = report_payload(payload)?;
    Ok(UatReportMessage {
        time_of_reception: codec::le_u24(payload, 1),
        long: payload[0] == MSG_LONG_REPORT,
        report: decode_uat_payload(uat, convention)?,
        mode_s_format: uat[0] & 0x1F,
    })
}

/// Bytes to forward to a Mode S decoder for formats 0 (56 bit) and 16 (112 bit).
pub fn mode_s_bytes(uat: &[u8]) -> Option<&[u8]> {
    let format = uat.first()? & 0x1F;
    let len = match format {
        f if f == MODE_S_SHORT.0 => MODE_S_SHORT.1,
        f if f == MODE_S_LONG.0 => MODE_S_LONG.1,
        _ => return None,
    };
    uat.get(..len)
}

fn block(uat: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    uat.get(offset..offset + len).ok_or(Gdl90Error::Length {
        msg_id: uat.first().copied().unwrap_or(0),
        expected: offset + len,
        actual: uat.len(),
    })
}

pub fn decode_header(uat: &[u8]) -> Result<UatHeader> {
    let h = block(uat, 0, HEADER_LEN)?;
    Ok(UatHeader {
        address_qualifier: AddressType::from_code(h[0] & 0x07),
        payload_type: h[0] >> 3,
        address: codec::be_u24(h, 1),
    })
}

/// Decode a UAT payload, sub-dispatching on its payload type code.
pub fn decode_uat_payload(uat: &[u8], convention: Convention) -> Result<UatReport> {
    let header = decode_header(uat)?;
    let ptype = header.payload_type;
    let qualifier = header.address_qualifier.code();

    let state_vector = if ptype <= 10 && matches!(qualifier, 0 | 1 | 4 | 5) {
        Some(decode_state_vector(
            block(uat, STATE_VECTOR_OFFSET, STATE_VECTOR_LEN)?,
            convention,
        ))
    } else {
        None
    };

    let mode_status = match ptype {
        1 | 3 => Some(decode_mode_status(block(
            uat,
            MODE_STATUS_OFFSET,
            MODE_STATUS_LEN,
        )?)),
        _ => None,
    };

    let aux_state_vector = match ptype {
        1 | 2 | 5 | 6 => Some(decode_aux_state_vector(block(
            uat,
            AUX_STATE_VECTOR_OFFSET,
            AUX_STATE_VECTOR_LEN,
        )?)),
        _ => None,
    };

    let target_state = match ptype {
        3 | 4 => Some(target_state(block(uat, 29, TARGET_STATE_LEN)?)),
        6 => Some(target_state(block(uat, 24, TARGET_STATE_LEN)?)),
        _ => None,
    };

    Ok(UatReport {
        header,
        state_vector,
        mode_status,
        aux_state_vector,
        target_state,
    })
}

/// 11-bit velocity component: bit 10 is the direction, low 10 bits are
/// magnitude + 1 (0 = no data).
fn velocity_component(raw: u16) -> Option<i32> {
    let magnitude = (raw & 0x3FF) as i32;
    if magnitude == 0 {
        return None;
    }
    let kt = magnitude - 1;
    Some(if raw & 0x400 != 0 { -kt } else { kt })
}

pub fn decode_state_vector(sv: &[u8], convention: Convention) -> StateVector {
    let lat23 = (sv[0] as u32) << 15 | (sv[1] as u32) << 7 | (sv[2] >> 1) as u32;
    let lon24 = ((sv[2] & 0x01) as u32) << 23
        | (sv[3] as u32) << 15
        | (sv[4] as u32) << 7
        | (sv[5] >> 1) as u32;

    let alt_raw = (sv[6] as u16) << 4 | (sv[7] >> 4) as u16;
    let north = ((sv[8] & 0x1F) as u16) << 6 | (sv[9] >> 2) as u16;
    let east = ((sv[9] & 0x03) as u16) << 9 | (sv[10] as u16) << 1 | (sv[11] >> 7) as u16;
    let vertical = ((sv[11] & 0x7F) as u16) << 4 | (sv[12] >> 4) as u16;

    // Vertical rate: bit 10 source, bit 9 sign (down), 9-bit magnitude + 1.
    let vmag = (vertical & 0x1FF) as i32;
    let vertical_rate_fpm = (vmag != 0).then(|| {
        let fpm = (vmag - 1) * 64;
        if vertical & 0x200 != 0 {
            -fpm
        } else {
            fpm
        }
    });

    StateVector {
        latitude: codec::uat_latitude(lat23, convention),
        longitude: codec::normalize_longitude(codec::geodetic_unsigned(lon24)),
        altitude_type: if sv[5] & 0x01 != 0 {
            AltitudeType::Geometric
        } else {
            AltitudeType::Barometric
        },
        altitude_ft: (alt_raw != 0).then(|| codec::altitude_ft(alt_raw)),
        nic: sv[7] & 0x0F,
        air_ground: AirGroundState::from_code(sv[8] >> 6),
        north_velocity_kt: velocity_component(north),
        east_velocity_kt: velocity_component(east),
        vertical_rate_barometric: vertical & 0x400 != 0,
        vertical_rate_fpm,
        utc_coupled: (sv[12] >> 3) & 0x01 != 0,
    }
}

pub fn decode_mode_status(ms: &[u8]) -> ModeStatus {
    let (emitter, callsign) = codec::decode_base40(&ms[..6]);
    ModeStatus {
        emitter_category: EmitterCategory::from_code(emitter),
        callsign,
        emergency_priority: EmergencyCode::from_code(ms[6] >> 5),
        mops_version: (ms[6] >> 2) & 0x07,
        sil: ms[6] & 0x03,
        transmit_mso: ms[7] >> 2,
        nacp: ms[8] >> 4,
        nacv: (ms[8] >> 1) & 0x07,
        nic_baro: ms[8] & 0x01 != 0,
        capability_codes: ms[9] >> 6,
        operational_modes: (ms[9] >> 3) & 0x07,
        heading_magnetic: (ms[9] >> 2) & 0x01 != 0,
        callsign_id: (ms[9] >> 1) & 0x01 != 0,
    }
}

pub fn decode_aux_state_vector(aux: &[u8]) -> AuxStateVector {
    let raw = (aux[0] as u16) << 4 | (aux[1] >> 4) as u16;
    AuxStateVector {
        secondary_altitude_ft: (raw != 0).then(|| codec::altitude_ft(raw)),
    }
}

fn target_state(ts: &[u8]) -> TargetState {
    let mut raw = [0u8; TARGET_STATE_LEN];
    raw.copy_from_slice(ts);
    TargetState { raw }
}

// ---------------------------------------------------------------------------
// Uplink
// ---------------------------------------------------------------------------

/// Ground station header of an uplink message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UplinkHeader {
    pub latitude: f64,
    pub longitude: f64,
    pub position_valid: bool,
    pub utc_coupled: bool,
    pub app_data_valid: bool,
    pub slot_id: u8,
    pub tisb_site_id: u8,
}

/// One application-data frame inside an uplink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppFrame {
    /// Offset of the frame header within the application data.
    pub offset: usize,
    /// Frame length including the 2-byte header.
    pub length: usize,
    pub frame_type: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Uplink {
    pub time_of_reception: u32,
    pub header: UplinkHeader,
    pub frames: Vec<AppFrame>,
}

pub fn decode_uplink(payload: &[u8], convention: Convention) -> Result<Uplink> {
    ensure_len(payload, UPLINK_MIN_LEN)?;

    let h = &payload[REPORT_PREFIX..REPORT_PREFIX + UPLINK_HEADER_LEN];
    let lat23 = (h[0] as u32) << 15 | (h[1] as u32) << 7 | (h[2] >> 1) as u32;
    let lon24 = ((h[2] & 0x01) as u32) << 23
        | (h[3] as u32) << 15
        | (h[4] as u32) << 7
        | (h[5] >> 1) as u32;

    let header = UplinkHeader {
        latitude: codec::uat_latitude(lat23, convention),
        longitude: codec::normalize_longitude(codec::geodetic_unsigned(lon24)),
        position_valid: h[5] & 0x01 != 0,
        utc_coupled: h[6] & 0x80 != 0,
        app_data_valid: h[6] & 0x20 != 0,
        slot_id: h[6] & 0x1F,
        tisb_site_id: h[7] >> 4,
    };

    let frames = if header.app_data_valid {
        let start = REPORT_PREFIX + UPLINK_HEADER_LEN;
        scan_app_frames(&payload[start..payload.len() - CRC_LEN])?
    } else {
        Vec::new()
    };

    Ok(Uplink {
        time_of_reception: codec::le_u24(payload, 1),
        header,
        frames,
    })
}

/// Walk the application data as a chain of length-prefixed frames.
///
/// Frame length is `b0 << 1 | b1 >> 7` and covers the 2-byte header; the
/// type is the low nibble of `b1`. Zero padding after the last frame ends
/// the walk. Any step that would not advance, or would run past the end of
/// the region, is an error.
pub fn scan_app_frames(region: &[u8]) -> Result<Vec<AppFrame>> {
    let mut frames = Vec::new();
    let mut offset = 0;

    while offset < region.len() {
        let rest = &region[offset..];
        if rest.iter().all(|&b| b == 0) {
            break;
        }
        if rest.len() < 2 {
            return Err(Gdl90Error::AppFrame {
                offset,
                reason: "truncated frame header",
            });
        }

        let length = (rest[0] as usize) << 1 | (rest[1] >> 7) as usize;
        let frame_type = rest[1] & 0x0F;

        if length < 2 {
            return Err(Gdl90Error::AppFrame {
                offset,
                reason: "frame length does not advance",
            });
        }
        if length > rest.len() {
            return Err(Gdl90Error::AppFrame {
                offset,
                reason: "frame runs past end of application data",
            });
        }

        frames.push(AppFrame {
            offset,
            length,
            frame_type,
            data: rest[2..length].to_vec(),
        });
        offset += length;
    }

    Ok(frames)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
