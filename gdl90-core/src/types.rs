//! Shared types, error enum, and decoded record types for gdl90-core.

use serde::Serialize;
use thiserror::Error;

/// All errors produced by gdl90-core.
#[derive(Debug, Error)]
pub enum Gdl90Error {
    #[error("not a GDL90 frame: {0}")]
    Framing(&'static str),
    #[error("message 0x{msg_id:02X} too short: expected {expected} bytes, got {actual}")]
    Length {
        msg_id: u8,
        expected: usize,
        actual: usize,
    },
    #[error("CRC mismatch on message 0x{msg_id:02X}: frame carries 0x{expected:04X}, computed 0x{computed:04X}")]
    CrcMismatch {
        msg_id: u8,
        expected: u16,
        computed: u16,
    },
    #[error("bad UAT application frame at offset {offset}: {reason}")]
    AppFrame { offset: usize, reason: &'static str },
    #[error("no traffic entry for callsign {0:?}")]
    UnknownCallsign(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Gdl90Error>;

/// Fail with a length error unless `buf` holds at least `expected` bytes.
pub(crate) fn ensure_len(buf: &[u8], expected: usize) -> Result<()> {
    if buf.len() < expected {
        return Err(Gdl90Error::Length {
            msg_id: buf.first().copied().unwrap_or(0),
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Message ids
// ---------------------------------------------------------------------------

pub const MSG_HEARTBEAT: u8 = 0x00;
pub const MSG_INITIALIZATION: u8 = 0x02;
pub const MSG_UPLINK: u8 = 0x07;
pub const MSG_HEIGHT_ABOVE_TERRAIN: u8 = 0x09;
pub const MSG_OWNSHIP: u8 = 0x0A;
pub const MSG_OWNSHIP_GEO_ALTITUDE: u8 = 0x0B;
pub const MSG_TRAFFIC: u8 = 0x14;
pub const MSG_BASIC_REPORT: u8 = 0x1E;
pub const MSG_LONG_REPORT: u8 = 0x1F;
pub const MSG_STRATUX_AHRS: u8 = 0x4C;
pub const MSG_STRATUX_STATUS: u8 = 0x53;
pub const MSG_FOREFLIGHT: u8 = 0x65;
pub const MSG_STRATUX_HEARTBEAT: u8 = 0xCC;

/// Second byte of a Stratux receiver status message ('X').
pub const STRATUX_STATUS_SUB_ID: u8 = 0x58;
/// Combined id recorded as the last message type for Stratux status frames.
pub const STRATUX_STATUS_TYPE: u16 = 0x5358;

pub const FOREFLIGHT_ID: u8 = 0x00;
pub const FOREFLIGHT_AHRS: u8 = 0x01;

/// Human-readable name for a message id.
pub fn message_name(msg_id: u8) -> &'static str {
    match msg_id {
        MSG_HEARTBEAT => "Heartbeat",
        MSG_INITIALIZATION => "Initialization",
        MSG_UPLINK => "Uplink Data",
        MSG_HEIGHT_ABOVE_TERRAIN => "Height Above Terrain",
        MSG_OWNSHIP => "Ownship Report",
        MSG_OWNSHIP_GEO_ALTITUDE => "Ownship Geometric Altitude",
        MSG_TRAFFIC => "Traffic Report",
        MSG_BASIC_REPORT => "Basic UAT Report",
        MSG_LONG_REPORT => "Long UAT Report",
        MSG_STRATUX_AHRS => "Stratux AHRS",
        MSG_STRATUX_STATUS => "Stratux Status",
        MSG_FOREFLIGHT => "ForeFlight Extension",
        MSG_STRATUX_HEARTBEAT => "Stratux Heartbeat",
        _ => "Unknown",
    }
}

// ---------------------------------------------------------------------------
// Enumerated codes
// ---------------------------------------------------------------------------

/// Traffic address type (GDL90) or UAT address qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AddressType {
    #[default]
    AdsbIcao,
    AdsbSelfAssigned,
    TisbIcao,
    TisbTrackFile,
    SurfaceVehicle,
    GroundStationBeacon,
    Reserved(u8),
}

impl AddressType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => AddressType::AdsbIcao,
            1 => AddressType::AdsbSelfAssigned,
            2 => AddressType::TisbIcao,
            3 => AddressType::TisbTrackFile,
            4 => AddressType::SurfaceVehicle,
            5 => AddressType::GroundStationBeacon,
            other => AddressType::Reserved(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            AddressType::AdsbIcao => 0,
            AddressType::AdsbSelfAssigned => 1,
            AddressType::TisbIcao => 2,
            AddressType::TisbTrackFile => 3,
            AddressType::SurfaceVehicle => 4,
            AddressType::GroundStationBeacon => 5,
            AddressType::Reserved(c) => *c,
        }
    }
}

impl std::fmt::Display for AddressType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressType::AdsbIcao => write!(f, "ADS-B ICAO"),
            AddressType::AdsbSelfAssigned => write!(f, "ADS-B self-assigned"),
            AddressType::TisbIcao => write!(f, "TIS-B ICAO"),
            AddressType::TisbTrackFile => write!(f, "TIS-B track file"),
            AddressType::SurfaceVehicle => write!(f, "surface vehicle"),
            AddressType::GroundStationBeacon => write!(f, "ground beacon"),
            AddressType::Reserved(c) => write!(f, "reserved({c})"),
        }
    }
}

/// Emergency / priority status carried in traffic reports and UAT mode status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum EmergencyCode {
    #[default]
    None,
    General,
    Medical,
    MinimumFuel,
    NoCommunication,
    UnlawfulInterference,
    Downed,
    Reserved(u8),
}

impl EmergencyCode {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => EmergencyCode::None,
            1 => EmergencyCode::General,
            2 => EmergencyCode::Medical,
            3 => EmergencyCode::MinimumFuel,
            4 => EmergencyCode::NoCommunication,
            5 => EmergencyCode::UnlawfulInterference,
            6 => EmergencyCode::Downed,
            other => EmergencyCode::Reserved(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            EmergencyCode::None => 0,
            EmergencyCode::General => 1,
            EmergencyCode::Medical => 2,
            EmergencyCode::MinimumFuel => 3,
            EmergencyCode::NoCommunication => 4,
            EmergencyCode::UnlawfulInterference => 5,
            EmergencyCode::Downed => 6,
            EmergencyCode::Reserved(c) => *c,
        }
    }
}

/// Emitter category. Codes follow the GDL90 traffic report table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum EmitterCategory {
    #[default]
    NoInfo,
    Light,
    Small,
    Large,
    HighVortexLarge,
    Heavy,
    HighlyManeuverable,
    Rotorcraft,
    Glider,
    LighterThanAir,
    Parachutist,
    UltraLight,
    Unmanned,
    Space,
    SurfaceEmergency,
    SurfaceService,
    PointObstacle,
    ClusterObstacle,
    LineObstacle,
    Reserved(u8),
}

impl EmitterCategory {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => EmitterCategory::NoInfo,
            1 => EmitterCategory::Light,
            2 => EmitterCategory::Small,
            3 => EmitterCategory::Large,
            4 => EmitterCategory::HighVortexLarge,
            5 => EmitterCategory::Heavy,
            6 => EmitterCategory::HighlyManeuverable,
            7 => EmitterCategory::Rotorcraft,
            9 => EmitterCategory::Glider,
            10 => EmitterCategory::LighterThanAir,
            11 => EmitterCategory::Parachutist,
            12 => EmitterCategory::UltraLight,
            14 => EmitterCategory::Unmanned,
            15 => EmitterCategory::Space,
            17 => EmitterCategory::SurfaceEmergency,
            18 => EmitterCategory::SurfaceService,
            19 => EmitterCategory::PointObstacle,
            20 => EmitterCategory::ClusterObstacle,
            21 => EmitterCategory::LineObstacle,
            other => EmitterCategory::Reserved(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            EmitterCategory::NoInfo => 0,
            EmitterCategory::Light => 1,
            EmitterCategory::Small => 2,
            EmitterCategory::Large => 3,
            EmitterCategory::HighVortexLarge => 4,
            EmitterCategory::Heavy => 5,
            EmitterCategory::HighlyManeuverable => 6,
            EmitterCategory::Rotorcraft => 7,
            EmitterCategory::Glider => 9,
            EmitterCategory::LighterThanAir => 10,
            EmitterCategory::Parachutist => 11,
            EmitterCategory::UltraLight => 12,
            EmitterCategory::Unmanned => 14,
            EmitterCategory::Space => 15,
            EmitterCategory::SurfaceEmergency => 17,
            EmitterCategory::SurfaceService => 18,
            EmitterCategory::PointObstacle => 19,
            EmitterCategory::ClusterObstacle => 20,
            EmitterCategory::LineObstacle => 21,
            EmitterCategory::Reserved(c) => *c,
        }
    }
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

/// Decoded GDL90 heartbeat (message 0x00).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeartbeatStatus {
    // Status byte 1
    pub gps_position_valid: bool,
    pub maintenance_required: bool,
    pub ident: bool,
    pub address_type_talkback: bool,
    pub gps_battery_low: bool,
    pub ratcs: bool,
    pub uat_initialized: bool,

    // Status byte 2
    pub timestamp_msb: bool,
    pub csa_requested: bool,
    pub csa_not_available: bool,
    pub utc_ok: bool,

    /// Seconds since 0000Z (17 bits).
    pub timestamp: u32,
    pub message_count: u16,
    /// Trailing frame CRC as received. Not validated.
    pub crc: u16,
}

impl HeartbeatStatus {
    /// Uplink messages received in the previous second (5 bits).
    pub fn uplink_count(&self) -> u16 {
        self.message_count >> 11
    }

    /// Basic and long reports received in the previous second (10 bits).
    pub fn basic_long_count(&self) -> u16 {
        self.message_count & 0x03FF
    }
}

// ---------------------------------------------------------------------------
// Traffic / Ownship
// ---------------------------------------------------------------------------

/// Horizontal velocity with its two sentinel states made explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HorizontalVelocity {
    Knots(u16),
    NoData,
    /// 4094 knots or more.
    Saturated,
}

/// Stored value for a horizontal velocity that was not reported (raw 0xFFF).
pub const HVEL_NO_DATA: u16 = 4094;
/// Stored value for a saturated horizontal velocity (raw 0xFFE).
pub const HVEL_SATURATED: u16 = 4095;

/// One decoded traffic or ownship report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrafficReport {
    pub alert_status: u8,
    pub address_type: AddressType,
    pub participant_address: u32,
    pub latitude: f64,
    pub longitude: f64,
    /// `None` when the raw altitude is 0xFFF.
    pub altitude_ft: Option<i32>,
    pub misc_indicators: u8,
    pub integrity_code: u8,
    pub accuracy_code: u8,
    /// Knots, with 4094 meaning no data and 4095 meaning saturated.
    pub horizontal_velocity_kt: u16,
    pub vertical_velocity_fpm: i32,
    pub track_deg: f64,
    pub emitter_category: EmitterCategory,
    pub callsign: String,
    pub emergency_code: EmergencyCode,
    pub crc: u16,
    pub is_ownship: bool,
}

impl TrafficReport {
    pub fn horizontal_velocity(&self) -> HorizontalVelocity {
        match self.horizontal_velocity_kt {
            HVEL_NO_DATA => HorizontalVelocity::NoData,
            HVEL_SATURATED => HorizontalVelocity::Saturated,
            kt => HorizontalVelocity::Knots(kt),
        }
    }

    /// Track is only meaningful when the misc field flags a true or magnetic track.
    pub fn track_valid(&self) -> bool {
        self.misc_indicators & 0x03 != 0
    }

    pub fn airborne(&self) -> bool {
        self.misc_indicators & 0x08 != 0
    }
}

/// Owner/registration details attached to a table entry by external callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OwnerInfo {
    pub address: u32,
    pub registration: String,
    pub name: String,
    pub aircraft_type: i32,
    pub engine_type: i32,
}

/// Range and bearing from the receiver, set by external callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RangeBearing {
    pub range_nm: f64,
    pub bearing_deg: f64,
}

/// Ownship geometric altitude (message 0x0B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OwnshipGeoAltitude {
    /// Feet above WGS-84 ellipsoid, 5 ft resolution.
    pub altitude_ft: i32,
    pub vertical_warning: bool,
    /// Vertical figure of merit in meters. `None` when not available.
    pub vfom_m: Option<u16>,
}

// ---------------------------------------------------------------------------
// Vendor extensions
// ---------------------------------------------------------------------------

/// Attitude and air data from a vendor AHRS message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AhrsSample {
    pub roll_deg: f64,
    pub pitch_deg: f64,
    /// `None` when the source marks the heading invalid.
    pub heading_deg: Option<f64>,
    pub heading_magnetic: bool,
    pub indicated_airspeed_kt: Option<u16>,
    pub true_airspeed_kt: Option<u16>,

    // Stratux only
    pub magnetic_heading_deg: Option<f64>,
    pub slip_skid_deg: Option<f64>,
    pub turn_rate_dps: Option<f64>,
    pub g_load: Option<f64>,
}

/// Stratux heartbeat (0xCC).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StratuxHeartbeat {
    pub ahrs_valid: bool,
    pub gps_valid: bool,
    pub protocol_valid: bool,
    pub protocol_version: u8,
}

/// Receiver status (Stratux 'SX' message).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReceiverStatus {
    pub version: u8,
    pub firmware: [u8; 4],
    pub hardware_revision: u32,
    pub valid_flags: u16,
    pub connected_hardware: u16,
    pub satellites_locked: u8,
    pub satellites_connected: u8,
    pub targets_978: u16,
    pub targets_1090: u16,
    pub rate_978: u16,
    pub rate_1090: u16,
    pub cpu_temp_c: f64,
    pub towers: Vec<(f64, f64)>,
}

impl ReceiverStatus {
    pub fn tower_count(&self) -> usize {
        self.towers.len()
    }
}

// ---------------------------------------------------------------------------
// Hex utilities
// ---------------------------------------------------------------------------

/// Decode a hex string into bytes. Whitespace between bytes is ignored.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = hex.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for chunk in digits.chunks(2) {
        let high = hex_digit(chunk[0])?;
        let low = hex_digit(chunk[1])?;
        bytes.push((high << 4) | low);
    }
    Some(bytes)
}

/// Encode bytes as uppercase hex string.
pub fn hex_encode(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for &b in data {
        s.push(HEX_CHARS[(b >> 4) as usize] as char);
        s.push(HEX_CHARS[(b & 0x0F) as usize] as char);
    }
    s
}

const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
