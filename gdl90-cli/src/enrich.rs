//! Table enrichment: range/bearing from the receiver and US registrations.
//!
//! Everything here writes through the table setters, so decoded fields are
//! never touched and later decodes never wipe what was set.

use gdl90_core::types::{AddressType, OwnerInfo, RangeBearing};
use gdl90_core::TrafficTable;

const EARTH_RADIUS_NM: f64 = 3440.065;

/// Great-circle distance in nautical miles.
pub fn haversine_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_NM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Initial great-circle bearing from point 1 to point 2, degrees in [0, 360).
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dlon = (lon2 - lon1).to_radians();
    let y = dlon.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlon.cos();
    y.atan2(x).to_degrees().rem_euclid(360.0)
}

// ---------------------------------------------------------------------------
// N-number
// ---------------------------------------------------------------------------

const US_CIVIL_START: u32 = 0xA00001;
const US_CIVIL_END: u32 = 0xADF7C7;

/// Registration letters (no I or O).
const NNUM_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Bare, then 24 letters each optionally followed by a second letter.
const SUFFIX_SIZE: u32 = 1 + 24 * 25;
const BUCKET4_SIZE: u32 = 1 + 24 + 10;
const BUCKET3_SIZE: u32 = 10 * BUCKET4_SIZE + SUFFIX_SIZE;
const BUCKET2_SIZE: u32 = 10 * BUCKET3_SIZE + SUFFIX_SIZE;
const BUCKET1_SIZE: u32 = 10 * BUCKET2_SIZE + SUFFIX_SIZE;

fn letter(i: u32) -> char {
    NNUM_CHARS[i as usize] as char
}

fn letter_suffix(offset: u32) -> String {
    if offset == 0 {
        return String::new();
    }
    let first = (offset - 1) / 25;
    let second = (offset - 1) % 25;
    let mut s = String::from(letter(first));
    if second > 0 {
        s.push(letter(second - 1));
    }
    s
}

/// Convert a US civil ICAO address (0xA00001-0xADF7C7) to its N-number.
pub fn icao_to_n_number(address: u32) -> Option<String> {
    if !(US_CIVIL_START..=US_CIVIL_END).contains(&address) {
        return None;
    }

    let offset = address - US_CIVIL_START;
    let mut reg = format!("N{}", offset / BUCKET1_SIZE + 1);
    let mut rem = offset % BUCKET1_SIZE;

    for size in [BUCKET2_SIZE, BUCKET3_SIZE, BUCKET4_SIZE] {
        if rem < SUFFIX_SIZE {
            reg.push_str(&letter_suffix(rem));
            return Some(reg);
        }
        rem -= SUFFIX_SIZE;
        reg.push(char::from(b'0' + (rem / size) as u8));
        rem %= size;
    }

    // Last position: bare, one letter, or one digit.
    match rem {
        0 => {}
        r if r <= 24 => reg.push(letter(r - 1)),
        r => reg.push(char::from(b'0' + (r - 25) as u8)),
    }
    Some(reg)
}

// ---------------------------------------------------------------------------
// Table passes
// ---------------------------------------------------------------------------

/// Set range and bearing from `(lat, lon)` for every entry. Returns the
/// number of entries updated.
pub fn apply_range_bearing(table: &mut TrafficTable, receiver: (f64, f64)) -> usize {
    let (rx_lat, rx_lon) = receiver;
    let updates: Vec<(usize, RangeBearing)> = table
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let (lat, lon) = (e.report.latitude, e.report.longitude);
            (
                i,
                RangeBearing {
                    range_nm: haversine_nm(rx_lat, rx_lon, lat, lon),
                    bearing_deg: bearing_deg(rx_lat, rx_lon, lat, lon),
                },
            )
        })
        .collect();

    updates
        .into_iter()
        .filter(|&(i, rb)| table.set_range_bearing_at(i, rb))
        .count()
}

/// Attach N-number registrations to entries with a US ICAO address and no
/// owner details yet. Returns the number of entries updated.
pub fn apply_registrations(table: &mut TrafficTable) -> usize {
    let updates: Vec<(usize, OwnerInfo)> = table
        .iter()
        .enumerate()
        .filter(|(_, e)| e.owner.registration.is_empty())
        .filter(|(_, e)| {
            matches!(
                e.report.address_type,
                AddressType::AdsbIcao | AddressType::TisbIcao
            )
        })
        .filter_map(|(i, e)| {
            let address = e.report.participant_address;
            let registration = icao_to_n_number(address)?;
            Some((
                i,
                OwnerInfo {
                    address,
                    registration,
                    ..Default::default()
                },
            ))
        })
        .collect();

    updates
        .into_iter()
        .map(|(i, owner)| table.set_owner_info_at(i, owner))
        .filter(|&updated| updated)
        .count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
