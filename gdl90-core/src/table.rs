//! Traffic table keyed by callsign.
//!
//! Pure state, no I/O. Entries are kept in insertion order and handed out
//! by index or callsign lookup; callers never hold references across an
//! upsert. Lookups are linear scans, which is fine for the tens of targets
//! a receiver reports at once.
//!
//! Decoding only ever replaces the decoded report inside an entry. Owner
//! details and range/bearing belong to external callers and survive updates.

use serde::Serialize;

use crate::types::*;

/// How a decoded report is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TableMode {
    /// One entry per callsign, updated in place.
    #[default]
    Merge,
    /// Every report appended as a new entry.
    Append,
}

// ---------------------------------------------------------------------------
// Traffic entry
// ---------------------------------------------------------------------------

/// One aircraft in the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficEntry {
    pub report: TrafficReport,
    pub owner: OwnerInfo,
    pub range: Option<RangeBearing>,
    pub first_seen: f64,
    pub last_update: f64,
    pub update_count: u64,
}

impl TrafficEntry {
    pub fn new(report: TrafficReport, timestamp: f64) -> Self {
        TrafficEntry {
            report,
            owner: OwnerInfo::default(),
            range: None,
            first_seen: timestamp,
            last_update: timestamp,
            update_count: 1,
        }
    }

    pub fn callsign(&self) -> &str {
        &self.report.callsign
    }

    pub fn age(&self, now: f64) -> f64 {
        now - self.last_update
    }
}

/// Where an upsert landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upsert {
    pub index: usize,
    pub inserted: bool,
}

// ---------------------------------------------------------------------------
// Traffic table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct TrafficTable {
    entries: Vec<TrafficEntry>,
    mode: TableMode,
}

impl TrafficTable {
    pub fn new(mode: TableMode) -> Self {
        TrafficTable {
            entries: Vec::new(),
            mode,
        }
    }

    pub fn mode(&self) -> TableMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrafficEntry> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&TrafficEntry> {
        self.entries.get(index)
    }

    /// Index of the first entry with this callsign.
    pub fn position(&self, callsign: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.callsign() == callsign)
    }

    pub fn find(&self, callsign: &str) -> Option<&TrafficEntry> {
        self.entries.iter().find(|e| e.callsign() == callsign)
    }

    fn find_mut(&mut self, callsign: &str) -> Result<&mut TrafficEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.callsign() == callsign)
            .ok_or_else(|| Gdl90Error::UnknownCallsign(callsign.to_string()))
    }

    /// Insert a decoded report or overwrite the decoded fields of its entry.
    pub fn upsert(&mut self, report: TrafficReport, timestamp: f64) -> Upsert {
        if self.mode == TableMode::Merge {
            if let Some(index) = self.position(&report.callsign) {
                let entry = &mut self.entries[index];
                entry.report = report;
                entry.last_update = timestamp;
                entry.update_count += 1;
                return Upsert {
                    index,
                    inserted: false,
                };
            }
        }

        self.entries.push(TrafficEntry::new(report, timestamp));
        Upsert {
            index: self.entries.len() - 1,
            inserted: true,
        }
    }

    // -- Per-callsign getters ----------------------------------------------

    /// `(latitude, longitude, altitude_ft)`.
    pub fn location(&self, callsign: &str) -> Option<(f64, f64, Option<i32>)> {
        self.find(callsign)
            .map(|e| (e.report.latitude, e.report.longitude, e.report.altitude_ft))
    }

    pub fn heading(&self, callsign: &str) -> Option<f64> {
        self.find(callsign).map(|e| e.report.track_deg)
    }

    pub fn horizontal_velocity(&self, callsign: &str) -> Option<u16> {
        self.find(callsign).map(|e| e.report.horizontal_velocity_kt)
    }

    pub fn vertical_velocity(&self, callsign: &str) -> Option<i32> {
        self.find(callsign).map(|e| e.report.vertical_velocity_fpm)
    }

    /// `(address_type, participant_address)`.
    pub fn participant_address(&self, callsign: &str) -> Option<(AddressType, u32)> {
        self.find(callsign)
            .map(|e| (e.report.address_type, e.report.participant_address))
    }

    pub fn last_update(&self, callsign: &str) -> Option<f64> {
        self.find(callsign).map(|e| e.last_update)
    }

    pub fn owner_info(&self, callsign: &str) -> Option<&OwnerInfo> {
        self.find(callsign).map(|e| &e.owner)
    }

    pub fn range_bearing(&self, callsign: &str) -> Option<RangeBearing> {
        self.find(callsign).and_then(|e| e.range)
    }

    // -- Per-callsign setters ----------------------------------------------

    pub fn set_owner_info(&mut self, callsign: &str, owner: OwnerInfo) -> Result<()> {
        self.find_mut(callsign)?.owner = owner;
        Ok(())
    }

    pub fn set_range_bearing(&mut self, callsign: &str, range: RangeBearing) -> Result<()> {
        self.find_mut(callsign)?.range = Some(range);
        Ok(())
    }

    // -- Per-index setters -------------------------------------------------
    //
    // Append mode holds several entries per callsign; these address one of
    // them. False when `index` is out of range.

    pub fn set_owner_info_at(&mut self, index: usize, owner: OwnerInfo) -> bool {
        match self.entries.get_mut(index) {
            Some(e) => {
                e.owner = owner;
                true
            }
            None => false,
        }
    }

    pub fn set_range_bearing_at(&mut self, index: usize, range: RangeBearing) -> bool {
        match self.entries.get_mut(index) {
            Some(e) => {
                e.range = Some(range);
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
