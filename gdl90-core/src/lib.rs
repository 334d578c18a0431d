//! gdl90-core: Pure decode + traffic table library for GDL90.
//!
//! No async, no transport handling. One flag-delimited frame goes in, gets
//! de-stuffed, checked and decoded, and traffic reports land in an owned
//! table. The `gdl90` CLI in `gdl90-cli` is built on top of this crate.

pub mod codec;
pub mod config;
pub mod crc;
pub mod decode;
pub mod decoder;
pub mod frame;
pub mod serialize;
pub mod table;
pub mod types;
pub mod uat;

// Re-export commonly used types at crate root
pub use codec::Convention;
pub use decoder::{CrcPolicy, Decoder, DecoderConfig, DecoderStats, Message, ModeSDecoder, Outcome};
pub use frame::{parse_frame, Gdl90Frame};
pub use serialize::serialize_entry;
pub use table::{TableMode, TrafficEntry, TrafficTable, Upsert};
pub use types::*;
