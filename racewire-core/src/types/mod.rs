//! Race-control data types.
//!
//! All types serialize to the JSON shapes used on the wire, so the same
//! structs back storage rows, peer replication, and client fan-out.

pub mod event;
pub mod penalty;
pub mod pilot;
pub mod race;
pub mod sector;
pub mod snapshot;

pub use event::{DeviceIdentify, PitAction, RaceEvent};
pub use penalty::PenaltyRecord;
pub use pilot::Pilot;
pub use race::{Flag, RaceState};
pub use sector::{SectorState, SECTOR_IDS};
pub use snapshot::Snapshot;
