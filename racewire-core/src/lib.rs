//! # Racewire Core
//!
//! Core types for the Racewire race-control service.
//!
//! This crate provides the foundation for all other Racewire crates:
//! - Race flag states and the singleton race row
//! - Pilot, sector, and penalty records
//! - The full-state snapshot exchanged between instances and clients
//! - Operator event payloads (pit actions, generic race events,
//!   device identification)

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::FlagParseError;
pub use types::{
    DeviceIdentify, Flag, Pilot, PitAction, PenaltyRecord, RaceEvent, RaceState, SectorState,
    Snapshot, SECTOR_IDS,
};
