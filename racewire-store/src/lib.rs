//! # Racewire Store
//!
//! Persistent race state storage for the Racewire race-control service.
//!
//! This crate provides:
//! - A key-value backend abstraction with in-memory and RocksDB implementations
//! - `RaceStore`, the typed store holding the race row, pilots, sectors,
//!   penalties, and the append-only action log
//! - Atomic full-state overwrite for peer replication
//!
//! ## Architecture
//!
//! All rows are JSON-encoded under single-byte key prefixes. Mutations go
//! through `RaceStore`, which enforces domain constraints (duplicate pilot
//! numbers, registration after race start, sector id range) before touching
//! the backend. The peer merge path replaces the race row, pilots, and
//! sectors in one write batch while leaving penalties and the action log
//! untouched.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod keys;
pub mod kv;
pub mod race;

pub use error::StoreError;
pub use keys::KeyPrefix;
pub use kv::{BatchOp, KvBackend, MemoryBackend, RocksBackend, WriteBatch};
pub use race::{ActionEntry, RaceStore};
