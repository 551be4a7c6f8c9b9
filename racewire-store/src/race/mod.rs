//! Typed race state storage.

mod store;

pub use store::{ActionEntry, RaceStore};
