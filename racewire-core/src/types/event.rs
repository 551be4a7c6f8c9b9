//! Pass-through event payloads.
//!
//! Pit actions, free-form race events and device identification requests
//! are broadcast to clients and logged, but carry no server-side state
//! beyond the action log entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pit-box action reported by a pit terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitAction {
    /// Identifier of the pit box that produced the action.
    pub box_id: String,
    /// Action name, e.g. `"open"` or `"close"`.
    pub action: String,
    /// Optional free-form note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When the action happened.
    pub ts: DateTime<Utc>,
}

impl PitAction {
    /// Create a pit action stamped with the current time.
    pub fn new(box_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            box_id: box_id.into(),
            action: action.into(),
            note: None,
            ts: Utc::now(),
        }
    }
}

/// A free-form race event for the action log and client feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceEvent {
    /// Event category, e.g. `"incident"` or `"note"`.
    pub event_type: String,
    /// Sector the event relates to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector_id: Option<u8>,
    /// Pilot number the event relates to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    /// Free-form detail text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// When the event happened.
    pub ts: DateTime<Utc>,
}

impl RaceEvent {
    /// Create an event stamped with the current time.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            sector_id: None,
            number: None,
            details: None,
            ts: Utc::now(),
        }
    }
}

/// A request to make a physical device identify itself (blink, beep).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentify {
    /// Device kind, e.g. `"sector-panel"` or `"pit-display"`.
    pub kind: String,
    /// Sector the device belongs to, if sector-bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector_id: Option<u8>,
    /// Host the device is reachable at, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// When the request was issued.
    pub ts: DateTime<Utc>,
}

impl DeviceIdentify {
    /// Create an identification request stamped with the current time.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            sector_id: None,
            host: None,
            ts: Utc::now(),
        }
    }
}
