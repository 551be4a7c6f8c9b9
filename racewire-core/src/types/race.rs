//! Race flags and the singleton race row.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FlagParseError;

/// A race-control flag.
///
/// Serialized in kebab-case on the wire (`"black-checkered"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flag {
    /// No flag shown.
    #[default]
    None,
    /// Track clear.
    Green,
    /// Hazard, no overtaking.
    Yellow,
    /// Session stopped.
    Red,
    /// Faster car approaching.
    Blue,
    /// Final lap.
    White,
    /// Disqualification.
    Black,
    /// End of race.
    BlackCheckered,
}

impl Flag {
    /// Get the wire name of the flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::None => "none",
            Flag::Green => "green",
            Flag::Yellow => "yellow",
            Flag::Red => "red",
            Flag::Blue => "blue",
            Flag::White => "white",
            Flag::Black => "black",
            Flag::BlackCheckered => "black-checkered",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flag {
    type Err = FlagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Flag::None),
            "green" => Ok(Flag::Green),
            "yellow" => Ok(Flag::Yellow),
            "red" => Ok(Flag::Red),
            "blue" => Ok(Flag::Blue),
            "white" => Ok(Flag::White),
            "black" => Ok(Flag::Black),
            "black-checkered" => Ok(Flag::BlackCheckered),
            other => Err(FlagParseError(other.to_string())),
        }
    }
}

/// The singleton race state row.
///
/// Exactly one logical race exists per instance at any time. The row is
/// created with defaults at process start and reset, never destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceState {
    /// Whether the race has been started.
    pub started: bool,
    /// The global flag currently shown.
    pub flag: Flag,
    /// Whether the safety car is deployed.
    pub safety_car: bool,
    /// Whether the safety car enters this lap.
    pub safety_car_this_lap: bool,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl RaceState {
    /// Create the default race row: not started, no flag, no safety car.
    pub fn new() -> Self {
        Self {
            started: false,
            flag: Flag::None,
            safety_car: false,
            safety_car_this_lap: false,
            updated_at: Utc::now(),
        }
    }
}

impl Default for RaceState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wire_names() {
        assert_eq!(serde_json::to_string(&Flag::None).unwrap(), "\"none\"");
        assert_eq!(serde_json::to_string(&Flag::Red).unwrap(), "\"red\"");
        assert_eq!(
            serde_json::to_string(&Flag::BlackCheckered).unwrap(),
            "\"black-checkered\""
        );
    }

    #[test]
    fn test_flag_roundtrip() {
        for s in [
            "none",
            "green",
            "yellow",
            "red",
            "blue",
            "white",
            "black",
            "black-checkered",
        ] {
            let flag: Flag = s.parse().unwrap();
            assert_eq!(flag.as_str(), s);
            let decoded: Flag = serde_json::from_str(&format!("\"{s}\"")).unwrap();
            assert_eq!(decoded, flag);
        }
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!("chequered".parse::<Flag>().is_err());
        assert!(serde_json::from_str::<Flag>("\"purple\"").is_err());
    }

    #[test]
    fn test_race_defaults() {
        let race = RaceState::new();
        assert!(!race.started);
        assert_eq!(race.flag, Flag::None);
        assert!(!race.safety_car);
        assert!(!race.safety_car_this_lap);
    }
}
