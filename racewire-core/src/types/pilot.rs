//! Registered pilots.

use serde::{Deserialize, Serialize};

/// A registered pilot.
///
/// The car number is the unique key across the store. Wire field names
/// follow the client protocol (`firstName`, `lastName`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pilot {
    /// Given name.
    #[serde(rename = "firstName")]
    pub first_name: String,
    /// Family name.
    #[serde(rename = "lastName")]
    pub last_name: String,
    /// Car number, unique across the store.
    pub number: String,
    /// Whether the blue flag is currently assigned to this pilot.
    #[serde(default)]
    pub blue_flag: bool,
}

impl Pilot {
    /// Create a new pilot with no blue flag assigned.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        number: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            number: number.into(),
            blue_flag: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let pilot = Pilot::new("Ayrton", "Senna", "12");
        let json = serde_json::to_value(&pilot).unwrap();
        assert_eq!(json["firstName"], "Ayrton");
        assert_eq!(json["lastName"], "Senna");
        assert_eq!(json["number"], "12");
        assert_eq!(json["blue_flag"], false);
    }

    #[test]
    fn test_blue_flag_defaults_false() {
        let pilot: Pilot = serde_json::from_str(
            r#"{"firstName":"A","lastName":"B","number":"7"}"#,
        )
        .unwrap();
        assert!(!pilot.blue_flag);
    }
}
