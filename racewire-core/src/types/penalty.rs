//! Penalty records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry in the append-only penalty log.
///
/// Penalties are never merged field-by-field between instances; the list
/// is replicated as an opaque, ordered whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyRecord {
    /// Car number of the penalized pilot.
    pub target_number: String,
    /// Penalty type (e.g. `"time"`, `"drive-through"`).
    #[serde(rename = "type")]
    pub penalty_type: String,
    /// Time penalty in seconds; zero for non-time penalties.
    #[serde(default)]
    pub amount_seconds: u32,
    /// Reason for the penalty.
    #[serde(default)]
    pub reason: String,
    /// Car number of the party that was hit, if any.
    #[serde(default)]
    pub who_hit: String,
    /// Contact person for the decision.
    #[serde(default)]
    pub contact_person: String,
    /// Free-form comment.
    #[serde(default)]
    pub comment: String,
    /// When the penalty was recorded.
    pub ts: DateTime<Utc>,
}

impl PenaltyRecord {
    /// Create a penalty record timestamped now.
    pub fn new(target_number: impl Into<String>, penalty_type: impl Into<String>) -> Self {
        Self {
            target_number: target_number.into(),
            penalty_type: penalty_type.into(),
            amount_seconds: 0,
            reason: String::new(),
            who_hit: String::new(),
            contact_person: String::new(),
            comment: String::new(),
            ts: Utc::now(),
        }
    }

    /// Set the time amount in seconds.
    pub fn with_amount_seconds(mut self, seconds: u32) -> Self {
        self.amount_seconds = seconds;
        self
    }

    /// Set the reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_field_name() {
        let penalty = PenaltyRecord::new("44", "time").with_amount_seconds(5);
        let json = serde_json::to_value(&penalty).unwrap();
        assert_eq!(json["type"], "time");
        assert_eq!(json["target_number"], "44");
        assert_eq!(json["amount_seconds"], 5);
    }

    #[test]
    fn test_optional_fields_default() {
        let penalty: PenaltyRecord = serde_json::from_str(
            r#"{"target_number":"7","type":"warning","ts":"2026-08-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(penalty.amount_seconds, 0);
        assert!(penalty.reason.is_empty());
        assert!(penalty.comment.is_empty());
    }
}
