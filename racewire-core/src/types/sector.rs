//! Track sector rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::race::Flag;

/// The fixed set of sector ids. Exactly these three rows exist at all
/// times; sectors are never created or deleted at runtime.
pub const SECTOR_IDS: [u8; 3] = [1, 2, 3];

/// State of one track sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorState {
    /// Sector id, always in 1..=3.
    pub sector_id: u8,
    /// Flag shown in this sector.
    pub flag: Flag,
    /// Whether a marshal is intervening on track.
    pub marshal_intervene: bool,
    /// Last modification time.
    pub last_update: DateTime<Utc>,
}

impl SectorState {
    /// Create the default row for a sector: no flag, no intervention.
    pub fn new(sector_id: u8) -> Self {
        Self {
            sector_id,
            flag: Flag::None,
            marshal_intervene: false,
            last_update: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_defaults() {
        let sector = SectorState::new(2);
        assert_eq!(sector.sector_id, 2);
        assert_eq!(sector.flag, Flag::None);
        assert!(!sector.marshal_intervene);
    }
}
