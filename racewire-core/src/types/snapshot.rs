//! Full-state snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::penalty::PenaltyRecord;
use super::pilot::Pilot;
use super::race::{Flag, RaceState};
use super::sector::{SectorState, SECTOR_IDS};

/// The full serialized race state at a point in time.
///
/// Snapshots are exchanged verbatim between peers (`state_update`) and
/// pushed to UI clients. A snapshot is always internally consistent:
/// storage commits synchronously before producing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Whether the race has been started.
    pub started: bool,
    /// The global flag currently shown.
    pub flag: Flag,
    /// Whether the safety car is deployed.
    pub safety_car: bool,
    /// Whether the safety car enters this lap.
    pub safety_car_this_lap: bool,
    /// All registered pilots.
    pub pilots: Vec<Pilot>,
    /// The three sector rows, ordered by id.
    pub sectors: Vec<SectorState>,
    /// The penalty log, oldest first.
    pub penalties: Vec<PenaltyRecord>,
    /// Last race-row modification time.
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot from its parts.
    pub fn new(
        race: RaceState,
        pilots: Vec<Pilot>,
        sectors: Vec<SectorState>,
        penalties: Vec<PenaltyRecord>,
    ) -> Self {
        Self {
            started: race.started,
            flag: race.flag,
            safety_car: race.safety_car,
            safety_car_this_lap: race.safety_car_this_lap,
            pilots,
            sectors,
            penalties,
            updated_at: race.updated_at,
        }
    }

    /// Extract the race row from the snapshot.
    pub fn race(&self) -> RaceState {
        RaceState {
            started: self.started,
            flag: self.flag,
            safety_car: self.safety_car,
            safety_car_this_lap: self.safety_car_this_lap,
            updated_at: self.updated_at,
        }
    }

    /// Look up a pilot by number.
    pub fn pilot(&self, number: &str) -> Option<&Pilot> {
        self.pilots.iter().find(|p| p.number == number)
    }

    /// Look up a sector by id.
    pub fn sector(&self, sector_id: u8) -> Option<&SectorState> {
        self.sectors.iter().find(|s| s.sector_id == sector_id)
    }

    /// A snapshot with all defaults: useful as a starting point in tests.
    pub fn empty() -> Self {
        Self::new(
            RaceState::new(),
            Vec::new(),
            SECTOR_IDS.iter().map(|&id| SectorState::new(id)).collect(),
            Vec::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot_shape() {
        let snapshot = Snapshot::empty();
        assert!(!snapshot.started);
        assert_eq!(snapshot.flag, Flag::None);
        assert!(snapshot.pilots.is_empty());
        assert_eq!(snapshot.sectors.len(), 3);
        assert_eq!(
            snapshot.sectors.iter().map(|s| s.sector_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_json_roundtrip() {
        let mut snapshot = Snapshot::empty();
        snapshot.flag = Flag::Red;
        snapshot.pilots.push(Pilot::new("A", "B", "7"));

        let text = serde_json::to_string(&snapshot).unwrap();
        let decoded: Snapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn test_lookups() {
        let mut snapshot = Snapshot::empty();
        snapshot.pilots.push(Pilot::new("A", "B", "7"));

        assert!(snapshot.pilot("7").is_some());
        assert!(snapshot.pilot("8").is_none());
        assert!(snapshot.sector(2).is_some());
        assert!(snapshot.sector(4).is_none());
    }
}
