//! The typed store over a key-value backend.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use racewire_core::{
    Flag, PenaltyRecord, Pilot, RaceState, SectorState, Snapshot, SECTOR_IDS,
};

use crate::error::StoreError;
use crate::keys;
use crate::kv::{KvBackend, WriteBatch};

/// A pilot row as stored. The registration time stays server-side and is
/// not part of the wire `Pilot` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PilotRow {
    #[serde(flatten)]
    pilot: Pilot,
    registered_at: DateTime<Utc>,
}

/// An entry in the append-only action log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEntry {
    /// Monotonic log sequence number.
    pub seq: u64,
    /// Operation name, e.g. `"set_flag"`.
    pub kind: String,
    /// Operation payload as recorded at dispatch time.
    pub payload: serde_json::Value,
    /// When the entry was appended.
    pub ts: DateTime<Utc>,
}

/// Typed store for the race row, pilots, sectors, penalties, and the
/// action log.
///
/// All mutations commit synchronously before returning, so every snapshot
/// read afterwards reflects them. Constraint checks run before any write.
pub struct RaceStore<B: KvBackend> {
    backend: Arc<B>,
    // A sequence read and the batch committing it must not interleave
    // across concurrent appenders.
    append_lock: Mutex<()>,
}

impl<B: KvBackend> RaceStore<B> {
    /// Create a store over the given backend.
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            append_lock: Mutex::new(()),
        }
    }

    /// Seed the race row and the three sector rows if missing.
    ///
    /// Idempotent: reopening an existing database leaves its state alone.
    pub fn init(&self) -> Result<(), StoreError> {
        if self.backend.get(&keys::race_key())?.is_some() {
            return Ok(());
        }
        let mut batch = WriteBatch::new();
        batch.put(keys::race_key(), serde_json::to_vec(&RaceState::new())?);
        for &id in &SECTOR_IDS {
            batch.put(keys::sector_key(id), serde_json::to_vec(&SectorState::new(id))?);
        }
        self.backend.write_batch(batch)
    }

    /// Read the singleton race row.
    pub fn race(&self) -> Result<RaceState, StoreError> {
        match self.backend.get(&keys::race_key())? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(RaceState::new()),
        }
    }

    /// Read all pilots, ordered by number.
    pub fn pilots(&self) -> Result<Vec<Pilot>, StoreError> {
        let mut pilots = Vec::new();
        for (_, value) in self.backend.prefix_iterator(&keys::pilot_prefix())? {
            let row: PilotRow = serde_json::from_slice(&value)?;
            pilots.push(row.pilot);
        }
        Ok(pilots)
    }

    /// Read all sector rows, ordered by id.
    pub fn sectors(&self) -> Result<Vec<SectorState>, StoreError> {
        let mut sectors = Vec::new();
        for (_, value) in self.backend.prefix_iterator(&keys::sector_prefix())? {
            sectors.push(serde_json::from_slice(&value)?);
        }
        Ok(sectors)
    }

    /// Read the penalty log, oldest first.
    pub fn penalties(&self) -> Result<Vec<PenaltyRecord>, StoreError> {
        let mut penalties = Vec::new();
        for (_, value) in self.backend.prefix_iterator(&keys::penalty_prefix())? {
            penalties.push(serde_json::from_slice(&value)?);
        }
        Ok(penalties)
    }

    /// Read the action log, oldest first.
    pub fn actions(&self) -> Result<Vec<ActionEntry>, StoreError> {
        let mut actions = Vec::new();
        for (_, value) in self.backend.prefix_iterator(&keys::action_prefix())? {
            actions.push(serde_json::from_slice(&value)?);
        }
        Ok(actions)
    }

    /// Assemble the full-state snapshot.
    pub fn read_snapshot(&self) -> Result<Snapshot, StoreError> {
        Ok(Snapshot::new(
            self.race()?,
            self.pilots()?,
            self.sectors()?,
            self.penalties()?,
        ))
    }

    /// Set the global flag.
    pub fn set_flag(&self, flag: Flag) -> Result<(), StoreError> {
        let mut race = self.race()?;
        race.flag = flag;
        race.updated_at = Utc::now();
        self.put_race(&race)
    }

    /// Mark the race as started.
    pub fn start_race(&self) -> Result<(), StoreError> {
        let mut race = self.race()?;
        race.started = true;
        race.updated_at = Utc::now();
        self.put_race(&race)
    }

    /// Reset the race: race row back to defaults, pilots removed, sectors
    /// reset. Penalties and the action log are retained as history.
    pub fn reset_race(&self) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.put(keys::race_key(), serde_json::to_vec(&RaceState::new())?);
        for (key, _) in self.backend.prefix_iterator(&keys::pilot_prefix())? {
            batch.delete(key);
        }
        for &id in &SECTOR_IDS {
            batch.put(keys::sector_key(id), serde_json::to_vec(&SectorState::new(id))?);
        }
        self.backend.write_batch(batch)
    }

    /// Set safety car deployment. Both flags are stored exactly as given.
    pub fn set_safety_car(&self, active: bool, in_this_lap: bool) -> Result<(), StoreError> {
        let mut race = self.race()?;
        race.safety_car = active;
        race.safety_car_this_lap = in_this_lap;
        race.updated_at = Utc::now();
        self.put_race(&race)
    }

    /// Set a sector's local flag and marshal intervention state.
    pub fn set_sector_flag(
        &self,
        sector_id: u8,
        flag: Flag,
        marshal_intervene: bool,
    ) -> Result<SectorState, StoreError> {
        if !SECTOR_IDS.contains(&sector_id) {
            return Err(StoreError::InvalidSector { sector_id });
        }
        let mut sector = self.sector(sector_id)?;
        sector.flag = flag;
        sector.marshal_intervene = marshal_intervene;
        sector.last_update = Utc::now();
        self.backend
            .put(&keys::sector_key(sector_id), &serde_json::to_vec(&sector)?)?;
        Ok(sector)
    }

    /// Set or clear the blue flag on a pilot.
    pub fn assign_blue_flag(&self, number: &str, assign: bool) -> Result<Pilot, StoreError> {
        let key = keys::pilot_key(number);
        let mut row: PilotRow = match self.backend.get(&key)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => {
                return Err(StoreError::UnknownPilot {
                    number: number.to_string(),
                })
            }
        };
        row.pilot.blue_flag = assign;
        self.backend.put(&key, &serde_json::to_vec(&row)?)?;
        Ok(row.pilot)
    }

    /// Register a pilot. Rejected once the race has started and on
    /// duplicate numbers.
    pub fn register_pilot(
        &self,
        first_name: &str,
        last_name: &str,
        number: &str,
    ) -> Result<Pilot, StoreError> {
        if self.race()?.started {
            return Err(StoreError::RaceStarted);
        }
        let key = keys::pilot_key(number);
        if self.backend.exists(&key)? {
            return Err(StoreError::DuplicatePilot {
                number: number.to_string(),
            });
        }
        let row = PilotRow {
            pilot: Pilot::new(first_name, last_name, number),
            registered_at: Utc::now(),
        };
        self.backend.put(&key, &serde_json::to_vec(&row)?)?;
        Ok(row.pilot)
    }

    /// Append a penalty to the log.
    pub fn add_penalty(&self, penalty: &PenaltyRecord) -> Result<(), StoreError> {
        let _guard = self.append_lock.lock().unwrap_or_else(|e| e.into_inner());
        let seq = self.next_seq(&keys::penalty_seq_key())?;
        let mut batch = WriteBatch::new();
        batch.put(keys::penalty_key(seq), serde_json::to_vec(penalty)?);
        batch.put(keys::penalty_seq_key(), seq.to_be_bytes().to_vec());
        self.backend.write_batch(batch)
    }

    /// Append an operation record to the action log.
    pub fn append_action(
        &self,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<u64, StoreError> {
        let _guard = self.append_lock.lock().unwrap_or_else(|e| e.into_inner());
        let seq = self.next_seq(&keys::action_seq_key())?;
        let entry = ActionEntry {
            seq,
            kind: kind.to_string(),
            payload,
            ts: Utc::now(),
        };
        let mut batch = WriteBatch::new();
        batch.put(keys::action_key(seq), serde_json::to_vec(&entry)?);
        batch.put(keys::action_seq_key(), seq.to_be_bytes().to_vec());
        self.backend.write_batch(batch)?;
        Ok(seq)
    }

    /// Overwrite local state with a peer's snapshot in one atomic batch.
    ///
    /// The race row, pilot set, and sector rows are replaced wholesale;
    /// the local penalty log and action log are not touched. All rewritten
    /// rows are stamped with the local receive time.
    pub fn apply_peer_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut batch = WriteBatch::new();

        let mut race = snapshot.race();
        race.updated_at = now;
        batch.put(keys::race_key(), serde_json::to_vec(&race)?);

        for (key, _) in self.backend.prefix_iterator(&keys::pilot_prefix())? {
            batch.delete(key);
        }
        for pilot in &snapshot.pilots {
            let row = PilotRow {
                pilot: pilot.clone(),
                registered_at: now,
            };
            batch.put(keys::pilot_key(&pilot.number), serde_json::to_vec(&row)?);
        }

        for sector in &snapshot.sectors {
            if !SECTOR_IDS.contains(&sector.sector_id) {
                continue;
            }
            let mut sector = sector.clone();
            sector.last_update = now;
            batch.put(keys::sector_key(sector.sector_id), serde_json::to_vec(&sector)?);
        }

        self.backend.write_batch(batch)
    }

    /// Flush the backend to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.backend.flush()
    }

    fn sector(&self, sector_id: u8) -> Result<SectorState, StoreError> {
        match self.backend.get(&keys::sector_key(sector_id))? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(SectorState::new(sector_id)),
        }
    }

    fn put_race(&self, race: &RaceState) -> Result<(), StoreError> {
        self.backend.put(&keys::race_key(), &serde_json::to_vec(race)?)
    }

    fn next_seq(&self, counter_key: &[u8]) -> Result<u64, StoreError> {
        let current = match self.backend.get(counter_key)? {
            Some(bytes) => {
                let mut buf = [0u8; 8];
                if bytes.len() == 8 {
                    buf.copy_from_slice(&bytes);
                }
                u64::from_be_bytes(buf)
            }
            None => 0,
        };
        Ok(current + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryBackend;

    fn new_store() -> RaceStore<MemoryBackend> {
        let store = RaceStore::new(Arc::new(MemoryBackend::new()));
        store.init().unwrap();
        store
    }

    #[test]
    fn test_init_seeds_sectors() {
        let store = new_store();
        let snapshot = store.read_snapshot().unwrap();
        assert_eq!(snapshot.sectors.len(), 3);
        assert!(!snapshot.started);
        assert_eq!(snapshot.flag, Flag::None);
    }

    #[test]
    fn test_init_is_idempotent() {
        let store = new_store();
        store.set_flag(Flag::Red).unwrap();
        store.init().unwrap();
        assert_eq!(store.race().unwrap().flag, Flag::Red);
    }

    #[test]
    fn test_register_and_duplicate() {
        let store = new_store();
        store.register_pilot("Ada", "Lovelace", "7").unwrap();

        let err = store.register_pilot("Grace", "Hopper", "7").unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePilot { .. }));
        assert_eq!(store.pilots().unwrap().len(), 1);
    }

    #[test]
    fn test_register_rejected_after_start() {
        let store = new_store();
        store.start_race().unwrap();

        let err = store.register_pilot("Ada", "Lovelace", "7").unwrap_err();
        assert!(matches!(err, StoreError::RaceStarted));
    }

    #[test]
    fn test_blue_flag_requires_known_pilot() {
        let store = new_store();
        let err = store.assign_blue_flag("9", true).unwrap_err();
        assert!(matches!(err, StoreError::UnknownPilot { .. }));

        store.register_pilot("Ada", "Lovelace", "9").unwrap();
        let pilot = store.assign_blue_flag("9", true).unwrap();
        assert!(pilot.blue_flag);
        let pilot = store.assign_blue_flag("9", false).unwrap();
        assert!(!pilot.blue_flag);
    }

    #[test]
    fn test_sector_flag_range_checked_before_write() {
        let store = new_store();
        let err = store.set_sector_flag(4, Flag::Yellow, true).unwrap_err();
        assert!(matches!(err, StoreError::InvalidSector { sector_id: 4 }));

        let sector = store.set_sector_flag(2, Flag::Yellow, true).unwrap();
        assert_eq!(sector.flag, Flag::Yellow);
        assert!(sector.marshal_intervene);
    }

    #[test]
    fn test_safety_car_flags_stored_independently() {
        let store = new_store();
        store.set_safety_car(true, true).unwrap();
        let race = store.race().unwrap();
        assert!(race.safety_car && race.safety_car_this_lap);

        // The two flags are not coupled: this_lap can be set on its own
        store.set_safety_car(false, true).unwrap();
        let race = store.race().unwrap();
        assert!(!race.safety_car);
        assert!(race.safety_car_this_lap);

        store.set_safety_car(false, false).unwrap();
        let race = store.race().unwrap();
        assert!(!race.safety_car && !race.safety_car_this_lap);
    }

    #[test]
    fn test_reset_keeps_penalties() {
        let store = new_store();
        store.register_pilot("Ada", "Lovelace", "7").unwrap();
        store.start_race().unwrap();
        store.set_flag(Flag::Red).unwrap();
        store
            .add_penalty(&PenaltyRecord::new("7", "stop-and-go"))
            .unwrap();

        store.reset_race().unwrap();

        let snapshot = store.read_snapshot().unwrap();
        assert!(!snapshot.started);
        assert_eq!(snapshot.flag, Flag::None);
        assert!(snapshot.pilots.is_empty());
        assert_eq!(snapshot.penalties.len(), 1);
    }

    #[test]
    fn test_penalty_order() {
        let store = new_store();
        for n in ["1", "2", "3"] {
            store.add_penalty(&PenaltyRecord::new(n, "warning")).unwrap();
        }
        let numbers: Vec<_> = store
            .penalties()
            .unwrap()
            .into_iter()
            .map(|p| p.target_number)
            .collect();
        assert_eq!(numbers, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_concurrent_penalties_all_kept() {
        let store = Arc::new(new_store());
        let threads = 16usize;
        let per_thread = 500usize;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        store
                            .add_penalty(&PenaltyRecord::new(format!("{t}-{i}"), "warning"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.penalties().unwrap().len(), threads * per_thread);
    }

    #[test]
    fn test_concurrent_actions_get_distinct_sequences() {
        let store = Arc::new(new_store());
        let threads = 8usize;
        let per_thread = 200usize;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..per_thread {
                        store.append_action("event", serde_json::json!({})).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let actions = store.actions().unwrap();
        assert_eq!(actions.len(), threads * per_thread);
        let seqs: std::collections::HashSet<u64> = actions.iter().map(|a| a.seq).collect();
        assert_eq!(seqs.len(), threads * per_thread);
    }

    #[test]
    fn test_action_log_appends() {
        let store = new_store();
        let first = store
            .append_action("set_flag", serde_json::json!({"flag": "red"}))
            .unwrap();
        let second = store
            .append_action("start_race", serde_json::json!({}))
            .unwrap();
        assert!(second > first);

        let actions = store.actions().unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].kind, "set_flag");
    }

    #[test]
    fn test_apply_peer_snapshot_overwrites_roster() {
        let store = new_store();
        store.register_pilot("Local", "Pilot", "1").unwrap();
        store.add_penalty(&PenaltyRecord::new("1", "warning")).unwrap();

        let mut incoming = Snapshot::empty();
        incoming.started = true;
        incoming.flag = Flag::Yellow;
        incoming.pilots.push(Pilot::new("Remote", "Pilot", "2"));
        incoming.sectors[1].flag = Flag::Yellow;

        store.apply_peer_snapshot(&incoming).unwrap();

        let snapshot = store.read_snapshot().unwrap();
        assert!(snapshot.started);
        assert_eq!(snapshot.flag, Flag::Yellow);
        assert_eq!(snapshot.pilots.len(), 1);
        assert_eq!(snapshot.pilots[0].number, "2");
        assert_eq!(snapshot.sector(2).unwrap().flag, Flag::Yellow);
        // Local penalties survive a merge
        assert_eq!(snapshot.penalties.len(), 1);
    }

    #[test]
    fn test_apply_peer_snapshot_skips_unknown_sector() {
        let store = new_store();
        let mut incoming = Snapshot::empty();
        incoming.sectors.push(SectorState::new(9));

        store.apply_peer_snapshot(&incoming).unwrap();
        assert_eq!(store.sectors().unwrap().len(), 3);
    }
}
