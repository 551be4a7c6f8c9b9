//! Key schema encoding for storage.
//!
//! All rows are stored with single-byte prefixed keys so each table can be
//! scanned as a key range.

/// Key prefixes for different row types.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyPrefix {
    /// Singleton race row: `0x01`
    Race = 0x01,
    /// Pilot by number: `0x02 || number`
    Pilot = 0x02,
    /// Sector by id: `0x03 || sector_id`
    Sector = 0x03,
    /// Penalty by sequence: `0x04 || seq`
    Penalty = 0x04,
    /// Penalty sequence counter: `0x05`
    PenaltySeq = 0x05,
    /// Action log entry by sequence: `0x06 || seq`
    Action = 0x06,
    /// Action log sequence counter: `0x07`
    ActionSeq = 0x07,
}

/// The singleton race row key.
pub fn race_key() -> Vec<u8> {
    vec![KeyPrefix::Race as u8]
}

/// A pilot row key.
pub fn pilot_key(number: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + number.len());
    key.push(KeyPrefix::Pilot as u8);
    key.extend_from_slice(number.as_bytes());
    key
}

/// The prefix covering all pilot rows.
pub fn pilot_prefix() -> Vec<u8> {
    vec![KeyPrefix::Pilot as u8]
}

/// A sector row key.
pub fn sector_key(sector_id: u8) -> Vec<u8> {
    vec![KeyPrefix::Sector as u8, sector_id]
}

/// The prefix covering all sector rows.
pub fn sector_prefix() -> Vec<u8> {
    vec![KeyPrefix::Sector as u8]
}

/// A penalty row key. Big-endian sequence keeps insertion order under
/// lexicographic iteration.
pub fn penalty_key(seq: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(KeyPrefix::Penalty as u8);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

/// The prefix covering all penalty rows.
pub fn penalty_prefix() -> Vec<u8> {
    vec![KeyPrefix::Penalty as u8]
}

/// The penalty sequence counter key.
pub fn penalty_seq_key() -> Vec<u8> {
    vec![KeyPrefix::PenaltySeq as u8]
}

/// An action log row key.
pub fn action_key(seq: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(KeyPrefix::Action as u8);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

/// The prefix covering all action log rows.
pub fn action_prefix() -> Vec<u8> {
    vec![KeyPrefix::Action as u8]
}

/// The action log sequence counter key.
pub fn action_seq_key() -> Vec<u8> {
    vec![KeyPrefix::ActionSeq as u8]
}
