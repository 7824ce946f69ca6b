//! Journal entries: delivered readings, one JSONL line each.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SensorReading;

/// A reading as recorded in the journal.
///
/// `run` identifies the relay process that delivered it, so journals
/// appended to across restarts can be split back apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub run: Uuid,
    pub received_at: Timestamp,
    pub reading: SensorReading,
}
