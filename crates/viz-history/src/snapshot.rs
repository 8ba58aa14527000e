/// Opaque document snapshots and the capability documents implement to produce them.
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serialized state of a whole document at one instant.
///
/// The payload is opaque to the history system. Cloning is cheap and the
/// bytes are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    payload: Arc<[u8]>,
    taken_at: DateTime<Utc>,
}

impl Snapshot {
    /// Wraps already-serialized document bytes, stamped with the current time.
    pub fn new(payload: impl Into<Arc<[u8]>>) -> Self {
        Self {
            payload: payload.into(),
            taken_at: Utc::now(),
        }
    }

    /// Serializes `value` with bincode into a new snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn encode<T: Serialize>(value: &T) -> Result<Self> {
        let bytes = bincode::serialize(value).context("Failed to serialize snapshot")?;
        Ok(Self::new(bytes))
    }

    /// Deserializes the payload with bincode.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a valid encoding of `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        bincode::deserialize(&self.payload).context("Failed to deserialize snapshot")
    }

    /// Raw serialized bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// When this snapshot was captured.
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Capability a host document implements so it can be recorded and restored.
///
/// Only `serialize` and `deserialize` are required. `capture` and `restore`
/// are the entry points the editor hands to `HistoryManager`.
pub trait SnapshotDocument {
    /// Serializes the full editable state.
    fn serialize(&self) -> Result<Vec<u8>>;

    /// Replaces the full editable state with a previously serialized one.
    fn deserialize(&mut self, bytes: &[u8]) -> Result<()>;

    /// Captures the current state as a snapshot.
    fn capture(&self) -> Result<Snapshot> {
        Ok(Snapshot::new(self.serialize()?))
    }

    /// Restores the state held by `snapshot`.
    fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.deserialize(snapshot.payload())
    }
}
