/// Snapshot-based undo/redo history for the canvas editor.
///
/// Provides a `HistoryManager` that keeps a bounded, linear log of opaque
/// document snapshots and a cursor into it. The host document captures and
/// applies snapshots; the manager only decides which one is current.
/// History lives in memory for the length of one editing session.
pub mod config;
pub mod manager;
pub mod snapshot;

pub use config::HistoryConfig;
pub use manager::{HistoryManager, HistoryState, RestoreOutcome};
pub use snapshot::{Snapshot, SnapshotDocument};
