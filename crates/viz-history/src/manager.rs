/// Snapshot history manager with a bounded linear log.
///
/// The log holds whole-document snapshots, oldest first, and a cursor marks
/// the one currently applied. Recording after an undo drops the redo branch.
/// Undo and redo hand the snapshot at the new cursor to a caller-supplied
/// apply function while a re-entrancy guard keeps apply-triggered change
/// notifications out of the log.
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;

use anyhow::Result;

use crate::config::HistoryConfig;
use crate::snapshot::Snapshot;

/// Lifecycle state of a `HistoryManager`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    /// No snapshots recorded; cursor is unset.
    Empty,
    /// At least one snapshot recorded and no restore in progress.
    Ready,
    /// An undo/redo apply is running. Recording is rejected.
    Restoring,
}

/// Result of an undo or redo request.
#[derive(Debug)]
pub enum RestoreOutcome {
    /// The cursor moved and the snapshot was applied.
    Applied,
    /// The cursor moved but the apply function failed.
    ///
    /// The cursor is not rolled back, so the document may no longer match
    /// the snapshot under the cursor.
    ApplyFailed(anyhow::Error),
    /// Nothing to undo/redo, or a restore is already in progress.
    Unavailable,
}

impl RestoreOutcome {
    /// Whether the cursor moved, regardless of apply success.
    pub fn moved(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }

    /// Whether the cursor moved and the snapshot was applied cleanly.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undo => f.write_str("undo"),
            Self::Redo => f.write_str("redo"),
        }
    }
}

#[derive(Default)]
struct Log {
    /// Oldest first.
    entries: VecDeque<Snapshot>,
    /// Index of the current snapshot; `None` iff `entries` is empty.
    cursor: Option<usize>,
}

/// Manages undo/redo history for a single editing session.
///
/// All operations take `&self` so that an apply callback may call back into
/// the same manager; such calls observe [`HistoryState::Restoring`].
/// The manager is single-threaded (`!Sync`).
pub struct HistoryManager {
    log: RefCell<Log>,
    state: Cell<HistoryState>,
    config: HistoryConfig,
}

impl fmt::Debug for HistoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (len, cursor) = match self.log.try_borrow() {
            Ok(log) => (Some(log.entries.len()), log.cursor),
            Err(_) => (None, None),
        };
        f.debug_struct("HistoryManager")
            .field("len", &len)
            .field("cursor", &cursor)
            .field("state", &self.state.get())
            .field("max_entries", &self.config.max_entries)
            .finish()
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

/// Releases the restore guard when dropped, including on error, panic, or
/// cancellation of an async apply.
struct RestoreGuard<'a> {
    manager: &'a HistoryManager,
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        let empty = self
            .manager
            .log
            .try_borrow()
            .map(|log| log.entries.is_empty())
            .unwrap_or(false);
        self.manager.state.set(if empty {
            HistoryState::Empty
        } else {
            HistoryState::Ready
        });
    }
}

impl HistoryManager {
    /// Creates an empty manager.
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            log: RefCell::new(Log::default()),
            state: Cell::new(HistoryState::Empty),
            config: HistoryConfig::with_max_entries(config.max_entries),
        }
    }

    /// Creates an empty manager keeping at most `max_entries` snapshots.
    pub fn with_capacity(max_entries: usize) -> Self {
        Self::new(HistoryConfig::with_max_entries(max_entries))
    }

    /// Seeds the history with the current document state.
    ///
    /// Discards any prior history and leaves exactly one entry with the cursor
    /// on it. Returns `false` if a restore is in progress or `capture` fails;
    /// history is left untouched in both cases.
    pub fn initialize<F>(&self, capture: F) -> bool
    where
        F: FnOnce() -> Result<Snapshot>,
    {
        if self.state.get() == HistoryState::Restoring {
            tracing::warn!("Ignoring history initialization during restore");
            return false;
        }

        let snapshot = match capture() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Failed to capture initial snapshot: {e:#}");
                return false;
            }
        };

        let mut log = self.log.borrow_mut();
        log.entries.clear();
        log.entries.push_back(snapshot);
        log.cursor = Some(0);
        self.state.set(HistoryState::Ready);
        tracing::debug!("History initialized");
        true
    }

    /// Records the document state after a committed edit.
    ///
    /// Drops every entry after the cursor, appends the new snapshot and evicts
    /// the oldest entry past capacity. Returns `false` without capturing while
    /// a restore is in progress, and `false` if `capture` fails.
    pub fn record_snapshot<F>(&self, capture: F) -> bool
    where
        F: FnOnce() -> Result<Snapshot>,
    {
        match self.state.get() {
            HistoryState::Restoring => {
                tracing::trace!("Ignoring snapshot during restore");
                return false;
            }
            HistoryState::Empty | HistoryState::Ready => {}
        }

        let snapshot = match capture() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Failed to capture snapshot: {e:#}");
                return false;
            }
        };

        let mut log = self.log.borrow_mut();
        let keep = log.cursor.map_or(0, |cursor| cursor + 1);
        if log.entries.len() > keep {
            tracing::trace!(
                "Discarding {} redo snapshot(s)",
                log.entries.len() - keep
            );
            log.entries.truncate(keep);
        }

        log.entries.push_back(snapshot);
        while log.entries.len() > self.config.max_entries {
            log.entries.pop_front();
            tracing::trace!("Evicted oldest snapshot");
        }

        log.cursor = Some(log.entries.len() - 1);
        self.state.set(HistoryState::Ready);
        true
    }

    /// Steps back one snapshot and applies it.
    ///
    /// Returns [`RestoreOutcome::Unavailable`] with no state change when the
    /// cursor is at the oldest entry, the log is empty, or a restore is
    /// already running.
    pub fn undo<F>(&self, apply: F) -> RestoreOutcome
    where
        F: FnOnce(&Snapshot) -> Result<()>,
    {
        self.restore(Direction::Undo, apply)
    }

    /// Steps forward one snapshot and applies it.
    ///
    /// Returns [`RestoreOutcome::Unavailable`] with no state change when the
    /// cursor is at the newest entry, the log is empty, or a restore is
    /// already running.
    pub fn redo<F>(&self, apply: F) -> RestoreOutcome
    where
        F: FnOnce(&Snapshot) -> Result<()>,
    {
        self.restore(Direction::Redo, apply)
    }

    /// Like [`undo`](Self::undo) with an asynchronous apply.
    ///
    /// The guard stays set across every await point of `apply`. Dropping the
    /// returned future before completion releases it.
    pub async fn undo_async<F, Fut>(&self, apply: F) -> RestoreOutcome
    where
        F: FnOnce(Snapshot) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        self.restore_async(Direction::Undo, apply).await
    }

    /// Like [`redo`](Self::redo) with an asynchronous apply.
    pub async fn redo_async<F, Fut>(&self, apply: F) -> RestoreOutcome
    where
        F: FnOnce(Snapshot) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        self.restore_async(Direction::Redo, apply).await
    }

    /// Drops all history.
    pub fn clear(&self) {
        let mut log = self.log.borrow_mut();
        log.entries.clear();
        log.cursor = None;
        self.state.set(HistoryState::Empty);
        tracing::debug!("History cleared");
    }

    /// Whether there is an older snapshot to step back to.
    pub fn can_undo(&self) -> bool {
        self.log.borrow().cursor.is_some_and(|cursor| cursor > 0)
    }

    /// Whether there is a newer snapshot to step forward to.
    pub fn can_redo(&self) -> bool {
        let log = self.log.borrow();
        log.cursor
            .is_some_and(|cursor| cursor + 1 < log.entries.len())
    }

    /// Number of snapshots in the log.
    pub fn history_size(&self) -> usize {
        self.log.borrow().entries.len()
    }

    /// Index of the current snapshot, `None` when the log is empty.
    pub fn current_index(&self) -> Option<usize> {
        self.log.borrow().cursor
    }

    /// Maximum number of snapshots kept.
    pub fn capacity(&self) -> usize {
        self.config.max_entries
    }

    pub fn state(&self) -> HistoryState {
        self.state.get()
    }

    pub fn is_restoring(&self) -> bool {
        self.state.get() == HistoryState::Restoring
    }

    /// The snapshot under the cursor.
    pub fn current(&self) -> Option<Snapshot> {
        let log = self.log.borrow();
        log.cursor.and_then(|cursor| log.entries.get(cursor).cloned())
    }

    /// All snapshots, oldest first.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.log.borrow().entries.iter().cloned().collect()
    }

    fn restore<F>(&self, direction: Direction, apply: F) -> RestoreOutcome
    where
        F: FnOnce(&Snapshot) -> Result<()>,
    {
        let Some((guard, snapshot)) = self.begin_restore(direction) else {
            return RestoreOutcome::Unavailable;
        };
        let result = apply(&snapshot);
        drop(guard);
        self.finish_restore(direction, result)
    }

    async fn restore_async<F, Fut>(&self, direction: Direction, apply: F) -> RestoreOutcome
    where
        F: FnOnce(Snapshot) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let Some((guard, snapshot)) = self.begin_restore(direction) else {
            return RestoreOutcome::Unavailable;
        };
        let result = apply(snapshot).await;
        drop(guard);
        self.finish_restore(direction, result)
    }

    /// Moves the cursor and sets the guard. Returns the snapshot to apply.
    fn begin_restore(&self, direction: Direction) -> Option<(RestoreGuard<'_>, Snapshot)> {
        if self.state.get() == HistoryState::Restoring {
            tracing::debug!("Rejecting {direction}: restore already in progress");
            return None;
        }

        let mut log = self.log.borrow_mut();
        let cursor = log.cursor?;
        let target = match direction {
            Direction::Undo => cursor.checked_sub(1)?,
            Direction::Redo => Some(cursor + 1).filter(|&next| next < log.entries.len())?,
        };
        let snapshot = log.entries.get(target)?.clone();
        log.cursor = Some(target);
        drop(log);

        self.state.set(HistoryState::Restoring);
        Some((RestoreGuard { manager: self }, snapshot))
    }

    fn finish_restore(&self, direction: Direction, result: Result<()>) -> RestoreOutcome {
        match result {
            Ok(()) => {
                tracing::debug!(
                    "Applied {direction} to snapshot {:?}",
                    self.current_index()
                );
                RestoreOutcome::Applied
            }
            Err(e) => {
                tracing::warn!("Failed to apply snapshot on {direction}: {e:#}");
                RestoreOutcome::ApplyFailed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn snap(tag: &str) -> Result<Snapshot> {
        Ok(Snapshot::new(tag.as_bytes().to_vec()))
    }

    fn tag(snapshot: &Snapshot) -> String {
        String::from_utf8(snapshot.payload().to_vec()).expect("utf8 payload")
    }

    fn tags(mgr: &HistoryManager) -> Vec<String> {
        mgr.snapshots().iter().map(tag).collect()
    }

    /// Applies into `slot` so tests can see what was restored.
    fn apply_into(slot: &RefCell<String>) -> impl FnOnce(&Snapshot) -> Result<()> + '_ {
        move |snapshot| {
            *slot.borrow_mut() = tag(snapshot);
            Ok(())
        }
    }

    fn seeded(tags: &[&str]) -> HistoryManager {
        let mgr = HistoryManager::default();
        let (first, rest) = tags.split_first().expect("at least one tag");
        assert!(mgr.initialize(|| snap(first)));
        for t in rest {
            assert!(mgr.record_snapshot(|| snap(t)));
        }
        mgr
    }

    // --- Empty / initialize ---

    #[test]
    fn test_new_manager_is_empty() {
        let mgr = HistoryManager::default();
        assert_eq!(mgr.state(), HistoryState::Empty);
        assert_eq!(mgr.history_size(), 0);
        assert_eq!(mgr.current_index(), None);
        assert_eq!(mgr.capacity(), 50);
        assert!(!mgr.can_undo());
        assert!(!mgr.can_redo());
        assert!(mgr.current().is_none());
    }

    #[test]
    fn test_undo_redo_on_empty_unavailable() {
        let mgr = HistoryManager::default();
        assert!(!mgr.undo(|_| Ok(())).moved());
        assert!(!mgr.redo(|_| Ok(())).moved());
        assert_eq!(mgr.state(), HistoryState::Empty);
    }

    #[test]
    fn test_initialize_seeds_single_entry() {
        let mgr = HistoryManager::default();
        assert!(mgr.initialize(|| snap("S0")));
        assert_eq!(mgr.state(), HistoryState::Ready);
        assert_eq!(mgr.history_size(), 1);
        assert_eq!(mgr.current_index(), Some(0));
        assert!(!mgr.can_undo());
        assert!(!mgr.can_redo());
    }

    #[test]
    fn test_initialize_discards_prior_history() {
        let mgr = seeded(&["S0", "S1", "S2"]);
        assert!(mgr.initialize(|| snap("fresh")));
        assert_eq!(tags(&mgr), vec!["fresh"]);
        assert_eq!(mgr.current_index(), Some(0));
    }

    #[test]
    fn test_first_record_without_initialize() {
        let mgr = HistoryManager::default();
        assert!(mgr.record_snapshot(|| snap("S0")));
        assert_eq!(mgr.state(), HistoryState::Ready);
        assert_eq!(mgr.current_index(), Some(0));
    }

    // --- Recording ---

    #[test]
    fn test_record_grows_by_one() {
        let mgr = seeded(&["S0"]);
        for i in 1..10 {
            assert!(mgr.record_snapshot(|| snap(&format!("S{i}"))));
            assert_eq!(mgr.history_size(), i + 1);
            assert_eq!(mgr.current_index(), Some(i));
        }
    }

    #[test]
    fn test_fifo_eviction_at_capacity() {
        let mgr = HistoryManager::with_capacity(3);
        mgr.initialize(|| snap("S0"));
        for i in 1..6 {
            mgr.record_snapshot(|| snap(&format!("S{i}")));
            assert!(mgr.history_size() <= 3);
        }
        assert_eq!(tags(&mgr), vec!["S3", "S4", "S5"]);
        assert_eq!(mgr.current_index(), Some(2));
    }

    #[test]
    fn test_capacity_two_evicts_seed() {
        let mgr = HistoryManager::with_capacity(2);
        mgr.initialize(|| snap("S0"));
        mgr.record_snapshot(|| snap("S1"));
        mgr.record_snapshot(|| snap("S2"));
        assert_eq!(mgr.history_size(), 2);
        assert_eq!(tags(&mgr), vec!["S1", "S2"]);
        assert_eq!(mgr.current_index(), Some(1));
    }

    #[test]
    fn test_capacity_one_keeps_latest_only() {
        let mgr = HistoryManager::with_capacity(0);
        assert_eq!(mgr.capacity(), 1);
        mgr.initialize(|| snap("S0"));
        mgr.record_snapshot(|| snap("S1"));
        assert_eq!(tags(&mgr), vec!["S1"]);
        assert_eq!(mgr.current_index(), Some(0));
        assert!(!mgr.can_undo());
    }

    #[test]
    fn test_capture_failure_records_nothing() {
        let mgr = seeded(&["S0"]);
        assert!(!mgr.record_snapshot(|| Err(anyhow::anyhow!("canvas detached"))));
        assert_eq!(mgr.history_size(), 1);

        assert!(!mgr.initialize(|| Err(anyhow::anyhow!("canvas detached"))));
        assert_eq!(tags(&mgr), vec!["S0"]);
    }

    // --- Undo / redo ---

    #[test]
    fn test_undo_walks_back_to_seed() {
        let mgr = seeded(&["S0", "S1", "S2"]);
        let restored = RefCell::new(String::new());

        assert!(mgr.undo(apply_into(&restored)).is_applied());
        assert_eq!(*restored.borrow(), "S1");
        assert_eq!(mgr.current_index(), Some(1));

        assert!(mgr.undo(apply_into(&restored)).is_applied());
        assert_eq!(*restored.borrow(), "S0");
        assert_eq!(mgr.current_index(), Some(0));

        assert!(!mgr.undo(apply_into(&restored)).moved());
        assert_eq!(mgr.current_index(), Some(0));
    }

    #[test]
    fn test_redo_then_new_edit_truncates_branch() {
        let mgr = seeded(&["S0", "S1", "S2"]);
        let restored = RefCell::new(String::new());
        mgr.undo(apply_into(&restored));
        mgr.undo(apply_into(&restored));

        assert!(mgr.redo(apply_into(&restored)).is_applied());
        assert_eq!(*restored.borrow(), "S1");

        mgr.record_snapshot(|| snap("S3"));
        assert_eq!(tags(&mgr), vec!["S0", "S1", "S3"]);
        assert!(!mgr.can_redo());
        assert!(!mgr.redo(apply_into(&restored)).moved());
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mgr = seeded(&["S0", "S1", "S2", "S3"]);
        let before = mgr.current().map(|s| tag(&s));
        let restored = RefCell::new(String::new());

        mgr.undo(apply_into(&restored));
        mgr.redo(apply_into(&restored));

        assert_eq!(Some(restored.borrow().clone()), before);
        assert_eq!(mgr.current().map(|s| tag(&s)), before);
    }

    #[test]
    fn test_redo_at_end_unavailable() {
        let mgr = seeded(&["S0", "S1"]);
        let outcome = mgr.redo(|_| panic!("apply must not run"));
        assert!(!outcome.moved());
        assert_eq!(mgr.current_index(), Some(1));
        assert_eq!(mgr.history_size(), 2);
    }

    #[test]
    fn test_undo_at_seed_unavailable() {
        let mgr = seeded(&["S0"]);
        let outcome = mgr.undo(|_| panic!("apply must not run"));
        assert!(!outcome.moved());
        assert_eq!(mgr.current_index(), Some(0));
    }

    // --- Guard ---

    #[test]
    fn test_record_during_restore_is_ignored() {
        let mgr = seeded(&["S0", "S1", "S2"]);
        let outcome = mgr.undo(|_| {
            assert!(mgr.is_restoring());
            // The canvas fires its change notification while loading.
            assert!(!mgr.record_snapshot(|| snap("echo")));
            Ok(())
        });
        assert!(outcome.is_applied());
        assert_eq!(tags(&mgr), vec!["S0", "S1", "S2"]);
        assert_eq!(mgr.current_index(), Some(1));
        assert!(mgr.can_redo());
        assert_eq!(mgr.state(), HistoryState::Ready);
    }

    #[test]
    fn test_capture_not_called_during_restore() {
        let mgr = seeded(&["S0", "S1"]);
        mgr.undo(|_| {
            mgr.record_snapshot(|| panic!("capture must not run"));
            Ok(())
        });
    }

    #[test]
    fn test_nested_undo_rejected() {
        let mgr = seeded(&["S0", "S1", "S2"]);
        mgr.undo(|_| {
            assert!(!mgr.undo(|_| Ok(())).moved());
            assert!(!mgr.redo(|_| Ok(())).moved());
            Ok(())
        });
        assert_eq!(mgr.current_index(), Some(1));
    }

    #[test]
    fn test_apply_failure_keeps_cursor_and_releases_guard() {
        let mgr = seeded(&["S0", "S1"]);
        let outcome = mgr.undo(|_| Err(anyhow::anyhow!("incompatible scene graph")));
        assert!(outcome.moved());
        assert!(!outcome.is_applied());
        match outcome {
            RestoreOutcome::ApplyFailed(e) => {
                assert!(e.to_string().contains("incompatible"));
            }
            other => panic!("expected ApplyFailed, got {other:?}"),
        }
        assert_eq!(mgr.current_index(), Some(0));
        assert!(!mgr.is_restoring());
        assert!(mgr.record_snapshot(|| snap("S2")));
    }

    #[test]
    fn test_panic_in_apply_releases_guard() {
        let mgr = seeded(&["S0", "S1"]);
        let result = catch_unwind(AssertUnwindSafe(|| {
            mgr.undo(|_| panic!("renderer crashed"));
        }));
        assert!(result.is_err());
        assert_eq!(mgr.state(), HistoryState::Ready);
        assert!(mgr.record_snapshot(|| snap("S2")));
    }

    #[test]
    fn test_queries_during_restore() {
        let mgr = seeded(&["S0", "S1", "S2"]);
        mgr.undo(|snapshot| {
            assert_eq!(mgr.current_index(), Some(1));
            assert_eq!(mgr.current().as_ref(), Some(snapshot));
            assert!(mgr.can_undo());
            assert!(mgr.can_redo());
            Ok(())
        });
    }

    // --- Clear ---

    #[test]
    fn test_clear_resets_to_empty() {
        let mgr = seeded(&["S0", "S1"]);
        mgr.clear();
        assert_eq!(mgr.state(), HistoryState::Empty);
        assert_eq!(mgr.history_size(), 0);
        assert_eq!(mgr.current_index(), None);
        assert!(!mgr.can_undo());
        assert!(!mgr.undo(|_| Ok(())).moved());
    }

    #[test]
    fn test_clear_during_restore_leaves_empty() {
        let mgr = seeded(&["S0", "S1"]);
        mgr.undo(|_| {
            mgr.clear();
            Ok(())
        });
        assert_eq!(mgr.state(), HistoryState::Empty);
        assert_eq!(mgr.history_size(), 0);
    }

    // --- Async ---

    #[test]
    fn test_undo_async_holds_guard_across_apply() {
        let mgr = &seeded(&["S0", "S1", "S2"]);
        let restored = &RefCell::new(String::new());

        let outcome = pollster::block_on(mgr.undo_async(|snapshot| async move {
            assert!(mgr.is_restoring());
            assert!(!mgr.record_snapshot(|| snap("echo")));
            *restored.borrow_mut() = tag(&snapshot);
            Ok::<(), anyhow::Error>(())
        }));

        assert!(outcome.is_applied());
        assert_eq!(*restored.borrow(), "S1");
        assert_eq!(mgr.history_size(), 3);
        assert!(!mgr.is_restoring());
    }

    #[test]
    fn test_redo_async_failure() {
        let mgr = seeded(&["S0", "S1"]);
        mgr.undo(|_| Ok(()));

        let outcome = pollster::block_on(
            mgr.redo_async(|_| async { Err::<(), _>(anyhow::anyhow!("decode failed")) }),
        );
        assert!(matches!(outcome, RestoreOutcome::ApplyFailed(_)));
        assert_eq!(mgr.current_index(), Some(1));
        assert_eq!(mgr.state(), HistoryState::Ready);
    }

    #[test]
    fn test_unpolled_async_restore_changes_nothing() {
        let mgr = seeded(&["S0", "S1"]);
        let pending = mgr.undo_async(|_| async { Ok::<(), anyhow::Error>(()) });
        drop(pending);
        assert_eq!(mgr.state(), HistoryState::Ready);
        assert_eq!(mgr.current_index(), Some(1));
    }

    #[test]
    fn test_debug_format() {
        let mgr = seeded(&["S0"]);
        let dbg = format!("{mgr:?}");
        assert!(dbg.contains("HistoryManager"));
        assert!(dbg.contains("Ready"));
    }
}
