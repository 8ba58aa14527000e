/// Editing session binding a `Canvas` to its undo/redo history.
///
/// Every committed edit fires the canvas modification hook, which records a
/// snapshot. Undo and redo load a snapshot back into the canvas; loading fires
/// the same hook, and the history's restore guard keeps it out of the log.
use anyhow::{Context, Result};
use viz_config::HexColor;
use viz_history::{HistoryConfig, HistoryManager, RestoreOutcome, Snapshot, SnapshotDocument};

use crate::canvas::Canvas;
use crate::shape::{Shape, ShapeId, ShapeKind};

/// One canvas and its history for the length of an editing session.
#[derive(Debug)]
pub struct CanvasEditor {
    canvas: Canvas,
    history: HistoryManager,
}

impl CanvasEditor {
    /// Starts a session on `canvas`, seeding history with its current state.
    pub fn new(canvas: Canvas, config: HistoryConfig) -> Self {
        let editor = Self {
            canvas,
            history: HistoryManager::new(config),
        };
        editor.seed_history();
        editor
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// History, for driving undo/redo affordances.
    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn add_shape(&mut self, kind: ShapeKind, x: f32, y: f32, fill: HexColor) -> ShapeId {
        let id = self.canvas.add_shape(kind, x, y, fill);
        tracing::debug!("Added shape {id}");
        self.object_modified();
        id
    }

    /// # Errors
    ///
    /// Returns an error if no shape has this id. Nothing is recorded.
    pub fn remove_shape(&mut self, id: ShapeId) -> Result<Shape> {
        let shape = self.canvas.remove_shape(id)?;
        tracing::debug!("Removed shape {id}");
        self.object_modified();
        Ok(shape)
    }

    /// # Errors
    ///
    /// Returns an error if no shape has this id. Nothing is recorded.
    pub fn move_shape(&mut self, id: ShapeId, dx: f32, dy: f32) -> Result<()> {
        self.canvas.move_shape(id, dx, dy)?;
        self.object_modified();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if no shape has this id. Nothing is recorded.
    pub fn rotate_shape(&mut self, id: ShapeId, degrees: f32) -> Result<()> {
        self.canvas.rotate_shape(id, degrees)?;
        self.object_modified();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if no shape has this id. Nothing is recorded.
    pub fn set_fill(&mut self, id: ShapeId, fill: HexColor) -> Result<()> {
        self.canvas.set_fill(id, fill)?;
        self.object_modified();
        Ok(())
    }

    /// Removes every shape as one undoable step. Returns how many were removed.
    ///
    /// Clearing an already empty canvas records nothing.
    pub fn clear_shapes(&mut self) -> usize {
        let removed = self.canvas.clear_shapes();
        if removed > 0 {
            self.object_modified();
        }
        removed
    }

    /// Steps the canvas back one snapshot.
    pub fn undo(&mut self) -> RestoreOutcome {
        let history = &self.history;
        let canvas = &mut self.canvas;
        history.undo(|snapshot| load_snapshot(history, canvas, snapshot))
    }

    /// Steps the canvas forward one snapshot.
    pub fn redo(&mut self) -> RestoreOutcome {
        let history = &self.history;
        let canvas = &mut self.canvas;
        history.redo(|snapshot| load_snapshot(history, canvas, snapshot))
    }

    /// Drops all history and starts over from the current canvas.
    pub fn reset_history(&mut self) {
        self.history.clear();
        self.seed_history();
    }

    /// Without a seed the first edit becomes the oldest state, so the canvas
    /// as it was before that edit cannot be restored.
    fn seed_history(&self) -> bool {
        let seeded = self.history.initialize(|| self.canvas.capture());
        if !seeded {
            tracing::warn!("Failed to seed history; the starting canvas cannot be restored");
        }
        seeded
    }

    fn object_modified(&self) -> bool {
        record_canvas(&self.history, &self.canvas)
    }
}

fn record_canvas(history: &HistoryManager, canvas: &Canvas) -> bool {
    history.record_snapshot(|| canvas.capture())
}

fn load_snapshot(history: &HistoryManager, canvas: &mut Canvas, snapshot: &Snapshot) -> Result<()> {
    canvas
        .restore(snapshot)
        .context("Failed to load canvas snapshot")?;
    // Loading fires the modification hook like any edit.
    record_canvas(history, canvas);
    Ok(())
}
