/// Canvas document model and the editor session that records its history.
///
/// `Canvas` is the editable scene. `CanvasEditor` owns one canvas and one
/// `HistoryManager` for the length of an editing session, recording a
/// snapshot after every committed edit and restoring snapshots on undo/redo.
pub mod canvas;
pub mod editor;
pub mod shape;

pub use canvas::Canvas;
pub use editor::CanvasEditor;
pub use shape::{Shape, ShapeId, ShapeKind};
