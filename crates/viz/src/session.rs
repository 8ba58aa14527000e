//! Replays a parsed edit script against a canvas editing session.

use std::io::Write;

use anyhow::{Context, Result};
use viz_canvas::CanvasEditor;
use viz_config::HexColor;
use viz_history::RestoreOutcome;

use crate::script::{Command, Line};

pub struct Replay {
    editor: CanvasEditor,
    default_fill: HexColor,
}

impl Replay {
    pub fn new(editor: CanvasEditor, default_fill: HexColor) -> Self {
        Self {
            editor,
            default_fill,
        }
    }

    pub fn editor(&self) -> &CanvasEditor {
        &self.editor
    }

    /// Runs every line in order, writing command output to `out`.
    ///
    /// # Errors
    ///
    /// Stops at the first edit that fails (e.g. an unknown shape id) or on a
    /// write error.
    pub fn run<W: Write>(&mut self, lines: &[Line], out: &mut W) -> Result<()> {
        for line in lines {
            self.apply(&line.command, out)
                .with_context(|| format!("line {}", line.number))?;
        }
        Ok(())
    }

    fn apply<W: Write>(&mut self, command: &Command, out: &mut W) -> Result<()> {
        match command {
            Command::Add { kind, x, y, fill } => {
                let fill = fill.unwrap_or(self.default_fill);
                let id = self.editor.add_shape(kind.clone(), *x, *y, fill);
                writeln!(out, "added {id}")?;
            }
            Command::Move { id, dx, dy } => self.editor.move_shape(*id, *dx, *dy)?,
            Command::Rotate { id, degrees } => self.editor.rotate_shape(*id, *degrees)?,
            Command::Fill { id, color } => self.editor.set_fill(*id, *color)?,
            Command::Remove { id } => {
                self.editor.remove_shape(*id)?;
            }
            Command::Clear => {
                let removed = self.editor.clear_shapes();
                writeln!(out, "cleared {removed} shape(s)")?;
            }
            Command::Undo => {
                let outcome = self.editor.undo();
                report(out, "undo", &outcome)?;
            }
            Command::Redo => {
                let outcome = self.editor.redo();
                report(out, "redo", &outcome)?;
            }
            Command::Reset => {
                self.editor.reset_history();
                writeln!(out, "history reset")?;
            }
            Command::Status => self.write_status(out)?,
        }
        Ok(())
    }

    /// Writes a one-line history summary followed by one line per shape.
    pub fn write_status<W: Write>(&self, out: &mut W) -> Result<()> {
        let history = self.editor.history();
        let cursor = history
            .current_index()
            .map_or_else(|| "-".to_string(), |i| i.to_string());
        writeln!(
            out,
            "shapes={} history={}/{} cursor={} undo={} redo={}",
            self.editor.canvas().len(),
            history.history_size(),
            history.capacity(),
            cursor,
            self.editor.can_undo(),
            self.editor.can_redo(),
        )?;
        for shape in self.editor.canvas().shapes() {
            writeln!(out, "  {shape}")?;
        }
        Ok(())
    }
}

fn report<W: Write>(out: &mut W, action: &str, outcome: &RestoreOutcome) -> Result<()> {
    match outcome {
        RestoreOutcome::Applied => writeln!(out, "{action}: ok")?,
        RestoreOutcome::Unavailable => writeln!(out, "{action}: nothing to {action}")?,
        RestoreOutcome::ApplyFailed(e) => writeln!(out, "{action}: failed to apply: {e:#}")?,
    }
    Ok(())
}
