/// The editable canvas scene.
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use viz_config::{HexColor, VizConfig};
use viz_history::SnapshotDocument;

use crate::shape::{Shape, ShapeId, ShapeKind};

/// A fixed-size canvas holding shapes in paint order (first painted first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    width: u32,
    height: u32,
    background: HexColor,
    shapes: Vec<Shape>,
    /// Next id handed out by `add_shape`. Never reused within a canvas.
    next_id: u64,
}

impl Canvas {
    /// Creates an empty canvas.
    pub fn new(width: u32, height: u32, background: HexColor) -> Self {
        Self {
            width,
            height,
            background,
            shapes: Vec::new(),
            next_id: 1,
        }
    }

    /// Creates an empty canvas sized and colored per `config`.
    pub fn from_config(config: &VizConfig) -> Self {
        Self::new(config.canvas_width, config.canvas_height, config.background)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn background(&self) -> HexColor {
        self.background
    }

    /// Shapes in paint order.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id == id)
    }

    /// Places a new shape on top of the others and returns its id.
    pub fn add_shape(&mut self, kind: ShapeKind, x: f32, y: f32, fill: HexColor) -> ShapeId {
        let id = ShapeId(self.next_id);
        self.next_id += 1;
        self.shapes.push(Shape {
            id,
            kind,
            x,
            y,
            fill,
            rotation: 0.0,
        });
        id
    }

    /// Removes a shape and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if no shape has this id.
    pub fn remove_shape(&mut self, id: ShapeId) -> Result<Shape> {
        let index = self.index_of(id)?;
        Ok(self.shapes.remove(index))
    }

    /// Translates a shape by `(dx, dy)`.
    ///
    /// # Errors
    ///
    /// Returns an error if no shape has this id.
    pub fn move_shape(&mut self, id: ShapeId, dx: f32, dy: f32) -> Result<()> {
        let shape = self.shape_mut(id)?;
        shape.x += dx;
        shape.y += dy;
        Ok(())
    }

    /// Rotates a shape clockwise by `degrees`.
    ///
    /// # Errors
    ///
    /// Returns an error if no shape has this id.
    pub fn rotate_shape(&mut self, id: ShapeId, degrees: f32) -> Result<()> {
        self.shape_mut(id)?.rotate(degrees);
        Ok(())
    }

    /// Changes a shape's fill.
    ///
    /// # Errors
    ///
    /// Returns an error if no shape has this id.
    pub fn set_fill(&mut self, id: ShapeId, fill: HexColor) -> Result<()> {
        self.shape_mut(id)?.fill = fill;
        Ok(())
    }

    /// Removes every shape. Returns how many were removed.
    pub fn clear_shapes(&mut self) -> usize {
        let removed = self.shapes.len();
        self.shapes.clear();
        removed
    }

    fn index_of(&self, id: ShapeId) -> Result<usize> {
        self.shapes
            .iter()
            .position(|s| s.id == id)
            .with_context(|| format!("No shape with id {id}"))
    }

    fn shape_mut(&mut self, id: ShapeId) -> Result<&mut Shape> {
        let index = self.index_of(id)?;
        Ok(&mut self.shapes[index])
    }
}

impl SnapshotDocument for Canvas {
    fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).context("Failed to serialize canvas")
    }

    /// Loads a serialized canvas of the same size.
    ///
    /// A snapshot taken from a canvas of different dimensions is rejected and
    /// the live canvas is left unchanged.
    fn deserialize(&mut self, bytes: &[u8]) -> Result<()> {
        let loaded: Canvas = bincode::deserialize(bytes).context("Failed to deserialize canvas")?;
        if (loaded.width, loaded.height) != (self.width, self.height) {
            bail!(
                "Incompatible snapshot: {}x{} canvas cannot be loaded onto {}x{}",
                loaded.width,
                loaded.height,
                self.width,
                self.height
            );
        }
        *self = loaded;
        Ok(())
    }
}
