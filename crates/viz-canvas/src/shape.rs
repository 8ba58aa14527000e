/// Shapes placed on a canvas.
use std::fmt;

use serde::{Deserialize, Serialize};
use viz_config::HexColor;

/// Stable identifier of a shape within one canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeId(pub u64);

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Geometry of a shape, relative to its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeKind {
    Rect { width: f32, height: f32 },
    Ellipse { rx: f32, ry: f32 },
    Text { content: String, size: f32 },
}

impl ShapeKind {
    /// Short lowercase name, as used in scripts and status output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rect { .. } => "rect",
            Self::Ellipse { .. } => "ellipse",
            Self::Text { .. } => "text",
        }
    }
}

/// A shape on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub kind: ShapeKind,
    /// Top-left x, in canvas pixels.
    pub x: f32,
    /// Top-left y, in canvas pixels.
    pub y: f32,
    pub fill: HexColor,
    /// Clockwise rotation in degrees, kept in `[0, 360)`.
    pub rotation: f32,
}

impl Shape {
    /// Turns the shape clockwise by `degrees` about its position.
    pub fn rotate(&mut self, degrees: f32) {
        self.rotation = (self.rotation + degrees).rem_euclid(360.0);
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @({}, {}) {}", self.id, self.kind.name(), self.x, self.y, self.fill)?;
        if self.rotation != 0.0 {
            write!(f, " rot {}", self.rotation)?;
        }
        if let ShapeKind::Text { content, .. } = &self.kind {
            write!(f, " {content:?}")?;
        }
        Ok(())
    }
}
