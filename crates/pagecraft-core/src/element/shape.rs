//! Vector shape content.

use super::SerializableColor;
use serde::{Deserialize, Serialize};

/// Geometry drawn inside the element box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Rectangle,
    /// Fully rounded box (ellipse inscribed in the element box).
    Circle,
    /// Thin horizontal bar through the middle of the box.
    Line,
    /// Triangle with its apex at the top center of the box.
    Polygon,
}

fn default_fill() -> SerializableColor {
    SerializableColor::new(59, 130, 246, 255)
}

fn default_stroke() -> SerializableColor {
    SerializableColor::black()
}

fn default_opacity() -> f64 {
    1.0
}

/// A filled and stroked vector shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeContent {
    #[serde(default)]
    pub shape_kind: ShapeKind,
    #[serde(default = "default_fill")]
    pub fill: SerializableColor,
    #[serde(default = "default_stroke")]
    pub stroke: SerializableColor,
    #[serde(default)]
    pub stroke_width: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

impl ShapeContent {
    pub fn new(shape_kind: ShapeKind) -> Self {
        Self {
            shape_kind,
            fill: default_fill(),
            stroke: default_stroke(),
            stroke_width: if shape_kind == ShapeKind::Line { 2.0 } else { 0.0 },
            opacity: 1.0,
        }
    }

    /// Thickness of the bar drawn for [`ShapeKind::Line`].
    pub fn line_thickness(&self) -> f64 {
        self.stroke_width.max(1.0)
    }
}
