//! Element definitions for album pages.

mod image;
mod shape;
mod text;

pub use image::{ImageBorder, ImageContent, fit_within};
pub use shape::{ShapeContent, ShapeKind};
pub use text::{FontStyle, FontWeight, TextAlign, TextContent, TextStroke};

use chrono::{DateTime, Utc};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serializable color representation (RGBA8).
///
/// Stored in payloads as a CSS-style string (`#rrggbb`, `#rrggbbaa`,
/// `rgb(..)`, `rgba(..)` or `transparent`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Whether the color paints nothing.
    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Multiply the alpha channel by `opacity` (clamped to [0, 1]).
    pub fn with_opacity(self, opacity: f64) -> Self {
        let alpha = (self.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a: alpha, ..self }
    }

    /// Parse a CSS color string.
    pub fn parse(color: &str) -> Option<Self> {
        let color = color.trim();
        if color.eq_ignore_ascii_case("transparent") {
            return Some(Self::transparent());
        }

        if let Some(hex) = color.strip_prefix('#') {
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            let channel = |s: &str| u8::from_str_radix(s, 16).ok();
            return match hex.len() {
                3 => Some(Self::new(
                    channel(&hex[0..1])? * 17,
                    channel(&hex[1..2])? * 17,
                    channel(&hex[2..3])? * 17,
                    255,
                )),
                6 => Some(Self::new(
                    channel(&hex[0..2])?,
                    channel(&hex[2..4])?,
                    channel(&hex[4..6])?,
                    255,
                )),
                8 => Some(Self::new(
                    channel(&hex[0..2])?,
                    channel(&hex[2..4])?,
                    channel(&hex[4..6])?,
                    channel(&hex[6..8])?,
                )),
                _ => None,
            };
        }

        let lower = color.to_ascii_lowercase();
        let inner = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))?
            .strip_suffix(')')?;
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }
        let r = parts[0].parse::<u8>().ok()?;
        let g = parts[1].parse::<u8>().ok()?;
        let b = parts[2].parse::<u8>().ok()?;
        let a = match parts.get(3) {
            Some(a) => (a.parse::<f64>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
            None => 255,
        };
        Some(Self::new(r, g, b, a))
    }
}

impl TryFrom<String> for SerializableColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid color: {value}"))
    }
}

impl From<SerializableColor> for String {
    fn from(color: SerializableColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for SerializableColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Unique identifier for elements.
///
/// Freshly generated ids are time-ordered UUIDs; ids coming from external
/// payloads are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Generate a new unique id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ElementId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Placement of an element in document space.
///
/// `(x, y)` is the top-left corner of the unrotated box; rotation and scale
/// are applied about the box center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees, clockwise.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_scale")]
    pub scale_x: f64,
    #[serde(default = "default_scale")]
    pub scale_y: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl Transform {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Unrotated box in document space.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    /// Map from the element's local box space (`0..width`, `0..height`) to
    /// document space.
    pub fn local_to_document(&self) -> Affine {
        let half = Vec2::new(self.width / 2.0, self.height / 2.0);
        Affine::translate(self.center().to_vec2())
            * Affine::rotate(self.rotation.to_radians())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
            * Affine::translate(-half)
    }

    /// Axis-aligned bounds of the rotated, scaled box.
    pub fn bounds(&self) -> Rect {
        let affine = self.local_to_document();
        let corners = [
            Point::new(0.0, 0.0),
            Point::new(self.width, 0.0),
            Point::new(self.width, self.height),
            Point::new(0.0, self.height),
        ];
        let mut rect = Rect::from_points(affine * corners[0], affine * corners[1]);
        for corner in &corners[2..] {
            rect = rect.union_pt(affine * *corner);
        }
        rect
    }

    /// Whether a document-space point lies within the transformed box.
    pub fn contains(&self, point: Point, tolerance: f64) -> bool {
        let det = self.scale_x * self.scale_y;
        if det.abs() < f64::EPSILON {
            return false;
        }
        let local = self.local_to_document().inverse() * point;
        local.x >= -tolerance
            && local.y >= -tolerance
            && local.x <= self.width + tolerance
            && local.y <= self.height + tolerance
    }
}

/// Discriminant of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Image,
    Text,
    Shape,
}

/// Kind-specific element data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementContent {
    Image(ImageContent),
    Text(TextContent),
    Shape(ShapeContent),
}

impl ElementContent {
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementContent::Image(_) => ElementKind::Image,
            ElementContent::Text(_) => ElementKind::Text,
            ElementContent::Shape(_) => ElementKind::Shape,
        }
    }
}

fn default_visible() -> bool {
    true
}

/// A positioned element on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(default = "ElementId::generate")]
    pub id: ElementId,
    pub transform: Transform,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub z_index: i64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub content: ElementContent,
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        self.content.kind()
    }

    pub fn as_text(&self) -> Option<&TextContent> {
        match &self.content {
            ElementContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextContent> {
        match &mut self.content {
            ElementContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageContent> {
        match &self.content {
            ElementContent::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_image_mut(&mut self) -> Option<&mut ImageContent> {
        match &mut self.content {
            ElementContent::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Aspect ratio to preserve on resize, if this is a locked image.
    pub fn locked_aspect_ratio(&self) -> Option<f64> {
        match &self.content {
            ElementContent::Image(image) if image.aspect_ratio_locked => {
                let t = &self.transform;
                (t.height > 0.0).then(|| t.width / t.height)
            }
            _ => None,
        }
    }

    /// Check if a document-space point hits this element.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.visible && self.transform.contains(point, tolerance)
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Everything needed to create a new element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSpec {
    pub transform: Transform,
    pub content: ElementContent,
    pub visible: bool,
    pub locked: bool,
}

impl ElementSpec {
    pub fn new(transform: Transform, content: ElementContent) -> Self {
        Self {
            transform,
            content,
            visible: true,
            locked: false,
        }
    }

    pub fn text(x: f64, y: f64, width: f64, height: f64, content: impl Into<String>) -> Self {
        Self::new(
            Transform::new(x, y, width, height),
            ElementContent::Text(TextContent::new(content)),
        )
    }

    pub fn shape(x: f64, y: f64, width: f64, height: f64, kind: ShapeKind) -> Self {
        Self::new(
            Transform::new(x, y, width, height),
            ElementContent::Shape(ShapeContent::new(kind)),
        )
    }

    pub fn image(x: f64, y: f64, width: f64, height: f64, src: impl Into<String>) -> Self {
        Self::new(
            Transform::new(x, y, width, height),
            ElementContent::Image(ImageContent::new(src)),
        )
    }

    /// Materialize the spec into an element with a fresh id and timestamps.
    pub fn into_element(self, z_index: i64) -> Element {
        let now = Utc::now();
        Element {
            id: ElementId::generate(),
            transform: self.transform,
            visible: self.visible,
            locked: self.locked,
            z_index,
            created_at: now,
            updated_at: now,
            content: self.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parse_variants() {
        assert_eq!(SerializableColor::parse("#fff"), Some(SerializableColor::white()));
        assert_eq!(
            SerializableColor::parse("#ff000080"),
            Some(SerializableColor::new(255, 0, 0, 128))
        );
        assert_eq!(
            SerializableColor::parse("rgba(10, 20, 30, 0.5)"),
            Some(SerializableColor::new(10, 20, 30, 128))
        );
        assert_eq!(
            SerializableColor::parse("transparent"),
            Some(SerializableColor::transparent())
        );
        assert_eq!(SerializableColor::parse("#12"), None);
        assert_eq!(SerializableColor::parse("blue-ish"), None);
    }

    #[test]
    fn test_color_parse_rejects_non_ascii_hex() {
        assert_eq!(SerializableColor::parse("#é1"), None);
        assert_eq!(SerializableColor::parse("#ffé0"), None);
        assert_eq!(SerializableColor::parse("#+12"), None);
        let result: Result<SerializableColor, _> = serde_json::from_str(r##""#é1""##);
        assert!(result.is_err());
    }

    #[test]
    fn test_color_display() {
        assert_eq!(SerializableColor::new(255, 0, 16, 255).to_string(), "#ff0010");
        assert_eq!(SerializableColor::new(0, 0, 0, 0).to_string(), "#00000000");
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = ElementId::generate();
        let b = ElementId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_transform_contains_rotated() {
        let mut t = Transform::new(0.0, 0.0, 100.0, 20.0);
        assert!(t.contains(Point::new(90.0, 10.0), 0.0));

        // Rotated 90° about the center (50, 10): the box now spans y in [-40, 60].
        t.rotation = 90.0;
        assert!(!t.contains(Point::new(90.0, 10.0), 0.0));
        assert!(t.contains(Point::new(50.0, 55.0), 0.0));
    }

    #[test]
    fn test_transform_bounds_with_scale() {
        let mut t = Transform::new(0.0, 0.0, 100.0, 50.0);
        t.scale_x = 2.0;
        let bounds = t.bounds();
        assert!((bounds.x0 + 50.0).abs() < 1e-9);
        assert!((bounds.x1 - 150.0).abs() < 1e-9);
        assert!((bounds.height() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_element_json_shape() {
        let json = r##"{
            "id": "el-1",
            "type": "shape",
            "transform": {"x": 1, "y": 2, "width": 30, "height": 40, "rotation": 0, "scaleX": 1, "scaleY": 1},
            "visible": true,
            "locked": false,
            "zIndex": 3,
            "shapeKind": "circle",
            "fill": "#ff0000",
            "stroke": "#000000",
            "strokeWidth": 2,
            "opacity": 0.5
        }"##;
        let element: Element = serde_json::from_str(json).unwrap();
        assert_eq!(element.id.as_str(), "el-1");
        assert_eq!(element.kind(), ElementKind::Shape);
        assert_eq!(element.z_index, 3);
        match &element.content {
            ElementContent::Shape(shape) => {
                assert_eq!(shape.shape_kind, ShapeKind::Circle);
                assert!((shape.opacity - 0.5).abs() < f64::EPSILON);
            }
            other => panic!("Expected shape content, got {other:?}"),
        }

        let back = serde_json::to_value(&element).unwrap();
        assert_eq!(back["type"], "shape");
        assert_eq!(back["zIndex"], 3);
        assert_eq!(back["transform"]["scaleX"], 1.0);
    }

    #[test]
    fn test_element_missing_id_gets_generated() {
        let json = r#"{
            "type": "text",
            "transform": {"x": 0, "y": 0, "width": 10, "height": 10},
            "content": "hi"
        }"#;
        let element: Element = serde_json::from_str(json).unwrap();
        assert!(!element.id.as_str().is_empty());
        assert!(element.visible);
        assert_eq!(element.as_text().map(|t| t.content.as_str()), Some("hi"));
    }

    #[test]
    fn test_locked_aspect_ratio() {
        let mut spec = ElementSpec::image(0.0, 0.0, 200.0, 100.0, "a.png");
        if let ElementContent::Image(image) = &mut spec.content {
            image.aspect_ratio_locked = true;
        }
        let element = spec.into_element(0);
        assert_eq!(element.locked_aspect_ratio(), Some(2.0));

        let text = ElementSpec::text(0.0, 0.0, 10.0, 10.0, "x").into_element(0);
        assert_eq!(text.locked_aspect_ratio(), None);
    }
}
