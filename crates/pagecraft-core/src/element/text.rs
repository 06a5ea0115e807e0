//! Text element content.

use super::SerializableColor;
use serde::{Deserialize, Serialize};

/// Font weight options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    #[serde(alias = "400")]
    Normal,
    #[serde(alias = "700", alias = "bolder")]
    Bold,
}

/// Font style options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    #[serde(alias = "oblique")]
    Italic,
}

/// Horizontal alignment of each line within the text box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Outline drawn around glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStroke {
    pub enabled: bool,
    pub width: f64,
    pub color: SerializableColor,
}

fn default_font_size() -> f64 {
    16.0
}

fn default_font_family() -> String {
    "Arial".to_string()
}

fn default_line_height() -> f64 {
    1.2
}

fn default_color() -> SerializableColor {
    SerializableColor::black()
}

/// A block of text flowed inside its element box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    pub content: String,
    /// Font size in pixels.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default)]
    pub font_weight: FontWeight,
    #[serde(default)]
    pub font_style: FontStyle,
    #[serde(default = "default_color")]
    pub color: SerializableColor,
    #[serde(default)]
    pub text_align: TextAlign,
    /// Line height as a multiple of the font size.
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<TextStroke>,
}

impl TextContent {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            font_size: default_font_size(),
            font_family: default_font_family(),
            font_weight: FontWeight::default(),
            font_style: FontStyle::default(),
            color: default_color(),
            text_align: TextAlign::default(),
            line_height: default_line_height(),
            stroke: None,
        }
    }

    /// The outline to draw, if enabled and visible.
    pub fn active_stroke(&self) -> Option<TextStroke> {
        self.stroke.filter(|s| s.enabled && s.width > 0.0)
    }

    /// Distance between consecutive baselines, in pixels.
    pub fn line_advance(&self) -> f64 {
        self.font_size * self.line_height
    }
}
