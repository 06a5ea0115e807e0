//! Image element content.

use super::SerializableColor;
use serde::{Deserialize, Serialize};

/// Optional frame drawn around an image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBorder {
    /// Border width in pixels.
    pub width: f64,
    pub color: SerializableColor,
    /// Corner radius in pixels.
    #[serde(default)]
    pub radius: f64,
}

fn default_opacity() -> f64 {
    1.0
}

/// An image placed on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContent {
    /// Resource reference (path, URL or `data:` URI).
    pub src: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Keep `width / height` fixed while resizing.
    #[serde(default, alias = "maintainAspectRatio")]
    pub aspect_ratio_locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<ImageBorder>,
}

impl ImageContent {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: String::new(),
            opacity: 1.0,
            aspect_ratio_locked: false,
            border: None,
        }
    }

    /// Corner radius used when clipping the picture, zero without a border.
    pub fn corner_radius(&self) -> f64 {
        self.border.map(|b| b.radius.max(0.0)).unwrap_or(0.0)
    }
}

/// Scale natural image dimensions to fit within a box while preserving aspect ratio.
///
/// Images already smaller than the box keep their natural size.
pub fn fit_within(natural_width: f64, natural_height: f64, max_width: f64, max_height: f64) -> (f64, f64) {
    if natural_width <= 0.0 || natural_height <= 0.0 {
        return (max_width, max_height);
    }
    if natural_width <= max_width && natural_height <= max_height {
        return (natural_width, natural_height);
    }

    let aspect = natural_width / natural_height;
    let target_aspect = max_width / max_height;
    if aspect > target_aspect {
        (max_width, max_width / aspect)
    } else {
        (max_height * aspect, max_height)
    }
}
