//! Page backgrounds and their resolution.

use crate::element::SerializableColor;
use crate::storage::{BoxFuture, StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// How the area behind the elements is painted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackgroundStyle {
    Solid {
        color: SerializableColor,
    },
    /// Two-stop linear gradient. `angle` follows CSS: 0° runs bottom to top, 90° left to right.
    Gradient {
        from: SerializableColor,
        to: SerializableColor,
        #[serde(default = "default_gradient_angle")]
        angle: f64,
    },
    /// Image scaled to cover the page.
    Image {
        src: String,
    },
}

fn default_gradient_angle() -> f64 {
    180.0
}

impl Default for BackgroundStyle {
    fn default() -> Self {
        BackgroundStyle::Solid {
            color: SerializableColor::white(),
        }
    }
}

/// Whether a page's background belongs to the page or is shared by the album.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundScope {
    #[default]
    Page,
    Album,
}

/// Supplies background styles, resolved once per document load.
pub trait BackgroundResolver: Send + Sync {
    /// `owner_id` is a page id for [`BackgroundScope::Page`] and an album id for
    /// [`BackgroundScope::Album`]. `Ok(None)` means no background is set.
    fn get_background(
        &self,
        owner_id: &str,
        scope: BackgroundScope,
    ) -> BoxFuture<'_, StorageResult<Option<BackgroundStyle>>>;
}

/// Resolver backed by a fixed table.
#[derive(Default)]
pub struct StaticBackgrounds {
    entries: RwLock<HashMap<(String, BackgroundScope), BackgroundStyle>>,
}

impl StaticBackgrounds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, owner_id: &str, scope: BackgroundScope, style: BackgroundStyle) -> StorageResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        entries.insert((owner_id.to_string(), scope), style);
        Ok(())
    }
}

impl BackgroundResolver for StaticBackgrounds {
    fn get_background(
        &self,
        owner_id: &str,
        scope: BackgroundScope,
    ) -> BoxFuture<'_, StorageResult<Option<BackgroundStyle>>> {
        let key = (owner_id.to_string(), scope);
        Box::pin(async move {
            let entries = self
                .entries
                .read()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            Ok(entries.get(&key).cloned())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_json() {
        let style: BackgroundStyle =
            serde_json::from_str(r##"{"type": "gradient", "from": "#ffffff", "to": "#000000"}"##).unwrap();
        match style {
            BackgroundStyle::Gradient { angle, .. } => assert!((angle - 180.0).abs() < f64::EPSILON),
            other => panic!("Expected gradient, got {other:?}"),
        }
    }
}
