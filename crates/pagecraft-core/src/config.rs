//! Editor configuration.

use crate::history::MAX_UNDO_HISTORY;
use crate::snap::{DEFAULT_GRID_SIZE, MAX_GRID_SIZE, MIN_GRID_SIZE};
use crate::storage::{StorageError, StorageResult};
use crate::viewport::DEFAULT_DISPLAY_PADDING;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for the editing engine and its save bridge.
///
/// Every field has a default, so partial JSON files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub grid_size: f64,
    pub snap_to_grid: bool,
    pub history_limit: usize,
    pub display_padding: f64,
    pub save_debounce_ms: u64,
    pub max_save_retries: u32,
    /// First retry delay; the n-th retry waits `n` times this.
    pub retry_backoff_ms: u64,
    pub duplicate_offset: f64,
    /// Rotate-handle drags snap to 15° steps.
    pub snap_rotation: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            snap_to_grid: false,
            history_limit: MAX_UNDO_HISTORY,
            display_padding: DEFAULT_DISPLAY_PADDING,
            save_debounce_ms: 1000,
            max_save_retries: 3,
            retry_backoff_ms: 3000,
            duplicate_offset: 20.0,
            snap_rotation: false,
        }
    }
}

impl EditorConfig {
    /// Load from a JSON file, clamping out-of-range values.
    pub fn from_json_file(path: &Path) -> StorageResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Self =
            serde_json::from_str(&json).map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(config.sanitized())
    }

    pub fn sanitized(mut self) -> Self {
        if !self.grid_size.is_finite() {
            self.grid_size = DEFAULT_GRID_SIZE;
        }
        self.grid_size = self.grid_size.clamp(MIN_GRID_SIZE, MAX_GRID_SIZE);
        self.history_limit = self.history_limit.clamp(1, MAX_UNDO_HISTORY);
        if !self.display_padding.is_finite() || self.display_padding < 0.0 {
            self.display_padding = DEFAULT_DISPLAY_PADDING;
        }
        self
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}
