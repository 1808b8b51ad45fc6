//! Tunable editor constants.

use crate::clock::Duration;
use crate::error::{EditorError, EditorResult};
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Editor configuration.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Smallest zoom factor.
    pub min_zoom: f64,
    /// Largest zoom factor.
    pub max_zoom: f64,
    /// Increment used by zoom in/out.
    pub zoom_step: f64,
    /// Zoom factor of a fresh editor.
    pub default_zoom: f64,
    /// Maximum number of undo snapshots kept.
    pub history_capacity: usize,
    /// Quiet period before a burst of edits becomes one snapshot.
    pub debounce_ms: u64,
    /// Delay before re-measuring the selection after a drag ends.
    pub drag_settle_ms: u64,
    /// Delay before re-measuring after a layout-affecting UI change.
    pub layout_settle_ms: u64,
    /// Minimum node size in content units while resizing.
    pub min_size: f64,
    /// Content-space offset applied to duplicated nodes.
    pub duplicate_offset: f64,
    /// Arrow-key nudge distance.
    pub nudge_small: f64,
    /// Arrow-key nudge distance with Shift held.
    pub nudge_large: f64,
    /// Maximum characters in a block title.
    pub title_max_chars: usize,
    /// Logical width of a block.
    pub block_width: f64,
    /// Logical height of a block.
    pub block_height: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.3,
            max_zoom: 1.0,
            zoom_step: 0.05,
            default_zoom: 0.55,
            history_capacity: 30,
            debounce_ms: 500,
            drag_settle_ms: 50,
            layout_settle_ms: 250,
            min_size: 20.0,
            duplicate_offset: 20.0,
            nudge_small: 1.0,
            nudge_large: 10.0,
            title_max_chars: 25,
            block_width: 1080.0,
            block_height: 1350.0,
        }
    }
}

impl EditorConfig {
    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> EditorResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EditorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk.
    pub fn load(path: impl AsRef<Path>) -> EditorResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn validate(&self) -> EditorResult<()> {
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom) {
            return Err(EditorError::Config(format!(
                "invalid zoom range [{}, {}]",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.zoom_step <= 0.0 {
            return Err(EditorError::Config("zoom_step must be positive".to_string()));
        }
        if self.history_capacity == 0 {
            return Err(EditorError::Config("history_capacity must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn drag_settle(&self) -> Duration {
        Duration::from_millis(self.drag_settle_ms)
    }

    pub fn layout_settle(&self) -> Duration {
        Duration::from_millis(self.layout_settle_ms)
    }

    pub fn block_size(&self) -> Size {
        Size::new(self.block_width, self.block_height)
    }
}
