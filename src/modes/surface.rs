//! Presentation surfaces
//!
//! Each mode draws into an opaque surface. The engine never looks at what is drawn.

use parking_lot::Mutex;
use serde_json::Value;

pub trait Surface: Send + Sync {
    /// Show a view produced by `mode_id`
    fn present(&self, mode_id: &str, view: &Value);

    /// Remove whatever `mode_id` drew
    fn clear(&self, _mode_id: &str) {}
}

/// Discards every frame
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl Surface for NullSurface {
    fn present(&self, _mode_id: &str, _view: &Value) {}
}

/// Keeps every frame in memory
#[derive(Debug, Default)]
pub struct RecordingSurface {
    frames: Mutex<Vec<(String, Value)>>,
    clears: Mutex<Vec<String>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<(String, Value)> {
        self.frames.lock().clone()
    }

    pub fn last_frame(&self) -> Option<Value> {
        self.frames.lock().last().map(|(_, view)| view.clone())
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().len()
    }

    /// Modes that cleared this surface, in order
    pub fn clears(&self) -> Vec<String> {
        self.clears.lock().clone()
    }
}

impl Surface for RecordingSurface {
    fn present(&self, mode_id: &str, view: &Value) {
        self.frames.lock().push((mode_id.to_string(), view.clone()));
    }

    fn clear(&self, mode_id: &str) {
        self.clears.lock().push(mode_id.to_string());
    }
}
