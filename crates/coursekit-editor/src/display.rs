//! Per-block display state. Lives only in the editor, never in the document.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayState {
    pub collapsed: bool,
    pub fullscreen: bool,
}

/// Display state keyed by block id. At most one block is fullscreen.
#[derive(Debug, Clone, Default)]
pub struct DisplayMap {
    states: HashMap<String, DisplayState>,
}

impl DisplayMap {
    pub fn get(&self, id: &str) -> DisplayState {
        self.states.get(id).copied().unwrap_or_default()
    }

    pub fn set_collapsed(&mut self, id: &str, collapsed: bool) {
        self.states.entry(id.to_string()).or_default().collapsed = collapsed;
    }

    /// Toggle fullscreen for `id`, leaving fullscreen on any other block.
    /// Returns the new state.
    pub fn toggle_fullscreen(&mut self, id: &str) -> bool {
        let on = !self.get(id).fullscreen;
        for (other, state) in self.states.iter_mut() {
            if other != id {
                state.fullscreen = false;
            }
        }
        self.states.entry(id.to_string()).or_default().fullscreen = on;
        on
    }

    /// The fullscreen block, if any.
    pub fn fullscreen(&self) -> Option<&str> {
        self.states
            .iter()
            .find(|(_, s)| s.fullscreen)
            .map(|(id, _)| id.as_str())
    }

    pub fn remove(&mut self, id: &str) {
        self.states.remove(id);
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}
