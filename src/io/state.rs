use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// TUI state kept between sessions in `twig/.state.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UiState {
    /// Id of the row under the cursor
    #[serde(default)]
    pub cursor_id: Option<String>,
    /// Fallback cursor position when `cursor_id` is gone
    #[serde(default)]
    pub cursor: usize,
    #[serde(default)]
    pub scroll_offset: usize,
    /// Last search pattern
    #[serde(default)]
    pub last_search: Option<String>,
}

pub fn read_ui_state(twig_dir: &Path) -> Option<UiState> {
    let content = fs::read_to_string(twig_dir.join(".state.json")).ok()?;
    serde_json::from_str(&content).ok()
}

pub fn write_ui_state(twig_dir: &Path, state: &UiState) -> Result<(), std::io::Error> {
    let content = serde_json::to_string_pretty(state)?;
    fs::write(twig_dir.join(".state.json"), content)
}
