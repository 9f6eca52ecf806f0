use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Upper bound of rendered messages kept on screen.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    #[serde(default = "default_seek_debounce_ms")]
    pub seek_debounce_ms: u64,
    /// Distance from the bottom (px) still treated as "at the bottom".
    #[serde(default = "default_scroll_threshold_px")]
    pub scroll_threshold_px: f64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_messages: default_max_messages(),
            seek_debounce_ms: default_seek_debounce_ms(),
            scroll_threshold_px: default_scroll_threshold_px(),
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_max_messages() -> usize {
    200
}

fn default_seek_debounce_ms() -> u64 {
    300
}

fn default_scroll_threshold_px() -> f64 {
    350.0
}
