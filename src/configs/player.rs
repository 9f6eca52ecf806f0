use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlayerConfig {
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// How often a local file's duration is re-read until it becomes known.
    #[serde(default = "default_duration_poll_ms")]
    pub duration_poll_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
            duration_poll_ms: default_duration_poll_ms(),
        }
    }
}

fn default_sample_interval_ms() -> u64 {
    1000
}

fn default_duration_poll_ms() -> u64 {
    100
}
