use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ArchiveConfig {
    /// Base URL of the archive REST API (`/vods`, `/comments`, `/badges`, `/emotes`).
    #[serde(default)]
    pub api_base: String,
    /// Seconds assumed for a youtube segment whose duration is not yet known.
    #[serde(default)]
    pub default_segment_duration: f64,
    #[serde(default = "default_vods_page_size")]
    pub vods_page_size: u32,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            default_segment_duration: 0.0,
            vods_page_size: default_vods_page_size(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_vods_page_size() -> u32 {
    50
}

fn default_request_timeout_ms() -> u64 {
    10_000
}
