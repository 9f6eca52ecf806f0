use serde::{Deserialize, Serialize};

/// Third-party emote provider endpoints, queried only when the archive has no
/// emote set for a VOD.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct EmotesConfig {
    pub twitch_id: String,
    pub bttv_api: String,
    pub ffz_api: String,
    pub seventv_api: String,
    pub twitch_cdn: String,
    pub bttv_cdn: String,
    pub ffz_cdn: String,
    pub seventv_cdn: String,
    pub twemoji_base: String,
}

impl Default for EmotesConfig {
    fn default() -> Self {
        Self {
            twitch_id: String::new(),
            bttv_api: "https://api.betterttv.net/3".to_string(),
            ffz_api: "https://api.frankerfacez.com/v1".to_string(),
            seventv_api: "https://7tv.io/v3".to_string(),
            twitch_cdn: "https://static-cdn.jtvnw.net".to_string(),
            bttv_cdn: "https://emotes.overpowered.tv/bttv".to_string(),
            ffz_cdn: "https://cdn.frankerfacez.com/emote".to_string(),
            seventv_cdn: "https://cdn.7tv.app/emote".to_string(),
            twemoji_base: "https://cdn.jsdelivr.net/gh/twitter/twemoji@14.0.2/assets/72x72"
                .to_string(),
        }
    }
}
