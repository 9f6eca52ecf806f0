//! Third-party emote sets and the unified word lookup built from them.

pub mod archive;
pub mod badges;
pub mod bttv;
pub mod ffz;
pub mod manager;
pub mod seventv;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    api::models::ArchivedEmotes,
    common::{errors::ReplayResult, types::VodId},
    configs::EmotesConfig,
};

pub use badges::{BadgeCache, BadgeImageSet};
pub use manager::EmoteManager;

/// 7TV marks overlay emotes with this bit.
const SEVENTV_ZERO_WIDTH: u64 = 1 << 8;

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: serde_json::Value = Deserialize::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEmoteData {
    #[serde(default)]
    pub flags: Option<u64>,
}

/// An emote as any provider (or the archive) serves it. BTTV names it
/// `code`, FFZ and 7TV `name`; FFZ ids are numeric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEmote {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub flags: Option<u64>,
    #[serde(default)]
    pub data: Option<RawEmoteData>,
}

impl RawEmote {
    pub fn word(&self) -> Option<&str> {
        self.code
            .as_deref()
            .filter(|c| !c.is_empty())
            .or(self.name.as_deref())
            .filter(|w| !w.is_empty())
    }

    fn has_flag(&self, bit: u64) -> bool {
        let own = self.flags.unwrap_or(0);
        let data = self.data.as_ref().and_then(|d| d.flags).unwrap_or(0);
        (own | data) & bit != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmoteProvider {
    Twitch,
    Ffz,
    Bttv,
    SevenTv,
}

impl EmoteProvider {
    pub fn label(self) -> &'static str {
        match self {
            Self::Twitch => "Twitch",
            Self::Ffz => "FFZ",
            Self::Bttv => "BTTV",
            Self::SevenTv => "7TV",
        }
    }
}

impl std::fmt::Display for EmoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A resolved emote.
#[derive(Debug, Clone, PartialEq)]
pub struct Emote {
    pub id: String,
    pub code: String,
    pub provider: EmoteProvider,
    /// Renders layered on top of the preceding emote.
    pub zero_width: bool,
}

impl Emote {
    fn from_raw(raw: &RawEmote, provider: EmoteProvider) -> Option<Self> {
        Some(Self {
            id: raw.id.clone(),
            code: raw.word()?.to_string(),
            provider,
            zero_width: provider == EmoteProvider::SevenTv && raw.has_flag(SEVENTV_ZERO_WIDTH),
        })
    }

    /// An emote the platform itself already resolved in the message.
    pub fn platform(id: &str, code: &str) -> Self {
        Self {
            id: id.to_string(),
            code: code.to_string(),
            provider: EmoteProvider::Twitch,
            zero_width: false,
        }
    }
}

/// Raw emotes per provider, in the order they were loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmoteSets {
    pub ffz: Vec<RawEmote>,
    pub bttv: Vec<RawEmote>,
    pub seventv: Vec<RawEmote>,
}

impl EmoteSets {
    pub fn is_empty(&self) -> bool {
        self.ffz.is_empty() && self.bttv.is_empty() && self.seventv.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ffz.len() + self.bttv.len() + self.seventv.len()
    }

    pub fn extend(&mut self, provider: EmoteProvider, emotes: Vec<RawEmote>) {
        match provider {
            EmoteProvider::Ffz => self.ffz.extend(emotes),
            EmoteProvider::Bttv => self.bttv.extend(emotes),
            EmoteProvider::SevenTv => self.seventv.extend(emotes),
            EmoteProvider::Twitch => {}
        }
    }

    /// Appends every slot of `other` after this set's entries.
    pub fn merge(&mut self, other: EmoteSets) {
        self.ffz.extend(other.ffz);
        self.bttv.extend(other.bttv);
        self.seventv.extend(other.seventv);
    }
}

impl From<ArchivedEmotes> for EmoteSets {
    fn from(archived: ArchivedEmotes) -> Self {
        Self {
            ffz: archived.ffz_emotes,
            bttv: archived.bttv_emotes,
            seventv: archived.seventv_emotes,
        }
    }
}

/// Word to emote, built in one pass: FFZ, then BTTV, then 7TV, later
/// entries replacing earlier ones with the same code. Never mutated after
/// construction; a changed set means a new lookup.
#[derive(Debug, Clone, Default)]
pub struct EmoteLookup {
    by_code: HashMap<String, Emote>,
}

impl EmoteLookup {
    pub fn build(sets: &EmoteSets) -> Self {
        let mut by_code = HashMap::with_capacity(sets.len());
        let ordered = [
            (EmoteProvider::Ffz, &sets.ffz),
            (EmoteProvider::Bttv, &sets.bttv),
            (EmoteProvider::SevenTv, &sets.seventv),
        ];

        for (provider, emotes) in ordered {
            for raw in emotes {
                if let Some(emote) = Emote::from_raw(raw, provider) {
                    by_code.insert(emote.code.clone(), emote);
                }
            }
        }

        Self { by_code }
    }

    pub fn resolve(&self, word: &str) -> Option<&Emote> {
        self.by_code.get(word)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

/// Image URL builders for every provider's CDN.
#[derive(Debug, Clone)]
pub struct EmoteCdn {
    twitch: String,
    ffz: String,
    bttv: String,
    seventv: String,
}

impl EmoteCdn {
    pub fn new(config: &EmotesConfig) -> Self {
        let trim = |s: &str| s.trim_end_matches('/').to_string();
        Self {
            twitch: trim(&config.twitch_cdn),
            ffz: trim(&config.ffz_cdn),
            bttv: trim(&config.bttv_cdn),
            seventv: trim(&config.seventv_cdn),
        }
    }

    fn twitch_url(&self, id: &str, scale: &str) -> String {
        format!("{}/emoticons/v2/{}/default/dark/{}", self.twitch, id, scale)
    }

    /// `size` is the 1/2/4 density the view asks for.
    pub fn image_url(&self, emote: &Emote, size: u8) -> String {
        let id = &emote.id;
        match emote.provider {
            EmoteProvider::Ffz => format!("{}/{}/{}", self.ffz, id, size),
            EmoteProvider::Bttv => {
                let size = if size == 4 { 2 } else { size };
                format!("{}/{}/{}x", self.bttv, id, size)
            }
            EmoteProvider::SevenTv => format!("{}/{}/{}x.webp", self.seventv, id, size),
            EmoteProvider::Twitch => self.twitch_url(id, &format!("{size}.0")),
        }
    }

    pub fn srcset(&self, emote: &Emote) -> String {
        let id = &emote.id;
        let entries: Vec<String> = match emote.provider {
            EmoteProvider::Ffz => [1, 2, 4]
                .iter()
                .map(|n| format!("{}/{}/{} {}x", self.ffz, id, n, n))
                .collect(),
            EmoteProvider::Bttv => [1, 2, 3]
                .iter()
                .map(|n| format!("{}/{}/{}x {}x", self.bttv, id, n, n))
                .collect(),
            EmoteProvider::SevenTv => [1, 2, 3, 4]
                .iter()
                .map(|n| format!("{}/{}/{}x.webp {}x", self.seventv, id, n, n))
                .collect(),
            EmoteProvider::Twitch => [("1.0", 1), ("2.0", 2), ("3.0", 4)]
                .iter()
                .map(|(scale, n)| format!("{} {}x", self.twitch_url(id, scale), n))
                .collect(),
        };
        entries.join(", ")
    }
}

/// One independently fetched provider emote set.
#[async_trait]
pub trait EmoteSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn provider(&self) -> EmoteProvider;
    async fn load_emotes(&self) -> ReplayResult<Vec<RawEmote>>;
}

/// The emote set archived together with a VOD.
#[async_trait]
pub trait ArchivedEmoteSource: Send + Sync {
    async fn archived_emotes(&self, vod_id: &VodId) -> ReplayResult<Option<EmoteSets>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, code: &str) -> RawEmote {
        RawEmote {
            id: id.to_string(),
            code: Some(code.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_later_providers_win() {
        let sets = EmoteSets {
            ffz: vec![raw("f1", "LUL"), raw("f2", "Only")],
            bttv: vec![raw("b1", "LUL")],
            seventv: vec![raw("s1", "LUL")],
        };
        let lookup = EmoteLookup::build(&sets);

        let lul = lookup.resolve("LUL").unwrap();
        assert_eq!(lul.provider, EmoteProvider::SevenTv);
        assert_eq!(lul.id, "s1");
        assert_eq!(lookup.resolve("Only").unwrap().provider, EmoteProvider::Ffz);
        assert!(lookup.resolve("lul").is_none());
    }

    #[test]
    fn test_raw_emote_shapes() {
        let ffz: RawEmote = serde_json::from_str(r#"{"id": 128054, "name": "OMEGALUL"}"#).unwrap();
        assert_eq!(ffz.id, "128054");
        assert_eq!(ffz.word(), Some("OMEGALUL"));

        let seventv: RawEmote = serde_json::from_str(
            r#"{"id": "abc", "name": "RainTime", "flags": 0, "data": {"flags": 256}}"#,
        )
        .unwrap();
        let emote = Emote::from_raw(&seventv, EmoteProvider::SevenTv).unwrap();
        assert!(emote.zero_width);

        let bttv = Emote::from_raw(&seventv, EmoteProvider::Bttv).unwrap();
        assert!(!bttv.zero_width);
    }

    #[test]
    fn test_cdn_urls() {
        let cdn = EmoteCdn::new(&EmotesConfig::default());
        let bttv = Emote {
            id: "x".into(),
            code: "c".into(),
            provider: EmoteProvider::Bttv,
            zero_width: false,
        };
        assert_eq!(cdn.image_url(&bttv, 4), "https://emotes.overpowered.tv/bttv/x/2x");

        let twitch = Emote::platform("25", "Kappa");
        assert_eq!(
            cdn.image_url(&twitch, 1),
            "https://static-cdn.jtvnw.net/emoticons/v2/25/default/dark/1.0"
        );
        assert!(cdn.srcset(&twitch).ends_with("/25/default/dark/3.0 4x"));
    }
}
