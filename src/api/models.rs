//! Wire models of the archive REST API.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    common::{
        duration::hms_to_seconds,
        types::{SegmentKind, VodId},
    },
    emotes::RawEmote,
};

/// Accepts a number, a numeric string, or null. Anything else reads as absent.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: serde_json::Value = Deserialize::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vod {
    pub id: VodId,
    #[serde(default)]
    pub title: String,
    /// Nominal total, `HH:MM:SS`.
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub youtube: Vec<Segment>,
    #[serde(default)]
    pub games: Vec<GameSegment>,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<String>,
}

impl Vod {
    pub fn duration_seconds(&self) -> f64 {
        hms_to_seconds(&self.duration) as f64
    }

    /// Youtube parts of one kind. Without an explicit kind, live uploads win
    /// whenever the VOD has any.
    pub fn segments_of(&self, kind: Option<SegmentKind>) -> Vec<Segment> {
        let kind = kind.unwrap_or_else(|| {
            if self.youtube.iter().any(|s| s.kind == Some(SegmentKind::Live)) {
                SegmentKind::Live
            } else {
                SegmentKind::Vod
            }
        });

        self.youtube
            .iter()
            .filter(|s| s.kind.unwrap_or(SegmentKind::Vod) == kind)
            .cloned()
            .collect()
    }
}

/// One youtube upload covering part of the broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub duration: Option<f64>,
    /// 1-based, may be sparse.
    #[serde(default)]
    pub part: Option<u32>,
    #[serde(default, rename = "type")]
    pub kind: Option<SegmentKind>,
}

/// An independent per-game clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSegment {
    pub video_id: String,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub start_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub game_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(default, rename = "gameId")]
    pub game_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    /// `HH:MM:SS` fallback start used by older archives.
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub start: Option<f64>,
    /// Length of the chapter in seconds, despite the name.
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub end: Option<f64>,
}

impl Chapter {
    pub fn start_seconds(&self) -> f64 {
        match self.start {
            Some(start) if start > 0.0 => start,
            _ => self
                .duration
                .as_deref()
                .map(|d| hms_to_seconds(d) as f64)
                .unwrap_or(0.0),
        }
    }

    pub fn contains(&self, t: f64) -> bool {
        let start = self.start_seconds();
        let span = self.end.unwrap_or(0.0);
        start <= t && t < start + span
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VodPage {
    #[serde(default)]
    pub data: Vec<Vod>,
    #[serde(default)]
    pub total: u64,
}

impl VodPage {
    pub fn total_pages(&self, limit: u32) -> u64 {
        if limit == 0 {
            return 0;
        }
        self.total.div_ceil(limit as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmoteRef {
    #[serde(rename = "emoteID")]
    pub emote_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmoticonRef {
    pub emoticon_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub emote: Option<EmoteRef>,
    #[serde(default)]
    pub emoticon: Option<EmoticonRef>,
}

impl Fragment {
    /// Platform emote id when the archive already resolved this fragment.
    pub fn platform_emote_id(&self) -> Option<&str> {
        self.emote
            .as_ref()
            .map(|e| e.emote_id.as_str())
            .or_else(|| self.emoticon.as_ref().map(|e| e.emoticon_id.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBadge {
    #[serde(default, rename = "_id", alias = "setID")]
    pub set_id: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireComment")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub content_offset_seconds: f64,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub user_color: Option<String>,
    #[serde(default)]
    pub message: Option<Vec<Fragment>>,
    #[serde(default)]
    pub user_badges: Option<Vec<UserBadge>>,
}

/// Archives store the comment id as `_id`, `id`, or both.
#[derive(Deserialize)]
struct WireComment {
    #[serde(default, rename = "_id")]
    mongo_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    content_offset_seconds: f64,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    user_color: Option<String>,
    #[serde(default)]
    message: Option<Vec<Fragment>>,
    #[serde(default)]
    user_badges: Option<Vec<UserBadge>>,
}

impl From<WireComment> for Comment {
    fn from(wire: WireComment) -> Self {
        Self {
            id: wire.mongo_id.or(wire.id).unwrap_or_default(),
            content_offset_seconds: wire.content_offset_seconds,
            display_name: wire.display_name,
            user_color: wire.user_color,
            message: wire.message,
            user_badges: wire.user_badges,
        }
    }
}

impl Comment {
    pub fn text(&self) -> String {
        self.message
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|f| f.text.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentPage {
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeVersion {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image_url_1x: String,
    #[serde(default)]
    pub image_url_2x: String,
    #[serde(default)]
    pub image_url_4x: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub set_id: String,
    #[serde(default)]
    pub versions: Vec<BadgeVersion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BadgeSets {
    #[serde(default)]
    pub channel: Vec<Badge>,
    #[serde(default)]
    pub global: Vec<Badge>,
}

/// Emote set the archive stored alongside a VOD.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchivedEmotes {
    #[serde(default)]
    pub ffz_emotes: Vec<RawEmote>,
    #[serde(default)]
    pub bttv_emotes: Vec<RawEmote>,
    #[serde(default, rename = "7tv_emotes")]
    pub seventv_emotes: Vec<RawEmote>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchivedEmotesResponse {
    #[serde(default)]
    pub data: Vec<ArchivedEmotes>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vod() -> Vod {
        serde_json::from_value(serde_json::json!({
            "id": "v1",
            "title": "Stream",
            "duration": "00:02:50",
            "chapters": [
                { "name": "Just Chatting", "start": 0, "end": 60 },
                { "name": "Game", "duration": "00:01:00", "end": 110 }
            ],
            "youtube": [
                { "id": "a", "duration": 60, "part": 1, "type": "vod" },
                { "id": "b", "duration": "90", "part": 2, "type": "vod" },
                { "id": "c", "duration": 170, "part": 1, "type": "live" }
            ],
            "games": [{ "video_id": "g1", "start_time": "120.5" }]
        }))
        .expect("vod should deserialize")
    }

    #[test]
    fn test_vod_lenient_fields() {
        let vod = sample_vod();
        assert_eq!(vod.duration_seconds(), 170.0);
        assert_eq!(vod.youtube[1].duration, Some(90.0));
        assert_eq!(vod.games[0].start_time, Some(120.5));
        assert_eq!(vod.chapters[1].start_seconds(), 60.0);
    }

    #[test]
    fn test_segments_prefer_live() {
        let vod = sample_vod();
        let auto = vod.segments_of(None);
        assert_eq!(auto.len(), 1);
        assert_eq!(auto[0].id, "c");

        let vods = vod.segments_of(Some(SegmentKind::Vod));
        assert_eq!(vods.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn test_comment_badge_aliases() {
        let comment: Comment = serde_json::from_value(serde_json::json!({
            "_id": "c1",
            "content_offset_seconds": 12.5,
            "display_name": "viewer",
            "message": [{ "text": "hello " }, { "text": "Kappa", "emote": { "emoteID": "25" } }],
            "user_badges": [{ "setID": "subscriber", "version": "12" }]
        }))
        .unwrap();

        assert_eq!(comment.text(), "hello Kappa");
        assert_eq!(comment.user_badges.unwrap()[0].set_id, "subscriber");
        assert_eq!(comment.message.unwrap()[1].platform_emote_id(), Some("25"));
    }

    #[test]
    fn test_comment_with_both_id_keys() {
        let page: CommentPage = serde_json::from_value(serde_json::json!({
            "comments": [
                { "_id": "c1", "id": "legacy", "content_offset_seconds": 1.0 },
                { "id": "c2", "content_offset_seconds": 2.0 },
                { "content_offset_seconds": 3.0 }
            ]
        }))
        .expect("page should deserialize");

        let ids: Vec<&str> = page.comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c1", "c2", ""]);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page = VodPage { data: vec![], total: 120 };
        assert_eq!(page.total_pages(50), 3);
    }
}
