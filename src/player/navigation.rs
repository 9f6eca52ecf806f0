//! Turns navigation intents (query string, chapter click, part select,
//! end of a part) into playback cursors.

use crate::{
    api::models::Chapter,
    common::duration::{parse_timestamp, to_hms},
    player::timeline::{PlaybackCursor, Timeline},
};

/// The `t` and `part` query parameters of a VOD page.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NavigationQuery {
    pub t: Option<f64>,
    pub part: Option<u32>,
}

impl NavigationQuery {
    /// Parses `?t=1h2m3s&part=2`. Unknown keys are ignored, malformed values
    /// read as absent (`part`) or zero (`t`).
    pub fn parse(query: &str) -> Self {
        let mut out = Self::default();
        for pair in query.trim_start_matches('?').split('&') {
            let mut kv = pair.splitn(2, '=');
            let key = kv.next().unwrap_or_default();
            let value = urlencoding::decode(kv.next().unwrap_or_default())
                .map(|v| v.into_owned())
                .unwrap_or_default();
            match key {
                "t" => out.t = Some(parse_timestamp(&value)),
                "part" => out.part = value.trim().parse::<u32>().ok().filter(|p| *p >= 1),
                _ => {}
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_none() && self.part.is_none()
    }
}

/// Cursor a page opens at. A positive `t` is located on the timeline and
/// overrides `part`; a page opened with no query resumes where the viewer
/// left off.
pub fn initial_cursor(
    timeline: &Timeline,
    query: &NavigationQuery,
    resume_at: Option<f64>,
) -> PlaybackCursor {
    let requested_part = query.part.unwrap_or(1);

    if let Timeline::Games(_) = timeline {
        return PlaybackCursor::start_of(requested_part);
    }

    let timestamp = match (query.t, resume_at) {
        (Some(t), _) => t,
        (None, Some(resume)) if query.is_empty() => resume,
        _ => 0.0,
    };

    if timestamp > 0.0 {
        timeline.locate(timestamp)
    } else {
        PlaybackCursor::start_of(requested_part)
    }
}

/// Cursor for a chapter's start.
pub fn locate_chapter(timeline: &Timeline, chapter: &Chapter) -> PlaybackCursor {
    timeline.locate(chapter.start_seconds())
}

/// Chapter covering `t`; the first match in list order wins.
pub fn current_chapter(chapters: &[Chapter], t: f64) -> Option<&Chapter> {
    chapters.iter().find(|c| c.contains(t))
}

/// Explicit part selection; `None` when the part does not exist.
pub fn select_part(timeline: &Timeline, part: u32) -> Option<PlaybackCursor> {
    timeline
        .index_of(part)
        .map(|_| PlaybackCursor::start_of(part))
}

/// Where playback continues once `part` finished, `None` at the very end.
pub fn advance_after(timeline: &Timeline, part: u32) -> Option<PlaybackCursor> {
    timeline.next_part(part).map(PlaybackCursor::start_of)
}

/// Query string that reopens the VOD at `stream_time`.
pub fn share_query(stream_time: f64) -> String {
    format!("?t={}", to_hms(stream_time))
}
