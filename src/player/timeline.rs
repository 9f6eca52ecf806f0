//! Maps player-local time to stream-relative time and back.

use std::time::Duration;

use tracing::debug;

use crate::{
    api::models::{GameSegment, Segment},
    player::backend::PlayerBackend,
};

/// The unit of navigation: which part is loaded and where inside it to start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackCursor {
    /// 1-based.
    pub part: u32,
    /// Seconds into the part.
    pub timestamp: f64,
}

impl PlaybackCursor {
    pub fn new(part: u32, timestamp: f64) -> Self {
        Self {
            part: part.max(1),
            timestamp: timestamp.max(0.0),
        }
    }

    pub fn start_of(part: u32) -> Self {
        Self::new(part, 0.0)
    }
}

impl Default for PlaybackCursor {
    fn default() -> Self {
        Self::start_of(1)
    }
}

/// How a VOD's playback timeline is laid out over its video sources.
#[derive(Debug, Clone)]
pub enum Timeline {
    /// One continuous video (remote or a local file).
    Single,
    /// Ordered youtube parts forming one contiguous timeline.
    Parts {
        segments: Vec<Segment>,
        /// Assumed duration of a part whose duration is unknown.
        fallback: f64,
    },
    /// Independent per-game clips, each anchored at its own `start_time`.
    Games(Vec<GameSegment>),
}

impl Timeline {
    pub fn parts(segments: Vec<Segment>, fallback: f64) -> Self {
        Self::Parts {
            segments,
            fallback: fallback.max(0.0),
        }
    }

    fn effective(duration: Option<f64>, fallback: f64) -> f64 {
        duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(fallback)
    }

    fn part_number(index: usize, part: Option<u32>) -> u32 {
        part.unwrap_or(index as u32 + 1)
    }

    pub fn part_count(&self) -> usize {
        match self {
            Self::Single => 1,
            Self::Parts { segments, .. } => segments.len(),
            Self::Games(games) => games.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.part_count() == 0
    }

    /// Position in the ordered list of the given part. A segment whose `part`
    /// matches wins, else the part is read as a 1-based position.
    pub fn index_of(&self, part: u32) -> Option<usize> {
        let by_position = |len: usize| {
            let idx = part.checked_sub(1)? as usize;
            (idx < len).then_some(idx)
        };

        match self {
            Self::Single => (part == 1).then_some(0),
            Self::Parts { segments, .. } => segments
                .iter()
                .position(|s| s.part == Some(part))
                .or_else(|| by_position(segments.len())),
            Self::Games(games) => by_position(games.len()),
        }
    }

    /// Video id to load for a part.
    pub fn source_for(&self, part: u32) -> Option<&str> {
        let idx = self.index_of(part)?;
        match self {
            Self::Single => None,
            Self::Parts { segments, .. } => segments.get(idx).map(|s| s.id.as_str()),
            Self::Games(games) => games.get(idx).map(|g| g.video_id.as_str()),
        }
    }

    /// Duration of one part, if it is known or estimated.
    pub fn part_duration(&self, part: u32) -> Option<f64> {
        let idx = self.index_of(part)?;
        match self {
            Self::Single => None,
            Self::Parts { segments, fallback } => {
                Some(Self::effective(segments[idx].duration, *fallback))
            }
            Self::Games(games) => games[idx].duration,
        }
    }

    /// Part following `part`, if any.
    pub fn next_part(&self, part: u32) -> Option<u32> {
        let idx = self.index_of(part)? + 1;
        match self {
            Self::Single => None,
            Self::Parts { segments, .. } => segments
                .get(idx)
                .map(|s| Self::part_number(idx, s.part)),
            Self::Games(games) => (idx < games.len()).then_some(idx as u32 + 1),
        }
    }

    /// Sum of all (effective) part durations.
    pub fn total_duration(&self) -> f64 {
        match self {
            Self::Single => 0.0,
            Self::Parts { segments, fallback } => segments
                .iter()
                .map(|s| Self::effective(s.duration, *fallback))
                .sum(),
            Self::Games(games) => games.iter().filter_map(|g| g.duration).sum(),
        }
    }

    /// Corrective offset reconciling the nominal VOD duration with the parts
    /// actually available. Per-game clips carry their own anchors and never
    /// need one; single videos need the decoded duration, see [`local_delay`].
    pub fn delay(&self, nominal: f64) -> f64 {
        match self {
            Self::Parts { .. } => (nominal - self.total_duration()).max(0.0),
            Self::Single | Self::Games(_) => 0.0,
        }
    }

    /// Stream time at which a part begins.
    pub fn part_start(&self, part: u32) -> f64 {
        match self {
            Self::Single => 0.0,
            Self::Parts { segments, fallback } => {
                let end = self.index_of(part).unwrap_or(0);
                segments[..end]
                    .iter()
                    .map(|s| Self::effective(s.duration, *fallback))
                    .sum()
            }
            Self::Games(games) => self
                .index_of(part)
                .and_then(|idx| games[idx].start_time)
                .unwrap_or(0.0),
        }
    }

    /// Time on the parts' own timeline, before any delay is applied.
    pub fn segment_time(&self, part: u32, local_time: f64) -> f64 {
        self.part_start(part) + local_time.max(0.0)
    }

    /// `prefix(part) + local + delay + user_delay`.
    pub fn stream_time(&self, part: u32, local_time: f64, delay: f64, user_delay: f64) -> f64 {
        self.segment_time(part, local_time) + delay + user_delay
    }

    /// Inverse of [`Timeline::segment_time`]. A target past the end of every
    /// part lands at the end of the last part.
    pub fn locate(&self, timestamp: f64) -> PlaybackCursor {
        let timestamp = if timestamp.is_finite() { timestamp.max(0.0) } else { 0.0 };

        match self {
            Self::Single => PlaybackCursor::new(1, timestamp),
            Self::Parts { segments, fallback } => {
                let mut remaining = timestamp;
                for (idx, segment) in segments.iter().enumerate() {
                    let duration = Self::effective(segment.duration, *fallback);
                    if duration > remaining {
                        return PlaybackCursor::new(
                            Self::part_number(idx, segment.part),
                            remaining,
                        );
                    }
                    remaining -= duration;
                }

                match segments.last() {
                    Some(last) => {
                        debug!(
                            "navigation target {}s exceeds the available parts, clamping",
                            timestamp
                        );
                        PlaybackCursor::new(
                            Self::part_number(segments.len() - 1, last.part),
                            Self::effective(last.duration, *fallback),
                        )
                    }
                    None => PlaybackCursor::new(1, timestamp),
                }
            }
            Self::Games(games) => {
                let containing = games.iter().position(|g| {
                    let start = g.start_time.unwrap_or(0.0);
                    let end = start + g.duration.unwrap_or(f64::INFINITY);
                    start <= timestamp && timestamp < end
                });
                let idx = containing.or_else(|| {
                    games
                        .iter()
                        .rposition(|g| g.start_time.unwrap_or(0.0) <= timestamp)
                });

                match idx {
                    Some(idx) => {
                        let game = &games[idx];
                        let mut offset = timestamp - game.start_time.unwrap_or(0.0);
                        if let Some(duration) = game.duration {
                            offset = offset.min(duration);
                        }
                        PlaybackCursor::new(idx as u32 + 1, offset)
                    }
                    None => PlaybackCursor::start_of(1),
                }
            }
        }
    }
}

/// Delay for a single decoded video: `max(0, nominal - decoded)`.
pub fn local_delay(nominal: f64, decoded: f64) -> f64 {
    (nominal - decoded).max(0.0)
}

/// Waits until the backend knows its media duration, then derives the delay.
///
/// Never times out. Delay-dependent features stay disabled until this
/// resolves; dropping the future cancels the wait.
pub async fn resolve_local_delay(
    backend: &dyn PlayerBackend,
    nominal: f64,
    poll_every: Duration,
) -> f64 {
    let mut interval = tokio::time::interval(poll_every);
    loop {
        interval.tick().await;
        if let Some(decoded) = backend.duration() {
            let delay = local_delay(nominal, decoded);
            debug!("local file duration {}s, delay {}s", decoded, delay);
            return delay;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::backend::{BackendKind, ClockPlayer};
    use std::sync::Arc;

    fn seg(id: &str, part: u32, duration: Option<f64>) -> Segment {
        Segment {
            id: id.to_string(),
            duration,
            part: Some(part),
            kind: None,
        }
    }

    fn two_parts() -> Timeline {
        Timeline::parts(vec![seg("a", 1, Some(60.0)), seg("b", 2, Some(90.0))], 0.0)
    }

    #[test]
    fn test_delay_reconciles_nominal_duration() {
        let timeline = two_parts();
        assert_eq!(timeline.delay(170.0), 20.0);
        assert_eq!(timeline.delay(100.0), 0.0);
    }

    #[test]
    fn test_locate_example() {
        let cursor = two_parts().locate(100.0);
        assert_eq!(cursor, PlaybackCursor::new(2, 40.0));
    }

    #[test]
    fn test_stream_time_accumulates_prior_parts() {
        let timeline = two_parts();
        assert_eq!(timeline.stream_time(1, 10.0, 20.0, 0.0), 30.0);
        assert_eq!(timeline.stream_time(2, 10.0, 20.0, -5.0), 85.0);
    }

    #[test]
    fn test_locate_inverts_segment_time() {
        let timeline = Timeline::parts(
            vec![
                seg("a", 1, Some(60.0)),
                seg("b", 2, Some(90.0)),
                seg("c", 3, Some(45.5)),
            ],
            0.0,
        );

        for (part, offset) in [(1, 0.0), (1, 59.5), (2, 0.25), (2, 89.0), (3, 12.0)] {
            let t = timeline.segment_time(part, offset);
            assert_eq!(timeline.locate(t), PlaybackCursor::new(part, offset));
        }
    }

    #[test]
    fn test_locate_clamps_past_end() {
        let cursor = two_parts().locate(500.0);
        assert_eq!(cursor, PlaybackCursor::new(2, 90.0));
    }

    #[test]
    fn test_sparse_parts_and_fallback_duration() {
        let timeline = Timeline::parts(vec![seg("a", 2, None), seg("b", 5, Some(30.0))], 100.0);
        assert_eq!(timeline.index_of(5), Some(1));
        assert_eq!(timeline.part_start(5), 100.0);
        assert_eq!(timeline.next_part(2), Some(5));
        assert_eq!(timeline.next_part(5), None);
        assert_eq!(timeline.locate(110.0), PlaybackCursor::new(5, 10.0));
        assert_eq!(timeline.source_for(2), Some("a"));
    }

    #[test]
    fn test_games_anchor_on_start_time() {
        let games = Timeline::Games(vec![
            GameSegment {
                video_id: "g1".into(),
                start_time: Some(120.0),
                duration: Some(600.0),
                game_name: None,
                title: None,
            },
            GameSegment {
                video_id: "g2".into(),
                start_time: Some(4000.0),
                duration: None,
                game_name: None,
                title: None,
            },
        ]);

        assert_eq!(games.stream_time(2, 10.0, 0.0, 2.0), 4012.0);
        assert_eq!(games.delay(9999.0), 0.0);
        assert_eq!(games.locate(130.0), PlaybackCursor::new(1, 10.0));
        assert_eq!(games.locate(5000.0), PlaybackCursor::new(2, 1000.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_delay_waits_for_duration() {
        let player = Arc::new(ClockPlayer::new(BackendKind::LocalFile, None));
        let waiter = {
            let player = player.clone();
            tokio::spawn(async move {
                resolve_local_delay(player.as_ref(), 170.0, Duration::from_millis(100)).await
            })
        };

        tokio::time::sleep(Duration::from_millis(550)).await;
        assert!(!waiter.is_finished());

        player.set_duration(Some(150.0));
        let delay = waiter.await.expect("waiter should complete");
        assert_eq!(delay, 20.0);
    }
}
