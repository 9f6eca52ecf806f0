use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;
use tokio::time::Instant;

/// Player state, numbered the way the embedded youtube player reports it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PlayerStatus {
    Unstarted = 0,
    Ended = 1,
    Playing = 2,
    Paused = 3,
    Buffering = 4,
    Cued = 5,
}

impl PlayerStatus {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Ended,
            2 => Self::Playing,
            3 => Self::Paused,
            4 => Self::Buffering,
            5 => Self::Cued,
            _ => Self::Unstarted,
        }
    }

    /// Maps youtube iframe API codes (-1 unstarted, 0 ended, 1 playing,
    /// 2 paused, 3 buffering, 5 cued).
    pub fn from_youtube_code(code: i32) -> Self {
        match code {
            0 => Self::Ended,
            1 => Self::Playing,
            2 => Self::Paused,
            3 => Self::Buffering,
            5 => Self::Cued,
            _ => Self::Unstarted,
        }
    }

    pub fn is_playing(self) -> bool {
        self == Self::Playing
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// Multi-part remote video, one upload per part.
    Segmented,
    /// A single remote video spanning the broadcast.
    Continuous,
    /// A file the viewer supplied; its duration is only known once decoded.
    LocalFile,
}

/// The capability surface every video backend exposes to the time base.
pub trait PlayerBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Player-local playback position in seconds, `None` before anything loaded.
    fn local_time(&self) -> Option<f64>;

    /// Duration of the loaded media, `None` while unknown.
    fn duration(&self) -> Option<f64>;

    fn status(&self) -> PlayerStatus;

    fn seek_to(&self, seconds: f64);

    /// Replace the loaded media with `source_id`, starting at `start` seconds.
    fn load_segment(&self, source_id: &str, start: f64);
}

struct ClockAnchor {
    base: f64,
    resumed_at: Option<Instant>,
    duration: Option<f64>,
    loaded: Option<String>,
}

/// A backend driven by the tokio clock. Used by the headless binary and tests.
pub struct ClockPlayer {
    kind: BackendKind,
    status: AtomicU8,
    anchor: Mutex<ClockAnchor>,
}

impl ClockPlayer {
    pub fn new(kind: BackendKind, duration: Option<f64>) -> Self {
        Self {
            kind,
            status: AtomicU8::new(PlayerStatus::Unstarted as u8),
            anchor: Mutex::new(ClockAnchor {
                base: 0.0,
                resumed_at: None,
                duration,
                loaded: None,
            }),
        }
    }

    fn position(anchor: &ClockAnchor) -> f64 {
        let running = anchor
            .resumed_at
            .map(|at| at.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let pos = anchor.base + running;
        match anchor.duration {
            Some(d) => pos.min(d),
            None => pos,
        }
    }

    pub fn play(&self) {
        let mut anchor = self.anchor.lock();
        if anchor.resumed_at.is_none() {
            anchor.resumed_at = Some(Instant::now());
        }
        self.status
            .store(PlayerStatus::Playing as u8, Ordering::Release);
    }

    pub fn pause(&self) {
        self.freeze(PlayerStatus::Paused);
    }

    pub fn buffer(&self) {
        self.freeze(PlayerStatus::Buffering);
    }

    fn freeze(&self, next: PlayerStatus) {
        let mut anchor = self.anchor.lock();
        anchor.base = Self::position(&anchor);
        anchor.resumed_at = None;
        self.status.store(next as u8, Ordering::Release);
    }

    pub fn set_duration(&self, duration: Option<f64>) {
        self.anchor.lock().duration = duration;
    }

    pub fn loaded(&self) -> Option<String> {
        self.anchor.lock().loaded.clone()
    }
}

impl PlayerBackend for ClockPlayer {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn local_time(&self) -> Option<f64> {
        Some(Self::position(&self.anchor.lock()))
    }

    fn duration(&self) -> Option<f64> {
        self.anchor.lock().duration.filter(|d| d.is_finite() && *d > 0.0)
    }

    fn status(&self) -> PlayerStatus {
        let status = PlayerStatus::from_u8(self.status.load(Ordering::Acquire));
        if status != PlayerStatus::Playing {
            return status;
        }

        let mut anchor = self.anchor.lock();
        let reached_end = anchor
            .duration
            .is_some_and(|d| Self::position(&anchor) >= d);
        if reached_end {
            anchor.base = Self::position(&anchor);
            anchor.resumed_at = None;
            self.status.store(PlayerStatus::Ended as u8, Ordering::Release);
            return PlayerStatus::Ended;
        }
        status
    }

    fn seek_to(&self, seconds: f64) {
        let mut anchor = self.anchor.lock();
        anchor.base = seconds.max(0.0);
        if anchor.resumed_at.is_some() {
            anchor.resumed_at = Some(Instant::now());
        }
    }

    fn load_segment(&self, source_id: &str, start: f64) {
        let mut anchor = self.anchor.lock();
        anchor.loaded = Some(source_id.to_string());
        anchor.base = start.max(0.0);
        anchor.resumed_at = Some(Instant::now());
        self.status
            .store(PlayerStatus::Playing as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_youtube_codes() {
        assert_eq!(PlayerStatus::from_youtube_code(-1), PlayerStatus::Unstarted);
        assert_eq!(PlayerStatus::from_youtube_code(1), PlayerStatus::Playing);
        assert_eq!(PlayerStatus::from_youtube_code(3), PlayerStatus::Buffering);
        assert!(!PlayerStatus::from_youtube_code(2).is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_advances_only_while_playing() {
        let player = ClockPlayer::new(BackendKind::Continuous, Some(100.0));
        player.play();
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(player.local_time(), Some(10.0));

        player.pause();
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(player.local_time(), Some(10.0));
        assert_eq!(player.status(), PlayerStatus::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_ends_at_duration() {
        let player = ClockPlayer::new(BackendKind::Segmented, Some(5.0));
        player.load_segment("abc", 2.0);
        assert_eq!(player.loaded().as_deref(), Some("abc"));
        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(player.status(), PlayerStatus::Ended);
        assert_eq!(player.local_time(), Some(5.0));
    }
}
