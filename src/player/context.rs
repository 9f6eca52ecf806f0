use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::player::{
    backend::{BackendKind, PlayerBackend, PlayerStatus},
    timeline::{PlaybackCursor, Timeline},
};

struct Position {
    cursor: PlaybackCursor,
    delay: Option<f64>,
    user_chat_delay: f64,
    generation: u64,
}

/// Everything needed to turn "what is the player doing right now" into a
/// stream-relative time. Timer callbacks read it afresh on every tick rather
/// than capturing values.
pub struct PlaybackContext {
    backend: Arc<dyn PlayerBackend>,
    timeline: Timeline,
    nominal_duration: f64,
    position: RwLock<Position>,
}

impl PlaybackContext {
    /// Local files start with an unknown delay, see
    /// [`crate::player::timeline::resolve_local_delay`].
    pub fn new(
        backend: Arc<dyn PlayerBackend>,
        timeline: Timeline,
        nominal_duration: f64,
        cursor: PlaybackCursor,
    ) -> Self {
        let delay = match backend.kind() {
            BackendKind::LocalFile => None,
            _ => Some(timeline.delay(nominal_duration)),
        };
        if let Some(delay) = delay {
            info!("Chat delay: {} seconds", delay);
        }

        Self {
            backend,
            timeline,
            nominal_duration,
            position: RwLock::new(Position {
                cursor,
                delay,
                user_chat_delay: 0.0,
                generation: 0,
            }),
        }
    }

    pub fn backend(&self) -> &Arc<dyn PlayerBackend> {
        &self.backend
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn nominal_duration(&self) -> f64 {
        self.nominal_duration
    }

    pub fn status(&self) -> PlayerStatus {
        self.backend.status()
    }

    pub fn cursor(&self) -> PlaybackCursor {
        self.position.read().cursor
    }

    /// Bumped on every navigation; results issued under an older generation
    /// belong to an abandoned cursor.
    pub fn generation(&self) -> u64 {
        self.position.read().generation
    }

    /// Replaces the loaded content and seek target.
    pub fn navigate(&self, cursor: PlaybackCursor) -> u64 {
        let generation = {
            let mut position = self.position.write();
            position.cursor = cursor;
            position.generation += 1;
            position.generation
        };

        match self.timeline.source_for(cursor.part) {
            Some(source) => self.backend.load_segment(source, cursor.timestamp),
            None => self.backend.seek_to(cursor.timestamp),
        }
        debug!(
            "navigated to part {} at {}s (generation {})",
            cursor.part, cursor.timestamp, generation
        );
        generation
    }

    pub fn delay(&self) -> Option<f64> {
        self.position.read().delay
    }

    pub fn set_delay(&self, delay: f64) {
        let mut position = self.position.write();
        position.delay = Some(delay.max(0.0));
        info!("Chat delay: {} seconds", position.delay.unwrap_or_default() + position.user_chat_delay);
    }

    pub fn user_chat_delay(&self) -> f64 {
        self.position.read().user_chat_delay
    }

    pub fn set_user_chat_delay(&self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        let mut position = self.position.write();
        position.user_chat_delay = seconds;
        info!("Chat delay: {} seconds", position.delay.unwrap_or_default() + seconds);
    }

    /// Current position on the parts' own timeline, before any delay. This is
    /// what [`Timeline::locate`] inverts, so it is what resume positions store.
    pub fn segment_time(&self) -> Option<f64> {
        let local = self.backend.local_time()?;
        let part = self.position.read().cursor.part;
        Some(self.timeline.segment_time(part, local))
    }

    /// Current stream-relative time, without the viewer's chat offset.
    /// `None` until both the player position and the delay are known.
    pub fn stream_time(&self) -> Option<f64> {
        let local = self.backend.local_time()?;
        let position = self.position.read();
        let delay = position.delay?;
        Some(
            self.timeline
                .stream_time(position.cursor.part, local, delay, 0.0),
        )
    }

    /// Stream time the chat replay follows: [`Self::stream_time`] shifted by
    /// the viewer's chat offset.
    pub fn chat_time(&self) -> Option<f64> {
        let user_delay = self.user_chat_delay();
        self.stream_time().map(|t| t + user_delay)
    }
}
