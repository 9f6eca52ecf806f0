//! Samples the playing player and publishes stream-relative time.

use std::{ops::ControlFlow, sync::Arc, time::Duration};

use tokio::sync::watch;
use tracing::debug;

use crate::{
    common::types::VodId,
    player::{backend::PlayerStatus, context::PlaybackContext, task::PeriodicTask},
    storage::ResumeStore,
};

/// One point-in-time read of the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    /// Stream-relative seconds, without the viewer's chat offset.
    pub stream_time: f64,
    pub part: u32,
    pub generation: u64,
}

/// Polls the backend only while it reports playing. Consumers read the most
/// recent sample through a [`watch`] channel.
pub struct PositionTracker {
    vod_id: VodId,
    ctx: Arc<PlaybackContext>,
    resume: ResumeStore,
    task: PeriodicTask,
    tx: watch::Sender<Option<PositionSample>>,
}

impl PositionTracker {
    pub fn new(
        vod_id: VodId,
        ctx: Arc<PlaybackContext>,
        resume: ResumeStore,
        interval: Duration,
    ) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            vod_id,
            ctx,
            resume,
            task: PeriodicTask::new("position tracker", interval),
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PositionSample>> {
        self.tx.subscribe()
    }

    pub fn latest(&self) -> Option<PositionSample> {
        *self.tx.borrow()
    }

    pub fn is_sampling(&self) -> bool {
        self.task.is_running()
    }

    fn read(ctx: &PlaybackContext) -> Option<PositionSample> {
        Some(PositionSample {
            stream_time: ctx.stream_time()?,
            part: ctx.cursor().part,
            generation: ctx.generation(),
        })
    }

    /// Reacts to a player state change.
    pub fn on_status(&self, status: PlayerStatus) {
        match status {
            PlayerStatus::Playing => self.start(),
            PlayerStatus::Paused => {
                self.task.stop();
                if let Some(sample) = Self::read(&self.ctx) {
                    self.tx.send_replace(Some(sample));
                }
                if let Some(position) = self.ctx.segment_time() {
                    self.resume.save(&self.vod_id, position);
                }
            }
            PlayerStatus::Ended => {
                self.task.stop();
                let part = self.ctx.cursor().part;
                if self.ctx.timeline().next_part(part).is_none() {
                    debug!("{} finished, clearing resume position", self.vod_id);
                    self.resume.clear(&self.vod_id);
                }
            }
            PlayerStatus::Buffering | PlayerStatus::Unstarted | PlayerStatus::Cued => {
                self.task.stop();
            }
        }
    }

    fn start(&self) {
        let ctx = self.ctx.clone();
        let tx = self.tx.clone();
        self.task.start(move || {
            let ctx = ctx.clone();
            let tx = tx.clone();
            async move {
                if !ctx.status().is_playing() {
                    return ControlFlow::Break(());
                }
                if let Some(sample) = Self::read(&ctx) {
                    tx.send_replace(Some(sample));
                }
                ControlFlow::Continue(())
            }
        });
    }

    /// Teardown.
    pub fn stop(&self) {
        self.task.stop();
    }
}
