//! Drives a [`ChatEngine`] from the player: the reveal loop, comment fetches
//! and their staleness checks, and teardown.

use std::{ops::ControlFlow, sync::Arc, time::Duration};

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    api::{CommentSource, models::BadgeSets},
    chat::{
        engine::{ChatEngine, ChatState, ChatView, FetchTicket, PageOutcome},
        render::MessageRenderer,
    },
    common::types::VodId,
    configs::ChatConfig,
    emotes::EmoteSets,
    player::{backend::PlayerStatus, context::PlaybackContext, task::PeriodicTask},
    storage::ChatSettings,
};

struct Inner {
    vod_id: VodId,
    source: Arc<dyn CommentSource>,
    ctx: Arc<PlaybackContext>,
    engine: Mutex<ChatEngine>,
    renderer: RwLock<MessageRenderer>,
    view: watch::Sender<ChatView>,
    ticker: PeriodicTask,
    debounce: PeriodicTask,
    seek_debounce: Duration,
}

/// Chat replay for one open VOD; clones share it. Timer and fetch callbacks
/// hold only weak references and re-read the playback context on every run.
#[derive(Clone)]
pub struct ChatReplayer {
    inner: Arc<Inner>,
}

impl ChatReplayer {
    pub fn new(
        vod_id: VodId,
        source: Arc<dyn CommentSource>,
        ctx: Arc<PlaybackContext>,
        renderer: MessageRenderer,
        config: &ChatConfig,
    ) -> Self {
        let engine = ChatEngine::new(config.max_messages, config.scroll_threshold_px);
        let (view, _) = watch::channel(engine.view());

        Self {
            inner: Arc::new(Inner {
                vod_id,
                source,
                ctx,
                engine: Mutex::new(engine),
                renderer: RwLock::new(renderer),
                view,
                ticker: PeriodicTask::new("chat replay", Duration::from_millis(config.tick_interval_ms)),
                debounce: PeriodicTask::new("chat seek debounce", Duration::ZERO),
                seek_debounce: Duration::from_millis(config.seek_debounce_ms),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatView> {
        self.inner.view.subscribe()
    }

    pub fn view(&self) -> ChatView {
        self.inner.view.borrow().clone()
    }

    pub fn state(&self) -> ChatState {
        self.inner.engine.lock().state()
    }

    /// Player state change: playing (re)starts the reveal loop after a seek
    /// check, anything else suspends it.
    pub fn on_status(&self, status: PlayerStatus) {
        if status.is_playing() {
            Inner::check_position(&self.inner);
        } else {
            self.inner.suspend();
        }
    }

    /// The cursor or the chat offset changed.
    pub fn on_position_change(&self) {
        if self.inner.ctx.status().is_playing() {
            Inner::check_position(&self.inner);
        }
    }

    pub fn set_emotes(&self, sets: &EmoteSets) {
        self.inner.renderer.write().set_emotes(sets);
    }

    pub fn set_badges(&self, badges: BadgeSets) {
        self.inner.renderer.write().set_badge_sets(badges);
    }

    /// Applies to messages revealed from now on.
    pub fn set_settings(&self, settings: ChatSettings) {
        self.inner.renderer.write().set_settings(settings);
    }

    pub fn on_scroll(&self, scroll_top: f64, scroll_height: f64, client_height: f64) {
        let mut engine = self.inner.engine.lock();
        engine.on_scroll(scroll_top, scroll_height, client_height);
        self.inner.publish(&engine);
    }

    pub fn jump_to_bottom(&self) {
        let mut engine = self.inner.engine.lock();
        engine.jump_to_bottom();
        self.inner.publish(&engine);
    }

    /// Cancels every timer; results still in flight are ignored on arrival.
    pub fn shutdown(&self) {
        self.inner.debounce.stop();
        self.inner.ticker.stop();
        let mut engine = self.inner.engine.lock();
        engine.close();
        self.inner.publish(&engine);
        debug!("chat replay for {} closed", self.inner.vod_id);
    }
}

impl Inner {
    fn publish(&self, engine: &ChatEngine) {
        self.view.send_replace(engine.view());
    }

    fn suspend(&self) {
        self.debounce.stop();
        self.ticker.stop();
        let mut engine = self.engine.lock();
        engine.pause();
        self.publish(&engine);
    }

    fn check_position(this: &Arc<Self>) {
        let Some(t) = this.ctx.chat_time() else {
            debug!("stream time not known yet, chat waits");
            return;
        };

        let covered = {
            let mut engine = this.engine.lock();
            match engine.state() {
                ChatState::Closed => return,
                _ if engine.covers(t) => {
                    engine.seek_check(t);
                    this.publish(&engine);
                    true
                }
                _ => {
                    engine.abandon();
                    this.publish(&engine);
                    false
                }
            }
        };

        if covered {
            this.debounce.stop();
            Self::start_loop(this);
            return;
        }

        // Nothing from the old position may be revealed while the debounce
        // runs. Scrubbing is coalesced: only the position held for the
        // debounce period gets fetched.
        this.ticker.stop();
        let weak = Arc::downgrade(this);
        this.debounce.run_after(this.seek_debounce, async move {
            let Some(this) = weak.upgrade() else {
                return;
            };
            if !this.ctx.status().is_playing() {
                return;
            }
            let Some(t) = this.ctx.chat_time() else {
                return;
            };

            this.ticker.stop();
            let ticket = {
                let mut engine = this.engine.lock();
                let ticket = engine.seek_check(t);
                this.publish(&engine);
                ticket
            };
            if let Some(ticket) = ticket {
                Self::spawn_fetch(&this, ticket);
            }
            Self::start_loop(&this);
        });
    }

    fn start_loop(this: &Arc<Self>) {
        let weak = Arc::downgrade(this);
        this.ticker.start(move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(this) => Self::tick(&this),
                    None => ControlFlow::Break(()),
                }
            }
        });
    }

    fn tick(this: &Arc<Self>) -> ControlFlow<()> {
        if !this.ctx.status().is_playing() {
            return ControlFlow::Break(());
        }
        let Some(t) = this.ctx.chat_time() else {
            return ControlFlow::Continue(());
        };

        let fetch = {
            let renderer = this.renderer.read();
            let mut engine = this.engine.lock();
            if engine.state() == ChatState::Closed {
                return ControlFlow::Break(());
            }
            let step = engine.advance(t, &renderer);
            if step.rendered > 0 {
                this.publish(&engine);
            }
            step.fetch
        };

        if let Some(ticket) = fetch {
            Self::spawn_fetch(this, ticket);
        }
        ControlFlow::Continue(())
    }

    fn spawn_fetch(this: &Arc<Self>, ticket: FetchTicket) {
        let weak = Arc::downgrade(this);
        let source = this.source.clone();
        let vod_id = this.vod_id.clone();

        tokio::spawn(async move {
            let result = source.comments(&vod_id, &ticket.request).await;
            let Some(this) = weak.upgrade() else {
                return;
            };

            let page = match result {
                Ok(page) => Some(page),
                Err(e) => {
                    warn!("Failed to load comments for {}: {}", vod_id, e);
                    None
                }
            };

            let mut engine = this.engine.lock();
            if engine.apply_page(ticket.tag, page) == PageOutcome::Applied {
                this.publish(&engine);
            }
        });
    }
}
