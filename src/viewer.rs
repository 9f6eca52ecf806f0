//! Everything one open VOD page needs, wired together.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    api::{CommentSource, MetadataSource, models::{Chapter, Vod}},
    chat::{ChatReplayer, ChatView, MessageRenderer},
    common::{
        errors::{ReplayError, ReplayResult},
        types::{SegmentKind, VodId},
    },
    configs::Config,
    emotes::{BadgeCache, EmoteCdn, EmoteManager},
    player::{
        backend::{BackendKind, PlayerBackend, PlayerStatus},
        context::PlaybackContext,
        navigation::{self, NavigationQuery},
        timeline::{PlaybackCursor, Timeline, resolve_local_delay},
        tracker::{PositionSample, PositionTracker},
    },
    storage::{ChatSettings, ChatSettingsStore, KeyValueStore, ResumeStore},
};

/// Which of a VOD's video sources to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackSource {
    /// Youtube parts of one kind; `None` prefers live uploads.
    Parts(Option<SegmentKind>),
    /// Per-game clips.
    Games,
    /// One continuous video or a local file.
    Single,
}

/// Application-wide collaborators, created once and shared by every viewer.
#[derive(Clone)]
pub struct ViewerServices {
    pub config: Arc<Config>,
    pub metadata: Arc<dyn MetadataSource>,
    pub comments: Arc<dyn CommentSource>,
    pub emotes: Arc<EmoteManager>,
    pub badge_cache: Arc<BadgeCache>,
    pub store: Arc<dyn KeyValueStore>,
}

pub struct VodViewer {
    vod: Vod,
    ctx: Arc<PlaybackContext>,
    tracker: PositionTracker,
    chat: ChatReplayer,
    settings_store: ChatSettingsStore,
    settings: Mutex<ChatSettings>,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl VodViewer {
    /// Fetches the VOD and starts playback at the cursor the query (or the
    /// saved resume position) asks for. Only a metadata failure is an error;
    /// emotes, badges and chat degrade on their own.
    pub async fn open(
        services: &ViewerServices,
        vod_id: VodId,
        query: &NavigationQuery,
        source: PlaybackSource,
        backend: Arc<dyn PlayerBackend>,
    ) -> ReplayResult<Self> {
        let config = &services.config;
        let vod = services.metadata.vod(&vod_id).await?;
        let timeline = Self::timeline_for(&vod, source, config.archive.default_segment_duration)?;

        let resume = ResumeStore::new(services.store.clone());
        let settings_store = ChatSettingsStore::new(services.store.clone());
        let settings = settings_store.load();

        let resume_at = query.is_empty().then(|| resume.get(&vod_id)).flatten();
        let cursor = navigation::initial_cursor(&timeline, query, resume_at);
        info!(
            "Opening {} ({}) at part {} +{}s",
            vod.id, vod.title, cursor.part, cursor.timestamp
        );

        let ctx = Arc::new(PlaybackContext::new(
            backend,
            timeline,
            vod.duration_seconds(),
            cursor,
        ));
        ctx.set_user_chat_delay(settings.user_chat_delay);

        let mut renderer = MessageRenderer::new(
            EmoteCdn::new(&config.emotes),
            &config.emotes.twemoji_base,
            services.badge_cache.clone(),
        );
        renderer.set_settings(settings.clone());

        let chat = ChatReplayer::new(
            vod_id.clone(),
            services.comments.clone(),
            ctx.clone(),
            renderer,
            &config.chat,
        );
        let tracker = PositionTracker::new(
            vod_id.clone(),
            ctx.clone(),
            resume,
            Duration::from_millis(config.player.sample_interval_ms),
        );

        let viewer = Self {
            vod,
            ctx,
            tracker,
            chat,
            settings_store,
            settings: Mutex::new(settings),
            background: Mutex::new(Vec::new()),
        };
        viewer.spawn_background(services);
        viewer.ctx.navigate(cursor);
        Ok(viewer)
    }

    fn timeline_for(vod: &Vod, source: PlaybackSource, fallback: f64) -> ReplayResult<Timeline> {
        match source {
            PlaybackSource::Parts(kind) => {
                let segments = vod.segments_of(kind);
                if segments.is_empty() {
                    return Err(ReplayError::NotFound(format!("youtube parts of vod {}", vod.id)));
                }
                Ok(Timeline::parts(segments, fallback))
            }
            PlaybackSource::Games => {
                if vod.games.is_empty() {
                    return Err(ReplayError::NotFound(format!("game clips of vod {}", vod.id)));
                }
                Ok(Timeline::Games(vod.games.clone()))
            }
            PlaybackSource::Single => Ok(Timeline::Single),
        }
    }

    fn spawn_background(&self, services: &ViewerServices) {
        let mut tasks = self.background.lock();

        let emotes = services.emotes.clone();
        let chat = self.chat.clone();
        let vod_id = self.vod.id.clone();
        tasks.push(tokio::spawn(async move {
            let sets = emotes.load(&vod_id).await;
            chat.set_emotes(&sets);
        }));

        let metadata = services.metadata.clone();
        let chat = self.chat.clone();
        tasks.push(tokio::spawn(async move {
            match metadata.badges().await {
                Ok(badges) => chat.set_badges(badges),
                Err(e) => warn!("Failed to load badges: {}", e),
            }
        }));

        if self.ctx.backend().kind() == BackendKind::LocalFile {
            let ctx = self.ctx.clone();
            let chat = self.chat.clone();
            let poll = Duration::from_millis(services.config.player.duration_poll_ms);
            tasks.push(tokio::spawn(async move {
                let delay =
                    resolve_local_delay(ctx.backend().as_ref(), ctx.nominal_duration(), poll).await;
                ctx.set_delay(delay);
                chat.on_position_change();
            }));
        }
    }

    pub fn vod(&self) -> &Vod {
        &self.vod
    }

    pub fn context(&self) -> &Arc<PlaybackContext> {
        &self.ctx
    }

    pub fn cursor(&self) -> PlaybackCursor {
        self.ctx.cursor()
    }

    pub fn chat(&self) -> &ChatReplayer {
        &self.chat
    }

    pub fn chat_view(&self) -> ChatView {
        self.chat.view()
    }

    pub fn subscribe_chat(&self) -> watch::Receiver<ChatView> {
        self.chat.subscribe()
    }

    pub fn subscribe_position(&self) -> watch::Receiver<Option<PositionSample>> {
        self.tracker.subscribe()
    }

    /// Routes a player state change. The end of a part continues with the
    /// next one; the end of the last part finishes the VOD.
    pub fn on_player_event(&self, status: PlayerStatus) {
        self.tracker.on_status(status);

        if status == PlayerStatus::Ended {
            let part = self.ctx.cursor().part;
            if let Some(next) = navigation::advance_after(self.ctx.timeline(), part) {
                debug!("part {} ended, continuing with part {}", part, next.part);
                self.navigate(next);
                return;
            }
        }
        self.chat.on_status(status);
    }

    fn navigate(&self, cursor: PlaybackCursor) {
        self.ctx.navigate(cursor);
        self.chat.on_position_change();
    }

    /// Returns false when the part does not exist.
    pub fn select_part(&self, part: u32) -> bool {
        match navigation::select_part(self.ctx.timeline(), part) {
            Some(cursor) => {
                self.navigate(cursor);
                true
            }
            None => false,
        }
    }

    pub fn select_chapter(&self, chapter: &Chapter) {
        self.navigate(navigation::locate_chapter(self.ctx.timeline(), chapter));
    }

    /// Jumps to a stream-relative time.
    pub fn seek(&self, stream_time: f64) {
        self.navigate(self.ctx.timeline().locate(stream_time));
    }

    /// Chapter under the current stream time.
    pub fn current_chapter(&self) -> Option<&Chapter> {
        let t = self.ctx.stream_time()?;
        navigation::current_chapter(&self.vod.chapters, t)
    }

    /// `?t=...` reopening the VOD at the current position.
    pub fn share_query(&self) -> Option<String> {
        self.ctx.stream_time().map(navigation::share_query)
    }

    pub fn settings(&self) -> ChatSettings {
        self.settings.lock().clone()
    }

    fn update_settings(&self, apply: impl FnOnce(&mut ChatSettings)) -> ChatSettings {
        let mut settings = self.settings.lock();
        apply(&mut settings);
        self.settings_store.save(&settings);
        self.chat.set_settings(settings.clone());
        settings.clone()
    }

    pub fn set_user_chat_delay(&self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        self.update_settings(|s| s.user_chat_delay = seconds);
        self.ctx.set_user_chat_delay(seconds);
        self.chat.on_position_change();
    }

    pub fn set_show_timestamp(&self, show: bool) {
        self.update_settings(|s| s.show_timestamp = show);
    }

    pub fn add_filter_word(&self, word: &str) -> bool {
        let mut added = false;
        self.update_settings(|s| added = s.add_filter_word(word));
        added
    }

    pub fn remove_filter_word(&self, word: &str) {
        self.update_settings(|s| s.remove_filter_word(word));
    }

    pub fn on_scroll(&self, scroll_top: f64, scroll_height: f64, client_height: f64) {
        self.chat.on_scroll(scroll_top, scroll_height, client_height);
    }

    pub fn jump_to_bottom(&self) {
        self.chat.jump_to_bottom();
    }

    /// Navigating away: stops every timer and background load.
    pub fn shutdown(&self) {
        for task in self.background.lock().drain(..) {
            task.abort();
        }
        self.tracker.stop();
        self.chat.shutdown();
        debug!("viewer for {} shut down", self.vod.id);
    }
}

impl Drop for VodViewer {
    fn drop(&mut self) {
        for task in self.background.get_mut().drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{
            CommentRequest,
            models::{BadgeSets, CommentPage},
        },
        emotes::{ArchivedEmoteSource, EmoteSets},
        player::backend::ClockPlayer,
        storage::MemoryStore,
    };
    use async_trait::async_trait;

    struct FakeArchive {
        vod: Option<Vod>,
    }

    #[async_trait]
    impl MetadataSource for FakeArchive {
        async fn vod(&self, id: &VodId) -> ReplayResult<Vod> {
            self.vod
                .clone()
                .ok_or_else(|| ReplayError::NotFound(format!("vod {id}")))
        }

        async fn badges(&self) -> ReplayResult<BadgeSets> {
            Ok(BadgeSets::default())
        }
    }

    #[async_trait]
    impl CommentSource for FakeArchive {
        async fn comments(
            &self,
            _vod_id: &VodId,
            _request: &CommentRequest,
        ) -> ReplayResult<CommentPage> {
            Ok(CommentPage::default())
        }
    }

    #[async_trait]
    impl ArchivedEmoteSource for FakeArchive {
        async fn archived_emotes(&self, _vod_id: &VodId) -> ReplayResult<Option<EmoteSets>> {
            Ok(None)
        }
    }

    fn vod() -> Vod {
        serde_json::from_value(serde_json::json!({
            "id": "v1",
            "title": "Stream",
            "duration": "00:02:50",
            "chapters": [
                { "name": "Intro", "start": 0, "end": 60 },
                { "name": "Game", "start": 60, "end": 110 }
            ],
            "youtube": [
                { "id": "a", "duration": 60, "part": 1, "type": "vod" },
                { "id": "b", "duration": 90, "part": 2, "type": "vod" }
            ]
        }))
        .unwrap()
    }

    fn setup(vod: Option<Vod>) -> (ViewerServices, Arc<MemoryStore>) {
        let archive = Arc::new(FakeArchive { vod });
        let store = Arc::new(MemoryStore::new());
        let services = ViewerServices {
            config: Arc::new(Config::default()),
            metadata: archive.clone(),
            comments: archive.clone(),
            emotes: Arc::new(EmoteManager::with_sources(archive, vec![], vec![])),
            badge_cache: Arc::new(BadgeCache::new()),
            store: store.clone(),
        };
        (services, store)
    }

    fn player() -> Arc<ClockPlayer> {
        Arc::new(ClockPlayer::new(BackendKind::Segmented, None))
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_from_query() {
        let (services, _) = setup(Some(vod()));
        let player = player();
        let query = NavigationQuery::parse("?t=1m40s");

        let viewer = VodViewer::open(
            &services,
            "v1".into(),
            &query,
            PlaybackSource::Parts(None),
            player.clone(),
        )
        .await
        .unwrap();

        assert_eq!(viewer.cursor(), PlaybackCursor::new(2, 40.0));
        assert_eq!(player.loaded().as_deref(), Some("b"));
        assert_eq!(viewer.context().delay(), Some(20.0));
        assert_eq!(viewer.current_chapter().map(|c| c.name.as_str()), Some("Game"));
        assert_eq!(viewer.share_query().as_deref(), Some("?t=0h2m0s"));
        viewer.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_seeding_and_auto_advance() {
        let (services, store) = setup(Some(vod()));
        let resume = ResumeStore::new(store.clone());
        let id = VodId::from("v1");
        resume.save(&id, 75.0);

        let player = player();
        let viewer = VodViewer::open(
            &services,
            id.clone(),
            &NavigationQuery::default(),
            PlaybackSource::Parts(Some(SegmentKind::Vod)),
            player.clone(),
        )
        .await
        .unwrap();
        assert_eq!(viewer.cursor(), PlaybackCursor::new(2, 15.0));

        assert!(viewer.select_part(1));
        assert!(!viewer.select_part(7));
        viewer.on_player_event(PlayerStatus::Ended);
        assert_eq!(viewer.cursor(), PlaybackCursor::start_of(2));
        assert_eq!(player.loaded().as_deref(), Some("b"));
        assert_eq!(resume.get(&id), Some(75.0));

        viewer.on_player_event(PlayerStatus::Ended);
        assert_eq!(resume.get(&id), None);
        viewer.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_reopen_returns_to_same_spot() {
        let (services, _) = setup(Some(vod()));
        let first = player();
        let viewer = VodViewer::open(
            &services,
            "v1".into(),
            &NavigationQuery::default(),
            PlaybackSource::Parts(None),
            first.clone(),
        )
        .await
        .unwrap();
        assert_eq!(viewer.context().delay(), Some(20.0));

        viewer.on_player_event(PlayerStatus::Playing);
        tokio::time::sleep(Duration::from_secs(5)).await;
        first.pause();
        viewer.on_player_event(PlayerStatus::Paused);
        viewer.shutdown();

        let reopened = VodViewer::open(
            &services,
            "v1".into(),
            &NavigationQuery::default(),
            PlaybackSource::Parts(None),
            player(),
        )
        .await
        .unwrap();
        assert_eq!(reopened.cursor(), PlaybackCursor::new(1, 5.0));
        reopened.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_metadata_failure_surfaces() {
        let (services, _) = setup(None);
        let result = VodViewer::open(
            &services,
            "missing".into(),
            &NavigationQuery::default(),
            PlaybackSource::Parts(None),
            player(),
        )
        .await;
        assert!(matches!(result, Err(ReplayError::NotFound(_))));

        let (services, _) = setup(Some(vod()));
        let result = VodViewer::open(
            &services,
            "v1".into(),
            &NavigationQuery::default(),
            PlaybackSource::Games,
            player(),
        )
        .await;
        assert!(matches!(result, Err(ReplayError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settings_persist() {
        let (services, store) = setup(Some(vod()));
        let viewer = VodViewer::open(
            &services,
            "v1".into(),
            &NavigationQuery::default(),
            PlaybackSource::Parts(None),
            player(),
        )
        .await
        .unwrap();

        viewer.set_user_chat_delay(-4.0);
        viewer.set_show_timestamp(true);
        assert!(viewer.add_filter_word("spoiler"));
        assert_eq!(viewer.context().user_chat_delay(), -4.0);

        let saved = ChatSettingsStore::new(store).load();
        assert_eq!(saved.user_chat_delay, -4.0);
        assert!(saved.show_timestamp);
        assert_eq!(saved.filter_words, vec!["spoiler".to_string()]);
        viewer.shutdown();
    }
}
