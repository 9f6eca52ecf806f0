use std::{sync::Arc, time::Duration};

use tokio::sync::watch;
use tracing::{info, warn};
use vodsync::{
    api::ArchiveClient,
    chat::ChatView,
    common::{
        duration::to_hhmmss,
        logger,
        types::{AnyResult, SegmentKind, VodId},
    },
    configs::Config,
    emotes::{BadgeCache, EmoteManager},
    player::{BackendKind, ClockPlayer, NavigationQuery, PlayerBackend, PlayerStatus},
    storage::FileStore,
    viewer::{PlaybackSource, ViewerServices, VodViewer},
};

const USAGE: &str =
    "usage: vodsync <vod-id> [?t=1h2m3s&part=2] [--live|--vod|--games|--single|--local]";

struct Args {
    vod_id: VodId,
    query: NavigationQuery,
    source: PlaybackSource,
    backend: BackendKind,
}

fn parse_args() -> Option<Args> {
    let mut vod_id = None;
    let mut query = NavigationQuery::default();
    let mut source = PlaybackSource::Parts(None);
    let mut backend = BackendKind::Segmented;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--live" => source = PlaybackSource::Parts(Some(SegmentKind::Live)),
            "--vod" => source = PlaybackSource::Parts(Some(SegmentKind::Vod)),
            "--games" => source = PlaybackSource::Games,
            "--single" => {
                source = PlaybackSource::Single;
                backend = BackendKind::Continuous;
            }
            "--local" => {
                source = PlaybackSource::Single;
                backend = BackendKind::LocalFile;
            }
            q if q.starts_with('?') || q.contains('=') => query = NavigationQuery::parse(q),
            id if vod_id.is_none() => vod_id = Some(VodId::from(id)),
            other => {
                eprintln!("unexpected argument: {}", other);
                return None;
            }
        }
    }

    Some(Args {
        vod_id: vod_id?,
        query,
        source,
        backend,
    })
}

/// The clock player ends a part once it reaches the part's known duration.
fn sync_duration(player: &ClockPlayer, viewer: &VodViewer) {
    let timeline = viewer.context().timeline();
    let duration = match viewer.context().backend().kind() {
        BackendKind::LocalFile => Some(viewer.vod().duration_seconds()),
        _ => timeline.part_duration(viewer.cursor().part),
    };
    player.set_duration(duration);
}

/// Logs the messages appended since the last view, newest last.
fn log_new_messages(view: &ChatView, last_seen: &mut Option<String>) {
    let start = last_seen
        .as_ref()
        .and_then(|id| view.messages.iter().position(|m| &m.id == id))
        .map(|idx| idx + 1)
        .unwrap_or(0);

    for message in &view.messages[start..] {
        info!(
            "[{}] {}: {}",
            to_hhmmss(message.offset),
            message.display_name,
            message.plain_text()
        );
    }
    if let Some(last) = view.messages.last() {
        *last_seen = Some(last.id.clone());
    }
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    let config = Config::load()?;
    logger::init(&config);

    let Some(args) = parse_args() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let archive = Arc::new(ArchiveClient::new(&config.archive)?);
    let emotes = EmoteManager::new(archive.clone(), &config.emotes, archive.http().clone());
    let services = ViewerServices {
        metadata: archive.clone(),
        comments: archive.clone(),
        emotes: Arc::new(emotes),
        badge_cache: Arc::new(BadgeCache::new()),
        store: Arc::new(FileStore::new(&config.storage.path)),
        config: Arc::new(config),
    };

    let player = Arc::new(ClockPlayer::new(args.backend, None));

    let viewer = VodViewer::open(
        &services,
        args.vod_id,
        &args.query,
        args.source,
        player.clone(),
    )
    .await?;
    info!("Playing {} ({})", viewer.vod().title, viewer.vod().duration);

    sync_duration(&player, &viewer);
    player.play();
    viewer.on_player_event(PlayerStatus::Playing);

    let mut chat: watch::Receiver<ChatView> = viewer.subscribe_chat();
    let mut last_seen = None;
    let mut last_status = player.status();
    let mut poll = tokio::time::interval(Duration::from_millis(250));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            changed = chat.changed() => {
                if changed.is_err() {
                    warn!("chat view closed");
                    break;
                }
                let view = chat.borrow_and_update().clone();
                log_new_messages(&view, &mut last_seen);
            }
            _ = poll.tick() => {
                let status = player.status();
                if status == last_status {
                    continue;
                }
                last_status = status;
                viewer.on_player_event(status);

                if status == PlayerStatus::Ended {
                    if player.status() == PlayerStatus::Playing {
                        sync_duration(&player, &viewer);
                        last_status = PlayerStatus::Playing;
                        viewer.on_player_event(PlayerStatus::Playing);
                    } else {
                        info!("Reached the end of {}", viewer.vod().id);
                        break;
                    }
                }
            }
        }
    }

    if player.status() == PlayerStatus::Playing {
        player.pause();
        viewer.on_player_event(PlayerStatus::Paused);
    }
    if let Some(share) = viewer.share_query() {
        info!("Resume link: {}{}", viewer.vod().id, share);
    }
    if let Some(chapter) = viewer.current_chapter() {
        info!("Stopped in chapter {}", chapter.name);
    }
    viewer.shutdown();
    Ok(())
}
