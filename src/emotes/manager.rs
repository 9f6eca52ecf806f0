use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::{
    ArchivedEmoteSource, EmoteProvider, EmoteSets, EmoteSource, RawEmote,
    bttv::{BttvChannelProvider, BttvGlobalProvider},
    ffz::FfzRoomProvider,
    seventv::{SevenTvChannelProvider, SevenTvGlobalProvider},
};
use crate::{common::types::VodId, configs::EmotesConfig};

/// Loads the emote sets for a VOD: the archived set when there is one, the
/// third-party providers otherwise, plus the always-on global sets.
pub struct EmoteManager {
    archive: Arc<dyn ArchivedEmoteSource>,
    always: Vec<Arc<dyn EmoteSource>>,
    fallback: Vec<Arc<dyn EmoteSource>>,
}

impl EmoteManager {
    pub fn new(
        archive: Arc<dyn ArchivedEmoteSource>,
        config: &EmotesConfig,
        client: reqwest::Client,
    ) -> Self {
        let mut always: Vec<Arc<dyn EmoteSource>> = Vec::new();
        let mut fallback: Vec<Arc<dyn EmoteSource>> = Vec::new();
        let has_channel = !config.twitch_id.trim().is_empty();

        macro_rules! register_provider {
            ($list:ident, $enabled:expr, $name:literal, $ctor:expr) => {
                if $enabled {
                    $list.push(Arc::new($ctor));
                    debug!("Registered emote provider: {}", $name);
                }
            };
        }

        register_provider!(
            always,
            true,
            "7TV global",
            SevenTvGlobalProvider::new(client.clone(), &config.seventv_api)
        );
        register_provider!(
            fallback,
            true,
            "BTTV global",
            BttvGlobalProvider::new(client.clone(), &config.bttv_api)
        );
        register_provider!(
            fallback,
            has_channel,
            "BTTV channel",
            BttvChannelProvider::new(client.clone(), &config.bttv_api, &config.twitch_id)
        );
        register_provider!(
            fallback,
            has_channel,
            "FFZ room",
            FfzRoomProvider::new(client.clone(), &config.ffz_api, &config.twitch_id)
        );
        register_provider!(
            fallback,
            has_channel,
            "7TV channel",
            SevenTvChannelProvider::new(client, &config.seventv_api, &config.twitch_id)
        );

        if !has_channel {
            warn!("emotes.twitch_id is empty; channel emote fallbacks are disabled");
        }

        Self::with_sources(archive, always, fallback)
    }

    pub fn with_sources(
        archive: Arc<dyn ArchivedEmoteSource>,
        always: Vec<Arc<dyn EmoteSource>>,
        fallback: Vec<Arc<dyn EmoteSource>>,
    ) -> Self {
        Self {
            archive,
            always,
            fallback,
        }
    }

    /// Never fails; a source that errors contributes nothing. Global sets come
    /// first in their slot so channel emotes win on equal codes.
    pub async fn load(&self, vod_id: &VodId) -> EmoteSets {
        let (base, globals) = tokio::join!(self.load_base(vod_id), Self::load_all(&self.always));

        let mut sets = EmoteSets::default();
        for (provider, emotes) in globals {
            sets.extend(provider, emotes);
        }
        sets.merge(base);

        info!("Loaded {} emotes for {}", sets.len(), vod_id);
        sets
    }

    async fn load_base(&self, vod_id: &VodId) -> EmoteSets {
        match self.archive.archived_emotes(vod_id).await {
            Ok(Some(sets)) if !sets.is_empty() => return sets,
            Ok(_) => debug!("no archived emotes for {}, querying providers", vod_id),
            Err(e) => warn!("Failed to load archived emotes for {}: {}", vod_id, e),
        }

        let mut sets = EmoteSets::default();
        for (provider, emotes) in Self::load_all(&self.fallback).await {
            sets.extend(provider, emotes);
        }
        sets
    }

    /// Fetches every source concurrently, keeping registration order.
    async fn load_all(sources: &[Arc<dyn EmoteSource>]) -> Vec<(EmoteProvider, Vec<RawEmote>)> {
        join_all(sources.iter().map(|source| async move {
            match source.load_emotes().await {
                Ok(emotes) => {
                    debug!("{} returned {} emotes", source.name(), emotes.len());
                    (source.provider(), emotes)
                }
                Err(e) => {
                    warn!("Failed to load {} emotes: {}", source.name(), e);
                    (source.provider(), Vec::new())
                }
            }
        }))
        .await
    }
}
