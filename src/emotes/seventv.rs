use async_trait::async_trait;
use serde::Deserialize;

use super::{EmoteProvider, EmoteSource, RawEmote};
use crate::common::{errors::ReplayResult, http::HttpClient};

#[derive(Deserialize)]
struct EmoteSet {
    #[serde(default)]
    emotes: Vec<RawEmote>,
}

#[derive(Deserialize)]
struct UserResponse {
    emote_set: Option<EmoteSet>,
}

/// `GET {api}/users/twitch/{id}`, the channel's active set.
pub struct SevenTvChannelProvider {
    client: reqwest::Client,
    api: String,
    twitch_id: String,
}

impl SevenTvChannelProvider {
    pub fn new(client: reqwest::Client, api: &str, twitch_id: &str) -> Self {
        Self {
            client,
            api: api.trim_end_matches('/').to_string(),
            twitch_id: twitch_id.to_string(),
        }
    }
}

#[async_trait]
impl EmoteSource for SevenTvChannelProvider {
    fn name(&self) -> &'static str {
        "7tv-channel"
    }

    fn provider(&self) -> EmoteProvider {
        EmoteProvider::SevenTv
    }

    async fn load_emotes(&self) -> ReplayResult<Vec<RawEmote>> {
        let url = format!(
            "{}/users/twitch/{}",
            self.api,
            urlencoding::encode(&self.twitch_id)
        );
        let resp: UserResponse = HttpClient::get_json(&self.client, &url).await?;
        Ok(resp.emote_set.map(|s| s.emotes).unwrap_or_default())
    }
}

/// `GET {api}/emote-sets/global`. Loaded for every VOD, archived set or not.
pub struct SevenTvGlobalProvider {
    client: reqwest::Client,
    api: String,
}

impl SevenTvGlobalProvider {
    pub fn new(client: reqwest::Client, api: &str) -> Self {
        Self {
            client,
            api: api.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl EmoteSource for SevenTvGlobalProvider {
    fn name(&self) -> &'static str {
        "7tv-global"
    }

    fn provider(&self) -> EmoteProvider {
        EmoteProvider::SevenTv
    }

    async fn load_emotes(&self) -> ReplayResult<Vec<RawEmote>> {
        let url = format!("{}/emote-sets/global", self.api);
        let set: EmoteSet = HttpClient::get_json(&self.client, &url).await?;
        Ok(set.emotes)
    }
}
