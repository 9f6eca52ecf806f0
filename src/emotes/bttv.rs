use async_trait::async_trait;
use serde::Deserialize;

use super::{EmoteProvider, EmoteSource, RawEmote};
use crate::common::{errors::ReplayResult, http::HttpClient};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelEmotes {
    #[serde(default)]
    channel_emotes: Vec<RawEmote>,
    #[serde(default)]
    shared_emotes: Vec<RawEmote>,
}

/// `GET {api}/cached/emotes/global`
pub struct BttvGlobalProvider {
    client: reqwest::Client,
    api: String,
}

impl BttvGlobalProvider {
    pub fn new(client: reqwest::Client, api: &str) -> Self {
        Self {
            client,
            api: api.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl EmoteSource for BttvGlobalProvider {
    fn name(&self) -> &'static str {
        "bttv-global"
    }

    fn provider(&self) -> EmoteProvider {
        EmoteProvider::Bttv
    }

    async fn load_emotes(&self) -> ReplayResult<Vec<RawEmote>> {
        let url = format!("{}/cached/emotes/global", self.api);
        HttpClient::get_json(&self.client, &url).await
    }
}

/// `GET {api}/cached/users/twitch/{id}`, shared emotes before channel emotes.
pub struct BttvChannelProvider {
    client: reqwest::Client,
    api: String,
    twitch_id: String,
}

impl BttvChannelProvider {
    pub fn new(client: reqwest::Client, api: &str, twitch_id: &str) -> Self {
        Self {
            client,
            api: api.trim_end_matches('/').to_string(),
            twitch_id: twitch_id.to_string(),
        }
    }
}

#[async_trait]
impl EmoteSource for BttvChannelProvider {
    fn name(&self) -> &'static str {
        "bttv-channel"
    }

    fn provider(&self) -> EmoteProvider {
        EmoteProvider::Bttv
    }

    async fn load_emotes(&self) -> ReplayResult<Vec<RawEmote>> {
        let url = format!(
            "{}/cached/users/twitch/{}",
            self.api,
            urlencoding::encode(&self.twitch_id)
        );
        let resp: ChannelEmotes = HttpClient::get_json(&self.client, &url).await?;
        let mut emotes = resp.shared_emotes;
        emotes.extend(resp.channel_emotes);
        Ok(emotes)
    }
}
