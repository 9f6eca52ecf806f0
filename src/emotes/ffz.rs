use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::{EmoteProvider, EmoteSource, RawEmote};
use crate::common::{errors::ReplayResult, http::HttpClient};

#[derive(Deserialize)]
struct Room {
    set: u64,
}

#[derive(Deserialize)]
struct EmoteSet {
    #[serde(default)]
    emoticons: Vec<RawEmote>,
}

#[derive(Deserialize)]
struct RoomResponse {
    room: Room,
    #[serde(default)]
    sets: HashMap<String, EmoteSet>,
}

impl RoomResponse {
    fn into_room_emotes(mut self) -> Vec<RawEmote> {
        self.sets
            .remove(&self.room.set.to_string())
            .map(|set| set.emoticons)
            .unwrap_or_default()
    }
}

/// `GET {api}/room/id/{id}`, the room's own set only.
pub struct FfzRoomProvider {
    client: reqwest::Client,
    api: String,
    twitch_id: String,
}

impl FfzRoomProvider {
    pub fn new(client: reqwest::Client, api: &str, twitch_id: &str) -> Self {
        Self {
            client,
            api: api.trim_end_matches('/').to_string(),
            twitch_id: twitch_id.to_string(),
        }
    }
}

#[async_trait]
impl EmoteSource for FfzRoomProvider {
    fn name(&self) -> &'static str {
        "ffz-room"
    }

    fn provider(&self) -> EmoteProvider {
        EmoteProvider::Ffz
    }

    async fn load_emotes(&self) -> ReplayResult<Vec<RawEmote>> {
        let url = format!("{}/room/id/{}", self.api, urlencoding::encode(&self.twitch_id));
        let resp: RoomResponse = HttpClient::get_json(&self.client, &url).await?;
        Ok(resp.into_room_emotes())
    }
}
