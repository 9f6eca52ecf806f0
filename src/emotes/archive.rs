use async_trait::async_trait;

use crate::{
    api::ArchiveClient,
    common::{errors::ReplayResult, types::VodId},
    emotes::{ArchivedEmoteSource, EmoteSets},
};

#[async_trait]
impl ArchivedEmoteSource for ArchiveClient {
    async fn archived_emotes(&self, vod_id: &VodId) -> ReplayResult<Option<EmoteSets>> {
        Ok(ArchiveClient::archived_emotes(self, vod_id)
            .await?
            .map(EmoteSets::from))
    }
}
