pub mod models;

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::{
    common::{
        errors::{ReplayError, ReplayResult},
        http::HttpClient,
        types::VodId,
    },
    configs::ArchiveConfig,
};

pub use models::*;

/// Which page of a VOD's chat log to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentRequest {
    /// First page starting at this stream offset (whole seconds).
    AtOffset(u64),
    /// Page following a previously returned pagination cursor.
    AfterCursor(String),
}

/// Anything able to serve pages of archived chat.
#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn comments(&self, vod_id: &VodId, request: &CommentRequest)
    -> ReplayResult<CommentPage>;
}

/// VOD metadata and the badge catalogue.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn vod(&self, id: &VodId) -> ReplayResult<Vod>;
    async fn badges(&self) -> ReplayResult<BadgeSets>;
}

/// Client for the archive REST API.
#[derive(Clone)]
pub struct ArchiveClient {
    client: reqwest::Client,
    base: String,
    page_size: u32,
}

impl ArchiveClient {
    pub fn new(config: &ArchiveConfig) -> ReplayResult<Self> {
        if config.api_base.is_empty() {
            return Err(ReplayError::Config("archive.api_base is empty".into()));
        }

        Ok(Self {
            client: HttpClient::new(Duration::from_millis(config.request_timeout_ms))?,
            base: config.api_base.trim_end_matches('/').to_string(),
            page_size: config.vods_page_size.max(1),
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ReplayResult<T> {
        HttpClient::get_json(&self.client, url).await
    }

    /// `GET /vods/{id}`
    pub async fn vod(&self, id: &VodId) -> ReplayResult<Vod> {
        let url = format!("{}/vods/{}", self.base, urlencoding::encode(id));
        self.get_json(&url).await.map_err(|e| match e {
            ReplayError::NotFound(_) => ReplayError::NotFound(format!("vod {id}")),
            other => other,
        })
    }

    /// Newest-first listing, `page` is 1-based.
    pub async fn vods(&self, page: u32) -> ReplayResult<VodPage> {
        self.get_json(&self.vods_url(page)).await
    }

    pub async fn badges(&self) -> ReplayResult<BadgeSets> {
        self.get_json(&format!("{}/badges", self.base)).await
    }

    /// Emote set archived with the VOD, `None` when the archive has none.
    pub async fn archived_emotes(&self, vod_id: &VodId) -> ReplayResult<Option<ArchivedEmotes>> {
        let url = format!("{}/emotes?vod_id={}", self.base, urlencoding::encode(vod_id));
        let resp: ArchivedEmotesResponse = self.get_json(&url).await?;
        Ok(resp.data.into_iter().next())
    }

    fn vods_url(&self, page: u32) -> String {
        let skip = page.saturating_sub(1) as u64 * self.page_size as u64;
        format!(
            "{}/vods?limit={}&skip={}&sort[createdAt]=-1",
            self.base, self.page_size, skip
        )
    }

    fn comments_url(&self, vod_id: &VodId, request: &CommentRequest) -> String {
        let vod_id = urlencoding::encode(vod_id);
        match request {
            CommentRequest::AtOffset(offset) => format!(
                "{}/comments?vod_id={}&content_offset_seconds={}",
                self.base, vod_id, offset
            ),
            CommentRequest::AfterCursor(cursor) => format!(
                "{}/comments?vod_id={}&cursor={}",
                self.base,
                vod_id,
                urlencoding::encode(cursor)
            ),
        }
    }
}

#[async_trait]
impl CommentSource for ArchiveClient {
    async fn comments(
        &self,
        vod_id: &VodId,
        request: &CommentRequest,
    ) -> ReplayResult<CommentPage> {
        self.get_json(&self.comments_url(vod_id, request)).await
    }
}

#[async_trait]
impl MetadataSource for ArchiveClient {
    async fn vod(&self, id: &VodId) -> ReplayResult<Vod> {
        ArchiveClient::vod(self, id).await
    }

    async fn badges(&self) -> ReplayResult<BadgeSets> {
        ArchiveClient::badges(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ArchiveClient {
        ArchiveClient::new(&ArchiveConfig {
            api_base: "https://archive.test/".to_string(),
            ..ArchiveConfig::default()
        })
        .expect("client should build")
    }

    #[test]
    fn test_vods_url_paginates() {
        let client = client();
        assert_eq!(
            client.vods_url(1),
            "https://archive.test/vods?limit=50&skip=0&sort[createdAt]=-1"
        );
        assert_eq!(
            client.vods_url(3),
            "https://archive.test/vods?limit=50&skip=100&sort[createdAt]=-1"
        );
    }

    #[test]
    fn test_comments_urls() {
        let client = client();
        let vod = VodId::from("123");
        assert_eq!(
            client.comments_url(&vod, &CommentRequest::AtOffset(95)),
            "https://archive.test/comments?vod_id=123&content_offset_seconds=95"
        );
        assert_eq!(
            client.comments_url(&vod, &CommentRequest::AfterCursor("a+b/c".to_string())),
            "https://archive.test/comments?vod_id=123&cursor=a%2Bb%2Fc"
        );
    }

    #[test]
    fn test_rejects_empty_base() {
        assert!(ArchiveClient::new(&ArchiveConfig::default()).is_err());
    }
}
