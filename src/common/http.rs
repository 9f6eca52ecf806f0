use std::time::Duration;

use reqwest::{Client, Error, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::common::errors::{ReplayError, ReplayResult};

const DEFAULT_USER_AGENT: &str = concat!("vodsync/", env!("CARGO_PKG_VERSION"));

pub struct HttpClient;

impl HttpClient {
    pub fn default_user_agent() -> String {
        DEFAULT_USER_AGENT.to_string()
    }

    /// Client shared by the archive API and the emote providers.
    pub fn new(timeout: Duration) -> Result<Client, Error> {
        Client::builder()
            .user_agent(Self::default_user_agent())
            .timeout(timeout)
            .gzip(true)
            .build()
    }

    /// GET a JSON document. 404 maps to [`ReplayError::NotFound`], any other
    /// non-success status to [`ReplayError::Status`].
    pub async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> ReplayResult<T> {
        debug!("GET {}", url);
        let resp = client.get(url).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ReplayError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(ReplayError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
