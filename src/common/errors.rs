use thiserror::Error;

/// Failures surfaced by the replay subsystem.
///
/// Only metadata lookups propagate these to callers. Comment, emote and badge
/// fetches log them and continue with "no data this round".
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with status {status}")]
    Status { status: u16, url: String },

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Storage(#[from] std::io::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type ReplayResult<T> = Result<T, ReplayError>;
