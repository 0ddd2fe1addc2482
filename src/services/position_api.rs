//! Trait and error type for the upstream realtime position source.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
    #[error("response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response carries no position list ({})", .message.as_deref().unwrap_or("no message"))]
    NoPositionList { message: Option<String> },
}

/// Abstraction over the realtime train position provider.
#[async_trait]
pub trait PositionApi: Send + Sync {
    /// Returns the untyped position items currently reported for a line,
    /// addressed by its display name (e.g. `"2호선"`).
    async fn realtime_positions(&self, line_name: &str)
    -> Result<Vec<serde_json::Value>, FetchError>;
}
