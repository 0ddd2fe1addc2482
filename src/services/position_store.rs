//! Trait and error type for the position table.

use async_trait::async_trait;

use crate::position::{PositionEvent, PositionRecord};

pub const TABLE_NAME: &str = "realtime_subway_positions";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to encode or decode rows: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid created_at value {value:?}: {source}")]
    Timestamp {
        value: String,
        source: chrono::ParseError,
    },
    #[error("invalid store credential: {0}")]
    InvalidCredential(String),
    #[error("invalid store url: {0}")]
    InvalidUrl(String),
}

/// Append-only storage for position observations.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Inserts all records as one batch and returns the number of rows written.
    /// The store assigns `created_at`.
    async fn insert_positions(&self, records: &[PositionRecord]) -> Result<usize, StoreError>;

    /// Up to `limit` most recent events for a line, newest first.
    async fn fetch_recent(&self, line_id: &str, limit: usize)
    -> Result<Vec<PositionEvent>, StoreError>;
}

#[async_trait]
impl<T: PositionStore + ?Sized> PositionStore for Box<T> {
    async fn insert_positions(&self, records: &[PositionRecord]) -> Result<usize, StoreError> {
        (**self).insert_positions(records).await
    }

    async fn fetch_recent(
        &self,
        line_id: &str,
        limit: usize,
    ) -> Result<Vec<PositionEvent>, StoreError> {
        (**self).fetch_recent(line_id, limit).await
    }
}
