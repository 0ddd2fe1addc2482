//! Position table backends.

mod rest;
mod sql;

pub use rest::RestStore;
pub use sql::SqlStore;

use crate::config::StoreConfig;
use crate::services::position_store::{PositionStore, StoreError};

/// Opens the backend selected by configuration.
pub async fn open_store(config: &StoreConfig) -> Result<Box<dyn PositionStore>, StoreError> {
    Ok(match config {
        StoreConfig::Sql { database_url } => Box::new(SqlStore::connect(database_url).await?),
        StoreConfig::Rest { url, key } => Box::new(RestStore::connect(url, key)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_sql_store() {
        let config = StoreConfig::Sql {
            database_url: "sqlite::memory:".to_string(),
        };
        let store = open_store(&config).await.unwrap();
        assert!(store.fetch_recent("1002", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_rest_store_rejects_bad_key() {
        let config = StoreConfig::Rest {
            url: "https://x.supabase.co".to_string(),
            key: "bad\nkey".to_string(),
        };
        assert!(matches!(
            open_store(&config).await,
            Err(StoreError::InvalidCredential(_))
        ));
    }
}
