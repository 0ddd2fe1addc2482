use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Url};
use tracing::debug;

use crate::fetch::auth::ApiKey;
use crate::fetch::{BasicClient, HttpClient};
use crate::position::{PositionEvent, PositionRecord};
use crate::services::position_store::{PositionStore, StoreError, TABLE_NAME};

/// Position table behind a PostgREST endpoint (Supabase).
///
/// Inserts post the whole batch as one JSON array; reads use PostgREST's
/// `eq.`/`order`/`limit` query syntax.
pub struct RestStore<C> {
    http: C,
    table_url: Url,
}

impl RestStore<ApiKey<BasicClient>> {
    pub fn connect(url: &str, key: &str) -> Result<Self, StoreError> {
        let http = ApiKey::supabase(BasicClient::new(), key)
            .map_err(|e| StoreError::InvalidCredential(e.to_string()))?;
        Self::with_client(http, url)
    }
}

impl<C: HttpClient> RestStore<C> {
    pub fn with_client(http: C, url: &str) -> Result<Self, StoreError> {
        let table_url = Url::parse(&format!(
            "{}/rest/v1/{TABLE_NAME}",
            url.trim_end_matches('/')
        ))
        .map_err(|e| StoreError::InvalidUrl(e.to_string()))?;

        Ok(Self { http, table_url })
    }

    async fn send(&self, req: reqwest::Request) -> Result<reqwest::Response, StoreError> {
        let resp = self.http.execute(req).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl<C: HttpClient> PositionStore for RestStore<C> {
    async fn insert_positions(&self, records: &[PositionRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut req = reqwest::Request::new(Method::POST, self.table_url.clone());
        let headers = req.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("prefer", HeaderValue::from_static("return=minimal"));
        *req.body_mut() = Some(serde_json::to_vec(records)?.into());

        self.send(req).await?;
        debug!(rows = records.len(), "Posted position batch");
        Ok(records.len())
    }

    async fn fetch_recent(
        &self,
        line_id: &str,
        limit: usize,
    ) -> Result<Vec<PositionEvent>, StoreError> {
        let mut url = self.table_url.clone();
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("line_id", &format!("eq.{line_id}"))
            .append_pair("order", "created_at.desc")
            .append_pair("limit", &limit.to_string());

        let resp = self.send(reqwest::Request::new(Method::GET, url)).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StubClient;
    use serde_json::json;

    fn record() -> PositionRecord {
        PositionRecord {
            line_id: "1009".to_string(),
            line_name: Some("9호선".to_string()),
            station_id: Some("1009000915".to_string()),
            station_name: "여의도".to_string(),
            train_number: "9015".to_string(),
            last_received_date: None,
            last_received_time: Some("2024-01-01 08:00:00".to_string()),
            direction_type: 0,
            destination_station_id: None,
            destination_station_name: None,
            train_status_code: Some(1),
            is_express: true,
            is_last_train: false,
        }
    }

    #[tokio::test]
    async fn test_insert_posts_one_array() {
        let stub = StubClient::new().respond(201, "");
        let store = RestStore::with_client(&stub, "https://x.supabase.co/").unwrap();

        let written = store
            .insert_positions(&[record(), record()])
            .await
            .unwrap();
        assert_eq!(written, 2);

        let sent = stub.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, "POST");
        assert_eq!(
            sent[0].url,
            "https://x.supabase.co/rest/v1/realtime_subway_positions"
        );
        assert_eq!(sent[0].header("prefer").as_deref(), Some("return=minimal"));

        let body = sent[0].json_body();
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["is_express"], json!(true));
        assert_eq!(rows[0]["train_status_code"], json!(1));
        assert!(rows[0].get("created_at").is_none());
    }

    #[tokio::test]
    async fn test_insert_failure_is_status_error() {
        let stub = StubClient::new().respond(401, "{\"message\":\"Invalid API key\"}");
        let store = RestStore::with_client(&stub, "https://x.supabase.co").unwrap();

        let err = store.insert_positions(&[record()]).await.unwrap_err();
        match err {
            StoreError::Status { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("Invalid API key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_insert_sends_nothing() {
        let stub = StubClient::new();
        let store = RestStore::with_client(&stub, "https://x.supabase.co").unwrap();
        assert_eq!(store.insert_positions(&[]).await.unwrap(), 0);
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_recent_query_and_decode() {
        let mut row = serde_json::to_value(record()).unwrap();
        row["id"] = json!(7);
        row["created_at"] = json!("2024-01-01T08:00:05.5+00:00");
        let stub = StubClient::new().respond(200, json!([row]).to_string());
        let store = RestStore::with_client(&stub, "https://x.supabase.co").unwrap();

        let events = store.fetch_recent("1009", 1).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].record, record());

        let url = &stub.requests()[0].url;
        assert!(url.contains("select=*") || url.contains("select=%2A"));
        assert!(url.contains("line_id=eq.1009"));
        assert!(url.contains("order=created_at.desc"));
        assert!(url.contains("limit=1"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_bad_payload() {
        let stub = StubClient::new().respond(200, "{\"unexpected\":true}");
        let store = RestStore::with_client(&stub, "https://x.supabase.co").unwrap();
        let err = store.fetch_recent("1009", 10).await.unwrap_err();
        assert!(matches!(err, StoreError::Serde(_)));
    }
}
