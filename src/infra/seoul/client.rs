use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::ApiConfig;
use crate::fetch::{HttpClient, get_bytes};
use crate::services::position_api::{FetchError, PositionApi};

/// Position lists arrive under either key depending on the endpoint variant.
const LIST_KEYS: &[&str] = &["realtimePosition", "realtimePositionList"];

/// Default pagination window, `[0, 100)`.
pub const DEFAULT_WINDOW: (u32, u32) = (0, 100);

/// Client for the Seoul realtime subway position service.
///
/// Requests look like
/// `{base}/{api_key}/json/realtimePosition/{start}/{end}/{line_name}`.
pub struct SeoulMetroClient<C> {
    http: C,
    base_url: String,
    api_key: String,
    window: (u32, u32),
}

impl<C: HttpClient> SeoulMetroClient<C> {
    pub fn new(http: C, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            window: DEFAULT_WINDOW,
        }
    }

    pub fn from_config(http: C, config: &ApiConfig) -> Self {
        Self::new(http, &config.base_url, &config.api_key)
    }

    pub fn with_window(mut self, start: u32, end: u32) -> Self {
        self.window = (start, end);
        self
    }

    pub fn position_url(&self, line_name: &str) -> String {
        format!(
            "{}/{}/json/realtimePosition/{}/{}/{}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            self.window.0,
            self.window.1,
            urlencoding::encode(line_name)
        )
    }

    /// The request URL with the key masked, for logs.
    pub fn redacted_url(&self, line_name: &str) -> String {
        self.position_url(line_name)
            .replace(urlencoding::encode(&self.api_key).as_ref(), "***KEY***")
    }

    async fn fetch(&self, line_name: &str) -> Result<Vec<Value>, FetchError> {
        let url = Url::parse(&self.position_url(line_name))
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        let bytes = get_bytes(&self.http, url).await?;
        debug!(bytes = bytes.len(), "Position response received");

        let body: Value = serde_json::from_slice(&bytes)?;
        extract_positions(body)
    }
}

/// Pulls the position array out of a decoded response body.
pub fn extract_positions(mut body: Value) -> Result<Vec<Value>, FetchError> {
    for key in LIST_KEYS {
        if let Some(Value::Array(items)) = body.get_mut(*key).map(Value::take) {
            return Ok(items);
        }
    }

    Err(FetchError::NoPositionList {
        message: response_message(&body),
    })
}

/// The service reports "no data" and errors either as a top-level `message`
/// or nested under `RESULT.MESSAGE`.
fn response_message(body: &Value) -> Option<String> {
    body.get("message")
        .or_else(|| body.get("RESULT").and_then(|r| r.get("MESSAGE")))
        .or_else(|| body.get("errorMessage").and_then(|r| r.get("message")))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl<C: HttpClient> PositionApi for SeoulMetroClient<C> {
    #[tracing::instrument(skip(self))]
    async fn realtime_positions(&self, line_name: &str) -> Result<Vec<Value>, FetchError> {
        debug!(url = %self.redacted_url(line_name), "Requesting positions");
        let result = self.fetch(line_name).await;

        match &result {
            Ok(items) => debug!(count = items.len(), "Positions fetched"),
            Err(FetchError::NoPositionList { message }) => {
                warn!(message = message.as_deref().unwrap_or(""), "No position data for line")
            }
            Err(e) => error!(error = %e, "Position fetch failed"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StubClient;
    use serde_json::json;

    fn client(stub: &StubClient) -> SeoulMetroClient<&StubClient> {
        SeoulMetroClient::new(stub, "http://swopenAPI.seoul.go.kr/api/subway/", "KEY123")
    }

    #[test]
    fn test_position_url_encodes_line_name() {
        let stub = StubClient::new();
        let url = client(&stub).position_url("2호선");
        assert_eq!(
            url,
            "http://swopenAPI.seoul.go.kr/api/subway/KEY123/json/realtimePosition/0/100/2%ED%98%B8%EC%84%A0"
        );
    }

    #[test]
    fn test_window_and_redaction() {
        let stub = StubClient::new();
        let c = client(&stub).with_window(0, 5);
        let url = c.redacted_url("1호선");
        assert!(url.contains("/***KEY***/json/realtimePosition/0/5/"));
        assert!(!url.contains("KEY123"));
    }

    #[tokio::test]
    async fn test_reads_either_list_key() {
        for key in ["realtimePosition", "realtimePositionList"] {
            let body = json!({ key: [{"trainNo": "1"}, {"trainNo": "2"}] }).to_string();
            let stub = StubClient::new().respond(200, body);
            let items = client(&stub).realtime_positions("2호선").await.unwrap();
            assert_eq!(items.len(), 2, "key {key}");
            assert!(stub.requests()[0].url.ends_with("/0/100/2%ED%98%B8%EC%84%A0"));
        }
    }

    #[tokio::test]
    async fn test_missing_list_keeps_service_message() {
        let body = json!({"status": 500, "code": "INFO-200", "message": "해당하는 데이터가 없습니다."});
        let stub = StubClient::new().respond(200, body.to_string());
        let err = client(&stub).realtime_positions("2호선").await.unwrap_err();
        match err {
            FetchError::NoPositionList { message } => {
                assert_eq!(message.as_deref(), Some("해당하는 데이터가 없습니다."))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_nested_result_message() {
        let body = json!({"RESULT": {"CODE": "INFO-100", "MESSAGE": "인증키가 유효하지 않습니다."}});
        let err = extract_positions(body).unwrap_err();
        assert!(err.to_string().contains("인증키가 유효하지 않습니다."));
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let stub = StubClient::new().respond(200, "<html>maintenance</html>");
        let err = client(&stub).realtime_positions("2호선").await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_http_error_is_transport_error() {
        let stub = StubClient::new().respond(503, "unavailable");
        let err = client(&stub).realtime_positions("2호선").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[test]
    fn test_list_key_with_wrong_type_is_no_data() {
        let err = extract_positions(json!({"realtimePositionList": null})).unwrap_err();
        assert!(matches!(err, FetchError::NoPositionList { message: None }));
    }
}
