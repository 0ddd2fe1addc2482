mod client;
mod basic;
pub mod auth;

pub use client::HttpClient;
pub use basic::BasicClient;

use reqwest::{Method, Url};

/// Issues a GET and returns the body bytes of a successful (2xx) response.
pub async fn get_bytes<C: HttpClient + ?Sized>(client: &C, url: Url) -> reqwest::Result<Vec<u8>> {
    let req = reqwest::Request::new(Method::GET, url);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Canned-response client for unit tests.

    use super::HttpClient;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub struct SentRequest {
        pub method: String,
        pub url: String,
        pub headers: Vec<(String, String)>,
        pub body: Option<Vec<u8>>,
    }

    impl SentRequest {
        pub fn header(&self, name: &str) -> Option<String> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone())
        }

        pub fn json_body(&self) -> serde_json::Value {
            serde_json::from_slice(self.body.as_deref().unwrap_or_default()).unwrap()
        }
    }

    /// Replies with queued `(status, body)` pairs in order; once the queue is
    /// drained every further request gets `200 []`.
    #[derive(Default)]
    pub struct StubClient {
        responses: Mutex<VecDeque<(u16, String)>>,
        sent: Mutex<Vec<SentRequest>>,
    }

    impl StubClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push_back((status, body.into()));
            self
        }

        pub fn requests(&self) -> Vec<SentRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for StubClient {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            self.sent.lock().unwrap().push(SentRequest {
                method: req.method().to_string(),
                url: req.url().to_string(),
                headers: req
                    .headers()
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
                    .collect(),
                body: req.body().and_then(|b| b.as_bytes()).map(|b| b.to_vec()),
            });

            let (status, body) = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or((200, "[]".to_string()));

            let resp = http::Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(body)
                .unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }
}
