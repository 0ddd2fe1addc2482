use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue, InvalidHeaderValue};

/// An [`HttpClient`] wrapper that injects API-key headers into every request.
///
/// Header values are validated once at construction so request execution
/// cannot fail on a bad key.
pub struct ApiKey<C> {
    inner: C,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl<C> ApiKey<C> {
    /// PostgREST/Supabase style: the key goes out both as `apikey` and as
    /// `Authorization: Bearer <key>`.
    pub fn supabase(inner: C, key: &str) -> Result<Self, InvalidHeaderValue> {
        Ok(Self {
            inner,
            headers: vec![
                (HeaderName::from_static("apikey"), sensitive(key)?),
                (AUTHORIZATION, sensitive(&format!("Bearer {key}"))?),
            ],
        })
    }
}

fn sensitive(value: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(value)?;
    value.set_sensitive(true);
    Ok(value)
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        for (name, value) in &self.headers {
            req.headers_mut().insert(name.clone(), value.clone());
        }
        self.inner.execute(req).await
    }
}
