//! Environment-driven configuration.
//!
//! A [`Config`] is built once at startup and handed to the components that
//! need it. Nothing else in the crate reads the process environment.

use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://swopenAPI.seoul.go.kr/api/subway";

/// Lines polled when `TARGET_LINES` is not set.
pub const DEFAULT_TARGET_LINES: &[&str] = &[
    "1호선",
    "2호선",
    "3호선",
    "4호선",
    "5호선",
    "6호선",
    "7호선",
    "8호선",
    "9호선",
    "신분당선",
    "경의중앙선",
    "공항철도",
];

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set in environment variables.")]
    Missing(&'static str),
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Where position rows are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// A SQLite database reached through sqlx, e.g. `sqlite://subway.db`.
    Sql { database_url: String },
    /// A PostgREST endpoint (Supabase) authenticated with a service key.
    Rest { url: String, key: String },
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// `DATABASE_URL` wins when set; otherwise both Supabase variables are required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(database_url) = non_blank(&lookup, "DATABASE_URL") {
            return Ok(StoreConfig::Sql { database_url });
        }

        let url = non_blank(&lookup, "SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let key = non_blank(&lookup, "SUPABASE_KEY").ok_or(ConfigError::Missing("SUPABASE_KEY"))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                var: "SUPABASE_URL",
                reason: format!("expected an http(s) URL, got {url:?}"),
            });
        }

        Ok(StoreConfig::Rest {
            url: url.trim_end_matches('/').to_string(),
            key,
        })
    }

    /// Short backend name for log fields.
    pub fn backend(&self) -> &'static str {
        match self {
            StoreConfig::Sql { .. } => "sql",
            StoreConfig::Rest { .. } => "rest",
        }
    }
}

/// Upstream API access.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub base_url: String,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = non_blank(&lookup, "SEOUL_API_KEY")
            .or_else(|| non_blank(&lookup, "SUBWAY_API_KEY"))
            .ok_or(ConfigError::Missing("SEOUL_API_KEY"))?;

        let base_url = non_blank(&lookup, "SEOUL_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(ApiConfig { api_key, base_url })
    }
}

/// Settings for the collection daemon.
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub target_lines: Vec<String>,
    pub store: StoreConfig,
    pub poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api = ApiConfig::from_lookup(&lookup)?;
        let store = StoreConfig::from_lookup(&lookup)?;

        let target_lines = match non_blank(&lookup, "TARGET_LINES") {
            Some(raw) => {
                let lines: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();
                if lines.is_empty() {
                    return Err(ConfigError::Invalid {
                        var: "TARGET_LINES",
                        reason: "no line names listed".to_string(),
                    });
                }
                lines
            }
            None => DEFAULT_TARGET_LINES.iter().map(|l| l.to_string()).collect(),
        };

        Ok(Config {
            api,
            target_lines,
            store,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

fn non_blank<F>(lookup: &F, var: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
