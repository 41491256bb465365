use crate::config::types::UpstreamConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{redirect, StatusCode};
use thiserror::Error;

/// Characters of an error body kept for diagnostics.
const SNIPPET_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Supervisor request failed: {kind}")]
    Unavailable { kind: &'static str, detail: String },

    #[error("Supervisor returned {status}: {snippet}")]
    BadStatus { status: u16, snippet: String },

    #[error("invalid supervisor token: {0}")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl UpstreamError {
    fn unavailable(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "Timeout"
        } else if err.is_connect() {
            "ConnectError"
        } else if err.is_body() || err.is_decode() {
            "ReadError"
        } else {
            "RequestError"
        };
        Self::Unavailable {
            kind,
            detail: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Source of raw log text, addressed by an upstream path.
#[async_trait]
pub trait LogFetcher: Send + Sync {
    /// Fetch the most recent `count` lines served at `path`.
    async fn fetch_lines(&self, path: &str, count: usize) -> Result<String>;
}

/// HTTP client for the supervisor's log endpoints.
#[derive(Debug, Clone)]
pub struct SupervisorClient {
    base_url: String,
    no_colors: bool,
    client: reqwest::Client,
}

impl SupervisorClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(UpstreamError::Client)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            no_colors: config.no_colors,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LogFetcher for SupervisorClient {
    async fn fetch_lines(&self, path: &str, count: usize) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        let mut query = vec![("lines", count.to_string())];
        if self.no_colors {
            query.push(("no_colors", "1".to_string()));
        }

        tracing::debug!(%url, lines = count, "Fetching upstream logs");

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(%url, error = %e, "Supervisor request failed");
                UpstreamError::unavailable(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(UpstreamError::unavailable)?;

        if status != StatusCode::OK {
            tracing::warn!(%url, status = status.as_u16(), "Supervisor returned error status");
            return Err(UpstreamError::BadStatus {
                status: status.as_u16(),
                snippet: body.chars().take(SNIPPET_CHARS).collect(),
            });
        }

        Ok(body)
    }
}
