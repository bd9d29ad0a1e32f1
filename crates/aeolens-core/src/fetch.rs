//! HTTP fetching
//!
//! The engine only sees the [`Fetcher`] trait. [`ReqwestFetcher`] is the
//! network implementation; tests substitute captured responses.

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use reqwest::header::CONTENT_TYPE;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

use crate::config::AuditConfig;
use crate::error::FetchError;

/// Statuses worth retrying.
const RETRY_STATUSES: &[u16] = &[500, 502, 503, 504];

/// A fetched response, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// URL that was requested
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
    }
}

/// Network access for the audit engine.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a single URL. Non-success statuses are returned as responses;
    /// only transport failures are errors.
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError>;
}

/// Reqwest-backed fetcher with a fixed user agent, per-request timeout and
/// retry on 5xx responses.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: ReqwestClient,
    max_retries: u32,
    retry_backoff: Duration,
}

impl ReqwestFetcher {
    pub fn new(config: &AuditConfig) -> Result<Self, FetchError> {
        let client = ReqwestClient::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .pool_max_idle_per_host(config.concurrency)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FetchError::Network {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        })
    }

    async fn fetch_once(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        Ok(FetchResponse {
            url: url.to_string(),
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        let mut attempt = 0;
        loop {
            let response = self.fetch_once(url).await?;
            if !RETRY_STATUSES.contains(&response.status) || attempt >= self.max_retries {
                return Ok(response);
            }

            let backoff = self.retry_backoff * 2u32.saturating_pow(attempt);
            attempt += 1;
            tracing::debug!(
                url = %url,
                status = response.status,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                "Retrying after server error"
            );
            tokio::time::sleep(backoff).await;
        }
    }
}

/// Replays a fixed set of responses keyed by URL. Unknown URLs answer 404.
///
/// Audits over the same captured set are deterministic.
#[derive(Debug, Default)]
pub struct CapturedFetcher {
    responses: HashMap<String, Result<FetchResponse, FetchError>>,
    requested: Mutex<Vec<String>>,
}

impl CapturedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(
        mut self,
        url: &str,
        status: u16,
        content_type: Option<&str>,
        body: &str,
    ) -> Self {
        self.responses.insert(
            url.to_string(),
            Ok(FetchResponse {
                url: url.to_string(),
                status,
                content_type: content_type.map(str::to_string),
                body: body.to_string(),
            }),
        );
        self
    }

    pub fn with_html(self, url: &str, body: &str) -> Self {
        self.with_response(url, 200, Some("text/html; charset=utf-8"), body)
    }

    pub fn with_text(self, url: &str, body: &str) -> Self {
        self.with_response(url, 200, Some("text/plain"), body)
    }

    pub fn with_xml(self, url: &str, body: &str) -> Self {
        self.with_response(url, 200, Some("application/xml"), body)
    }

    pub fn with_error(mut self, url: &str, error: FetchError) -> Self {
        self.responses.insert(url.to_string(), Err(error));
        self
    }

    /// URLs fetched so far, in request order.
    pub fn requested(&self) -> Vec<String> {
        self.requested
            .lock()
            .map(|urls| urls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Fetcher for CapturedFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(url.to_string());
        }

        match self.responses.get(url.as_str()) {
            Some(captured) => captured.clone(),
            None => Ok(FetchResponse {
                url: url.to_string(),
                status: 404,
                content_type: Some("text/html".to_string()),
                body: String::new(),
            }),
        }
    }
}

fn classify(url: &Url, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
