//! Audit configuration
//!
//! [`AuditConfig`] holds the engine knobs; [`Settings`] reads them, plus the
//! collaborator credential, from the environment once at process start.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigurationError;

pub const DEFAULT_USER_AGENT: &str = "AEO-AuditBot/1.0 (+https://github.com/pondevelopment/aeolens)";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
/// Largest page budget a single API request may ask for.
pub const DEFAULT_MAX_REQUEST_PAGES: usize = 50;

/// Paragraph and list thresholds for the snippet-optimization score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetThresholds {
    /// Site-average paragraph words above which a point is deducted
    pub avg_paragraph: usize,
    /// Longest paragraph words above which a point is deducted
    pub max_paragraph: usize,
    /// Minimum share of evaluated pages that should contain a list
    pub min_listed_pages_ratio: f64,
}

impl Default for SnippetThresholds {
    fn default() -> Self {
        Self {
            avg_paragraph: 60,
            max_paragraph: 120,
            min_listed_pages_ratio: 0.5,
        }
    }
}

/// Engine configuration for one audit.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub max_pages: usize,
    pub timeout: Duration,
    pub user_agent: String,
    pub snippet: SnippetThresholds,
    /// In-flight requests per site and competitor audits in flight
    pub concurrency: usize,
    pub max_retries: u32,
    /// First retry delay, doubled per attempt
    pub retry_backoff: Duration,
    /// Sub-score gap a competitor must exceed to count as an advantage
    pub comparison_threshold: u8,
    pub max_competitors: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_pages: 10,
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            snippet: SnippetThresholds::default(),
            concurrency: 4,
            max_retries: 3,
            retry_backoff: Duration::from_millis(300),
            comparison_threshold: 1,
            max_competitors: 5,
        }
    }
}

impl AuditConfig {
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_snippet_thresholds(mut self, snippet: SnippetThresholds) -> Self {
        self.snippet = snippet;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = backoff;
        self
    }

    pub fn with_comparison_threshold(mut self, threshold: u8) -> Self {
        self.comparison_threshold = threshold;
        self
    }
}

/// Process-wide settings read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub audit: AuditConfig,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub bind_addr: String,
    pub max_request_pages: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            audit: AuditConfig::default(),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_request_pages: DEFAULT_MAX_REQUEST_PAGES,
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read the environment.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            tracing::warn!(error = %e, "Failed to load .env file");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        let mut audit = AuditConfig::default();

        if let Some(max_pages) = parse_var::<usize>(&lookup, "AEO_MAX_PAGES")? {
            audit = audit.with_max_pages(max_pages);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "AEO_TIMEOUT_SECS")? {
            audit = audit.with_timeout(Duration::from_secs(secs));
        }
        if let Some(concurrency) = parse_var::<usize>(&lookup, "AEO_CONCURRENCY")? {
            audit = audit.with_concurrency(concurrency);
        }
        if let Some(user_agent) = non_empty(&lookup, "AEO_USER_AGENT") {
            audit = audit.with_user_agent(user_agent);
        }

        settings.audit = audit;
        settings.gemini_api_key = non_empty(&lookup, "GEMINI_API_KEY");
        if let Some(model) = non_empty(&lookup, "GEMINI_MODEL") {
            settings.gemini_model = model;
        }
        if let Some(addr) = non_empty(&lookup, "AEO_BIND_ADDR") {
            settings.bind_addr = addr;
        }
        if let Some(max_pages) = parse_var::<usize>(&lookup, "AEO_MAX_REQUEST_PAGES")? {
            settings.max_request_pages = max_pages.max(1);
        }

        Ok(settings)
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigurationError> {
    match non_empty(lookup, key) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigurationError::InvalidValue { key, value }),
        None => Ok(None),
    }
}
