//! Error types for the audit engine
//!
//! Every failure below the audit root is recoverable: callers record it and
//! carry on with partial results. Only [`AuditError`] ends an audit.

use thiserror::Error;

/// A network-level failure while fetching one URL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("failed to read response body from {url}: {message}")]
    Body { url: String, message: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Timeout { url }
            | FetchError::Network { url, .. }
            | FetchError::Body { url, .. } => url,
        }
    }
}

/// Malformed markup or payload. The affected block or page is skipped.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid selector {selector}: {message}")]
    Selector { selector: String, message: String },

    #[error("not an XML document")]
    NotXml,
}

/// Why a robots.txt policy could not be read. Policies fail open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyUnavailable {
    #[error("robots.txt returned status {0}")]
    Status(u16),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// A collaborator needed a credential or value that was not configured.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Failure of an external AI collaborator. Always replaced by an empty result.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("collaborator request failed: {0}")]
    Transport(String),

    #[error("collaborator returned status {0}")]
    Status(u16),

    #[error("malformed collaborator response: {0}")]
    MalformedResponse(String),
}

/// Top-level audit failure.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("invalid URL {input}: {message}")]
    InvalidUrl { input: String, message: String },

    #[error("site root is unreachable: {0}")]
    RootUnreachable(#[from] FetchError),

    #[error("site root {url} returned status {status}")]
    RootStatus { url: String, status: u16 },
}

pub type Result<T, E = AuditError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_exposes_url() {
        let err = FetchError::Timeout {
            url: "https://example.com/".to_string(),
        };
        assert_eq!(err.url(), "https://example.com/");
        assert_eq!(err.to_string(), "request to https://example.com/ timed out");
    }

    #[test]
    fn policy_unavailable_wraps_fetch_error() {
        let err: PolicyUnavailable = FetchError::Network {
            url: "https://example.com/robots.txt".to_string(),
            message: "connection refused".to_string(),
        }
        .into();
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn configuration_error_converts_into_collaborator_error() {
        let err: CollaboratorError = ConfigurationError::MissingCredential("GEMINI_API_KEY").into();
        assert!(matches!(err, CollaboratorError::Configuration(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
