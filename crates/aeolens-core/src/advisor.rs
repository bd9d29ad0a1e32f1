//! AI collaborators
//!
//! Recommendations and competitor discovery come from an external text model.
//! Its replies are untrusted: they are deserialized strictly into the expected
//! shape and rejected on any mismatch. Callers treat every failure as an empty
//! result.

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::time::Duration;
use url::Url;

use crate::config::Settings;
use crate::error::{CollaboratorError, ConfigurationError};
use crate::page::SiteDescription;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_TIMEOUT: Duration = Duration::from_secs(60);

/// One suggested change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Optimization {
    pub description: String,
    #[serde(alias = "impact_level")]
    pub impact_level: String,
    pub category: String,
}

#[async_trait]
pub trait Recommender: Send + Sync {
    /// Suggest changes for the serialized audit.
    async fn summarize(&self, audit: &JsonValue) -> Result<Vec<Optimization>, CollaboratorError>;
}

#[async_trait]
pub trait CompetitorFinder: Send + Sync {
    /// Root URLs of sites competing with `site_url`.
    async fn discover_competitors(
        &self,
        site_url: &str,
        site: &SiteDescription,
    ) -> Result<Vec<String>, CollaboratorError>;
}

/// Both collaborator capabilities behind one handle.
pub trait Advisor: Recommender + CompetitorFinder {}

impl<T: Recommender + CompetitorFinder> Advisor for T {}

pub fn recommendation_prompt(audit: &JsonValue) -> Result<String, CollaboratorError> {
    let audit = serde_json::to_string_pretty(audit)
        .map_err(|e| CollaboratorError::MalformedResponse(e.to_string()))?;

    Ok(format!(
        r#"You are an Answer Engine Optimization (AEO) expert. Analyze the following AEO audit results JSON for a website and suggest the 10 most important changes to improve the site's AEO performance and rankings.
Each suggestion must be actionable, clear, specific, categorized, and prioritized.
Respond ONLY with valid JSON in this exact format:
{{"optimizations": [{{"description": "detailed description here", "impact_level": "High/Medium/Low", "category": "Structured Data/Snippet Optimization/Crawlability"}}]}}

Here is the AEO audit output:
{audit}
"#
    ))
}

pub fn competitor_prompt(site_url: &str, site: &SiteDescription) -> String {
    format!(
        r#"You are an expert in Answer Engine Optimization (AEO) competitor analysis.

Given this website:
- Domain: {site_url}
- Title: {title}
- Description: {description}

Identify exactly 5 direct competitors that:
1. Offer highly similar products or services
2. Operate in the same industry or niche
3. Target the same audience
4. Have strong AEO practices (rich structured data, optimized snippets, clear content hierarchy)

Respond ONLY with a JSON array of exactly 5 root URLs.
Example: ["https://competitor1.com", "https://competitor2.com", "https://competitor3.com", "https://competitor4.com", "https://competitor5.com"]
"#,
        title = site.title,
        description = site.description,
    )
}

#[derive(Deserialize)]
struct OptimizationsPayload {
    optimizations: Vec<Optimization>,
}

/// Strictly parse a recommendation reply.
pub fn parse_optimizations(text: &str) -> Result<Vec<Optimization>, CollaboratorError> {
    serde_json::from_str::<OptimizationsPayload>(text.trim())
        .map(|payload| payload.optimizations)
        .map_err(|e| CollaboratorError::MalformedResponse(e.to_string()))
}

/// Strictly parse a competitor reply, then keep http(s) URLs on other hosts
/// than the target, deduplicated and capped at `max`.
pub fn parse_competitor_urls(
    text: &str,
    site_url: &str,
    max: usize,
) -> Result<Vec<String>, CollaboratorError> {
    let candidates: Vec<String> = serde_json::from_str(text.trim())
        .map_err(|e| CollaboratorError::MalformedResponse(e.to_string()))?;

    let target_host = Url::parse(site_url)
        .ok()
        .and_then(|u| u.host_str().map(normalize_host));

    let mut urls: Vec<String> = Vec::new();
    let mut hosts: Vec<String> = Vec::new();
    for candidate in candidates {
        let Ok(url) = Url::parse(candidate.trim()) else {
            continue;
        };
        if !matches!(url.scheme(), "http" | "https") {
            continue;
        }
        let Some(host) = url.host_str().map(normalize_host) else {
            continue;
        };
        if target_host.as_deref() == Some(host.as_str()) || hosts.contains(&host) {
            continue;
        }
        hosts.push(host);
        urls.push(url.to_string());
        if urls.len() >= max {
            break;
        }
    }
    Ok(urls)
}

fn normalize_host(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiAdvisor {
    client: ReqwestClient,
    api_key: String,
    model: String,
    base_url: String,
    max_competitors: usize,
}

impl GeminiAdvisor {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, CollaboratorError> {
        let client = ReqwestClient::builder()
            .timeout(GEMINI_TIMEOUT)
            .build()
            .map_err(|e| CollaboratorError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
            max_competitors: 5,
        })
    }

    /// Build from settings. Fails without `GEMINI_API_KEY`.
    pub fn from_settings(settings: &Settings) -> Result<Self, CollaboratorError> {
        let api_key = settings
            .gemini_api_key
            .clone()
            .ok_or(ConfigurationError::MissingCredential("GEMINI_API_KEY"))?;
        Ok(Self::new(api_key, settings.gemini_model.clone())?
            .with_max_competitors(settings.audit.max_competitors))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_competitors(mut self, max: usize) -> Self {
        self.max_competitors = max;
        self
    }

    /// Send `prompt` and return the model's text reply.
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError> {
        let endpoint = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {"responseMimeType": "application/json"}
        });

        let response = self
            .client
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| CollaboratorError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Status(status.as_u16()));
        }

        let reply: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::MalformedResponse(e.without_url().to_string()))?;

        reply.text().ok_or_else(|| {
            CollaboratorError::MalformedResponse("reply has no candidate text".to_string())
        })
    }
}

#[async_trait]
impl Recommender for GeminiAdvisor {
    async fn summarize(&self, audit: &JsonValue) -> Result<Vec<Optimization>, CollaboratorError> {
        let prompt = recommendation_prompt(audit)?;
        let text = self.generate(&prompt).await?;
        parse_optimizations(&text)
    }
}

#[async_trait]
impl CompetitorFinder for GeminiAdvisor {
    async fn discover_competitors(
        &self,
        site_url: &str,
        site: &SiteDescription,
    ) -> Result<Vec<String>, CollaboratorError> {
        let text = self.generate(&competitor_prompt(site_url, site)).await?;
        parse_competitor_urls(&text, site_url, self.max_competitors)
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|part| part.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn gemini_reply(text: &str) -> JsonValue {
        json!({
            "candidates": [{"content": {"parts": [{"text": text}], "role": "model"}}]
        })
    }

    #[test]
    fn parses_optimizations_with_either_key_style() {
        let text = r#"{"optimizations": [
            {"description": "Add FAQ schema", "impact_level": "High", "category": "Structured Data"},
            {"description": "Shorten paragraphs", "impactLevel": "Medium", "category": "Snippet Optimization"}
        ]}"#;

        let optimizations = parse_optimizations(text).unwrap();
        assert_eq!(optimizations.len(), 2);
        assert_eq!(optimizations[0].impact_level, "High");
        assert_eq!(optimizations[1].impact_level, "Medium");

        let json = serde_json::to_value(&optimizations[0]).unwrap();
        assert_eq!(json["impactLevel"], "High");
    }

    #[test]
    fn rejects_prose_around_json() {
        let text = r#"Sure! Here you go: {"optimizations": []}"#;
        assert!(matches!(
            parse_optimizations(text),
            Err(CollaboratorError::MalformedResponse(_))
        ));
        assert!(parse_optimizations(r#"{"suggestions": []}"#).is_err());
    }

    #[test]
    fn competitor_urls_are_filtered_deduplicated_and_capped() {
        let text = r#"[
            "https://rival-one.com",
            "ftp://files.example.org",
            "not a url",
            "https://www.rival-one.com/",
            "https://www.target.com/",
            "http://rival-two.com/",
            "https://rival-three.com",
            "https://rival-four.com",
            "https://rival-five.com",
            "https://rival-six.com"
        ]"#;

        let urls = parse_competitor_urls(text, "https://target.com/", 5).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://rival-one.com/",
                "http://rival-two.com/",
                "https://rival-three.com/",
                "https://rival-four.com/",
                "https://rival-five.com/"
            ]
        );
    }

    #[test]
    fn competitor_reply_must_be_a_string_array() {
        assert!(parse_competitor_urls(r#"{"urls": []}"#, "https://t.com/", 5).is_err());
        assert!(parse_competitor_urls("[1, 2]", "https://t.com/", 5).is_err());
    }

    #[test]
    fn prompts_carry_their_inputs() {
        let site = SiteDescription {
            title: "Acme".to_string(),
            description: "Widgets".to_string(),
        };
        let prompt = competitor_prompt("https://acme.com/", &site);
        assert!(prompt.contains("- Domain: https://acme.com/"));
        assert!(prompt.contains("- Title: Acme"));
        assert!(prompt.contains("- Description: Widgets"));

        let prompt = recommendation_prompt(&json!({"aeoScorePct": 42.0})).unwrap();
        assert!(prompt.contains("\"aeoScorePct\": 42.0"));
        assert!(prompt.contains("10 most important changes"));
    }

    #[test]
    fn from_settings_requires_credential() {
        let err = GeminiAdvisor::from_settings(&Settings::default()).unwrap_err();
        assert!(matches!(
            err,
            CollaboratorError::Configuration(ConfigurationError::MissingCredential("GEMINI_API_KEY"))
        ));
    }

    #[tokio::test]
    async fn summarize_calls_generate_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/test-model:generateContent")
                    .query_param("key", "secret")
                    .body_contains("responseMimeType");
                then.status(200).json_body(gemini_reply(
                    r#"{"optimizations": [{"description": "Add HowTo schema", "impact_level": "High", "category": "Structured Data"}]}"#,
                ));
            })
            .await;

        let advisor = GeminiAdvisor::new("secret", "test-model")
            .unwrap()
            .with_base_url(server.base_url());
        let optimizations = advisor.summarize(&json!({"url": "https://a.com/"})).await.unwrap();

        mock.assert_async().await;
        assert_eq!(optimizations[0].description, "Add HowTo schema");
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/m:generateContent");
                then.status(429);
            })
            .await;

        let advisor = GeminiAdvisor::new("k", "m").unwrap().with_base_url(server.base_url());
        let result = advisor
            .discover_competitors("https://a.com/", &SiteDescription::default())
            .await;

        assert!(matches!(result, Err(CollaboratorError::Status(429))));
    }

    #[tokio::test]
    async fn empty_candidates_are_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/m:generateContent");
                then.status(200).json_body(json!({"candidates": []}));
            })
            .await;

        let advisor = GeminiAdvisor::new("k", "m").unwrap().with_base_url(server.base_url());
        let result = advisor.summarize(&json!({})).await;

        assert!(matches!(result, Err(CollaboratorError::MalformedResponse(_))));
    }
}
