//! Robots.txt policy
//!
//! Parses robots.txt into per-agent disallow rules and answers the questions
//! the crawlability score needs: is an agent blocked from the whole site, and
//! which paths does it lose.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

use crate::error::PolicyUnavailable;
use crate::fetch::Fetcher;

/// Wildcard agent, applies to every crawler.
pub const WILDCARD: &str = "*";

/// Search crawler whose full block zeroes crawlability.
pub const GOOGLEBOT: &str = "googlebot";

/// OpenAI's crawler.
pub const GPTBOT: &str = "gptbot";

/// AI products and the robots.txt agent each one crawls as.
pub const AI_AGENTS: &[(&str, &str)] = &[
    ("ChatGPT", GPTBOT),
    ("Gemini", "gemini"),
    ("Perplexity", "perplexity"),
];

/// Disallow rules keyed by lower-cased agent name. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    rules: BTreeMap<String, Vec<String>>,
    sitemaps: Vec<String>,
    unavailable: Option<PolicyUnavailable>,
}

/// What one agent may crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAccess {
    pub allowed: bool,
    pub disallowed_paths: Vec<String>,
}

impl AgentAccess {
    /// 100 for unrestricted access, 70 when some paths are disallowed, 0 when
    /// the agent is blocked.
    pub fn score(&self) -> u8 {
        match (self.allowed, self.disallowed_paths.is_empty()) {
            (true, true) => 100,
            (true, false) => 70,
            (false, _) => 0,
        }
    }
}

/// Serialized robots.txt findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotsTxtReport {
    pub accessible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub sitemap_urls: Vec<String>,
    pub gptbot_blocked: bool,
    pub googlebot_blocked: bool,
    pub chatbot_access: BTreeMap<String, AgentAccess>,
}

impl RobotsPolicy {
    /// Parse robots.txt content
    pub fn parse(content: &str) -> Self {
        let mut policy = RobotsPolicy::default();
        let mut current_agent: Option<String> = None;

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    let agent = value.to_lowercase();
                    policy.rules.entry(agent.clone()).or_default();
                    current_agent = Some(agent);
                }
                "disallow" => {
                    if value.is_empty() {
                        continue;
                    }
                    if let Some(agent) = &current_agent {
                        let paths = policy.rules.entry(agent.clone()).or_default();
                        if !paths.iter().any(|p| p == value) {
                            paths.push(value.to_string());
                        }
                    }
                }
                "sitemap" => {
                    if !value.is_empty() {
                        policy.sitemaps.push(value.to_string());
                    }
                }
                _ => {}
            }
        }

        policy
    }

    /// A policy for a robots.txt that could not be read. Nothing is blocked.
    pub fn unavailable(reason: PolicyUnavailable) -> Self {
        Self {
            unavailable: Some(reason),
            ..Default::default()
        }
    }

    pub fn is_accessible(&self) -> bool {
        self.unavailable.is_none()
    }

    pub fn unavailable_reason(&self) -> Option<&PolicyUnavailable> {
        self.unavailable.as_ref()
    }

    /// Sitemap URLs in order of appearance.
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    /// Agent-specific disallows followed by wildcard disallows, deduplicated.
    pub fn disallowed_paths(&self, agent: &str) -> Vec<String> {
        let agent = agent.to_lowercase();
        let mut paths: Vec<String> = Vec::new();

        let specific = self.rules.get(&agent).into_iter().flatten();
        let wildcard = self.rules.get(WILDCARD).into_iter().flatten();
        for path in specific.chain(wildcard) {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        paths
    }

    /// True iff `/` is disallowed for `agent` or for `*`.
    pub fn is_blocked(&self, agent: &str) -> bool {
        self.disallowed_paths(agent).iter().any(|p| p == "/")
    }

    pub fn access_for(&self, agent: &str) -> AgentAccess {
        let disallowed_paths = self.disallowed_paths(agent);
        AgentAccess {
            allowed: !disallowed_paths.iter().any(|p| p == "/"),
            disallowed_paths,
        }
    }

    /// Access per tracked AI product.
    pub fn ai_access(&self) -> BTreeMap<String, AgentAccess> {
        AI_AGENTS
            .iter()
            .map(|(product, agent)| (product.to_string(), self.access_for(agent)))
            .collect()
    }

    pub fn report(&self) -> RobotsTxtReport {
        RobotsTxtReport {
            accessible: self.is_accessible(),
            error: self.unavailable.as_ref().map(|e| e.to_string()),
            sitemap_urls: self.sitemaps.clone(),
            gptbot_blocked: self.is_blocked(GPTBOT),
            googlebot_blocked: self.is_blocked(GOOGLEBOT),
            chatbot_access: self.ai_access(),
        }
    }
}

/// URL of the robots.txt governing `root`.
pub fn robots_url(root: &Url) -> Url {
    let mut url = root.clone();
    url.set_path("/robots.txt");
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// Fetch and parse the site's robots.txt, failing open.
pub async fn fetch_policy(fetcher: &dyn Fetcher, root: &Url) -> RobotsPolicy {
    let url = robots_url(root);

    match fetcher.fetch(&url).await {
        Ok(response) if response.is_success() => {
            tracing::debug!(url = %url, "robots.txt fetched");
            RobotsPolicy::parse(&response.body)
        }
        Ok(response) => {
            tracing::info!(url = %url, status = response.status, "robots.txt not available");
            RobotsPolicy::unavailable(PolicyUnavailable::Status(response.status))
        }
        Err(err) => {
            tracing::warn!(url = %url, error = %err, "robots.txt fetch failed");
            RobotsPolicy::unavailable(err.into())
        }
    }
}
