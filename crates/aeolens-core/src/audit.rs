//! Audit pipelines
//!
//! [`AuditContext`] carries everything an audit needs (fetcher, config and
//! the optional AI advisor) and is passed explicitly to every pipeline.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use url::Url;

use crate::advisor::{Advisor, GeminiAdvisor, Optimization};
use crate::config::{AuditConfig, Settings};
use crate::discovery::{DiscoverySet, discover_pages};
use crate::error::{AuditError, ConfigurationError, FetchError, Result};
use crate::fetch::{FetchResponse, Fetcher, ReqwestFetcher};
use crate::page::{PageEvaluation, SiteDescription, analyze_page, extract_site_description};
use crate::ranking::{CompetitorAnalysis, CompetitorSummary, SiteScore};
use crate::robots_txt::{RobotsPolicy, fetch_policy};
use crate::scoring::{
    ContentSummary, CrawlSignals, aeo_schemas, composite, crawlability_score,
    featured_snippet_readiness, merge_schema_counts, model_scores, snippet_score,
    structured_data_score,
};
use crate::types::{
    AuditResult, CompetitorReport, CrawlabilityReport, FullReport, OverallFindings, PageError,
    Recommendations, ReportStatus, SitemapReport, SnippetOptimizationReport, StructuredDataReport,
};
use crate::url_utils::site_root;

/// Shared state for audits. Cheap to clone.
#[derive(Clone)]
pub struct AuditContext {
    fetcher: Arc<dyn Fetcher>,
    config: AuditConfig,
    advisor: Option<Arc<dyn Advisor>>,
}

impl AuditContext {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: AuditConfig) -> Self {
        Self {
            fetcher,
            config,
            advisor: None,
        }
    }

    /// Network fetcher plus a Gemini advisor when a credential is configured.
    pub fn from_settings(settings: &Settings) -> std::result::Result<Self, FetchError> {
        let fetcher = ReqwestFetcher::new(&settings.audit)?;
        let mut context = Self::new(Arc::new(fetcher), settings.audit.clone());

        match GeminiAdvisor::from_settings(settings) {
            Ok(advisor) => context = context.with_advisor(Arc::new(advisor)),
            Err(err) => tracing::info!(error = %err, "AI advisor disabled"),
        }
        Ok(context)
    }

    pub fn with_advisor(mut self, advisor: Arc<dyn Advisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    /// Same fetcher and advisor with a different page budget.
    pub fn with_max_pages(&self, max_pages: usize) -> Self {
        let mut context = self.clone();
        context.config = context.config.with_max_pages(max_pages);
        context
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    /// The AI advisor, or the missing credential that disabled it.
    pub fn advisor(&self) -> std::result::Result<&dyn Advisor, ConfigurationError> {
        self.advisor
            .as_deref()
            .ok_or(ConfigurationError::MissingCredential("GEMINI_API_KEY"))
    }
}

enum PageOutcome {
    Evaluated(PageEvaluation),
    Skipped,
    Failed(PageError),
}

/// Audit one site.
///
/// Only an invalid URL or an unreachable root page fails the audit. Every
/// other failure is recorded in the result.
pub async fn run_audit(ctx: &AuditContext, url: &str) -> Result<AuditResult> {
    let root = site_root(url)?;
    let fetcher = ctx.fetcher();
    let config = ctx.config();

    let policy = fetch_policy(fetcher, &root).await;

    let root_page = fetcher.fetch(&root).await?;
    if !root_page.is_success() {
        return Err(AuditError::RootStatus {
            url: root.to_string(),
            status: root_page.status,
        });
    }

    let discovery = discover_pages(fetcher, &root, &policy, &root_page.body, config.max_pages).await;

    let root_page = &root_page;
    let page_jobs: Vec<_> = discovery
        .pages()
        .iter()
        .map(|page_url| async move {
            // Root body was fetched above
            if page_url.as_str() == root_page.url {
                evaluate(page_url, Ok(root_page.clone()))
            } else {
                evaluate(page_url, fetcher.fetch(page_url).await)
            }
        })
        .collect();
    let outcomes: Vec<PageOutcome> = stream::iter(page_jobs)
        .buffered(config.concurrency.max(1))
        .collect()
        .await;

    let mut pages = Vec::new();
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            PageOutcome::Evaluated(page) => pages.push(page),
            PageOutcome::Failed(error) => errors.push(error),
            PageOutcome::Skipped => {}
        }
    }

    let result = score_site(&root, &policy, &discovery, pages, errors, config);
    tracing::info!(
        url = %root,
        pages = result.snippet_optimization.pages_evaluated.len(),
        errors = result.structured_data.pages_with_errors.len(),
        score = result.aeo_score_pct,
        "Audit complete"
    );
    Ok(result)
}

fn evaluate(url: &Url, response: std::result::Result<FetchResponse, FetchError>) -> PageOutcome {
    match response {
        Ok(response) if response.is_success() && response.is_html() => {
            PageOutcome::Evaluated(analyze_page(url.as_str(), &response.body))
        }
        Ok(response) => {
            tracing::debug!(
                url = %url,
                status = response.status,
                content_type = response.content_type.as_deref().unwrap_or(""),
                "Skipping page"
            );
            PageOutcome::Skipped
        }
        Err(err) => {
            tracing::warn!(url = %url, error = %err, "Page fetch failed");
            PageOutcome::Failed(PageError {
                url: url.to_string(),
                error: err.to_string(),
            })
        }
    }
}

fn score_site(
    root: &Url,
    policy: &RobotsPolicy,
    discovery: &DiscoverySet,
    pages: Vec<PageEvaluation>,
    errors: Vec<PageError>,
    config: &AuditConfig,
) -> AuditResult {
    let summary = ContentSummary::from_pages(&pages);
    let schema_counts = merge_schema_counts(&pages);
    let aeo_found = aeo_schemas(&schema_counts);

    let structured = structured_data_score(&schema_counts);
    let snippet = snippet_score(&summary, &config.snippet);
    let robots_txt = policy.report();
    let crawl = crawlability_score(&CrawlSignals {
        robots_accessible: robots_txt.accessible,
        googlebot_blocked: robots_txt.googlebot_blocked,
        gptbot_blocked: robots_txt.gptbot_blocked,
        sitemap_found: discovery.sitemap_found(),
    });
    let readiness = featured_snippet_readiness(&summary, !aeo_found.is_empty());
    let total = composite(structured.score, snippet.score, crawl.score);
    let model_scores = model_scores(&robots_txt.chatbot_access);

    let overall_findings = OverallFindings {
        avg_paragraph: summary.avg_paragraph(),
        max_paragraph: summary.max_paragraph,
        pages_with_lists: summary.pages_with_lists,
        pages_with_questions: summary.pages_with_questions,
        total_pages: summary.total_pages,
        evaluated_urls: pages.iter().map(|p| p.url.clone()).collect(),
        readability_score: snippet.readability_bonus,
    };

    AuditResult {
        url: root.to_string(),
        structured_data: StructuredDataReport {
            score: structured.score,
            schema_types_found: schema_counts,
            aeo_schemas_found: aeo_found,
            issues: structured.issues,
            pages_with_errors: errors,
        },
        snippet_optimization: SnippetOptimizationReport {
            score: snippet.score,
            overall_findings,
            featured_snippet_readiness: readiness,
            pages_evaluated: pages,
            issues: snippet.issues,
        },
        crawlability: CrawlabilityReport {
            score: crawl.score,
            robots_txt,
            sitemap: SitemapReport {
                found: discovery.sitemap_found(),
                sitemap_url: discovery.sitemap_url().map(Url::to_string),
                urls_analyzed: discovery.pages().iter().map(Url::to_string).collect(),
            },
            issues: crawl.issues,
        },
        aeo_score_raw: total.raw,
        aeo_score_pct: total.percentage,
        model_scores,
    }
}

/// Recommendations for `audit`, empty when the advisor is missing or fails.
pub async fn recommend(ctx: &AuditContext, audit: &AuditResult) -> Vec<Optimization> {
    let advisor = match ctx.advisor() {
        Ok(advisor) => advisor,
        Err(err) => {
            tracing::debug!(error = %err, "Skipping recommendations");
            return Vec::new();
        }
    };

    let audit_json = match serde_json::to_value(audit) {
        Ok(json) => json,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to serialize audit for recommendations");
            return Vec::new();
        }
    };

    match advisor.summarize(&audit_json).await {
        Ok(optimizations) => optimizations,
        Err(err) => {
            tracing::warn!(error = %err, "Recommendations unavailable");
            Vec::new()
        }
    }
}

/// Audit plus AI recommendations.
pub async fn run_full_pipeline(ctx: &AuditContext, url: &str) -> Result<FullReport> {
    let audit = run_audit(ctx, url).await?;
    let optimizations = recommend(ctx, &audit).await;

    Ok(FullReport {
        model_scores: audit.model_scores.clone(),
        audit_report: audit,
        optimization_recommendations: Recommendations { optimizations },
    })
}

/// Title and description of the site at `url`. Empty on any failure.
pub async fn fetch_site_description(ctx: &AuditContext, url: &str) -> SiteDescription {
    let Ok(root) = site_root(url) else {
        return SiteDescription::default();
    };

    match ctx.fetcher().fetch(&root).await {
        Ok(response) if response.is_success() => extract_site_description(&response.body),
        Ok(response) => {
            tracing::debug!(url = %root, status = response.status, "No site description");
            SiteDescription::default()
        }
        Err(err) => {
            tracing::debug!(url = %root, error = %err, "No site description");
            SiteDescription::default()
        }
    }
}

/// Competitor URLs for the site, empty when the advisor is missing or fails.
pub async fn discover_competitors(
    ctx: &AuditContext,
    site_url: &str,
    site: &SiteDescription,
) -> Vec<String> {
    let advisor = match ctx.advisor() {
        Ok(advisor) => advisor,
        Err(err) => {
            tracing::debug!(error = %err, "Skipping competitor discovery");
            return Vec::new();
        }
    };

    match advisor.discover_competitors(site_url, site).await {
        Ok(mut urls) => {
            urls.truncate(ctx.config().max_competitors);
            urls
        }
        Err(err) => {
            tracing::warn!(error = %err, "Competitor discovery unavailable");
            Vec::new()
        }
    }
}

/// Full pipeline for the target, ranked against discovered competitors.
/// A competitor whose audit fails is left out of the ranking.
pub async fn run_with_competitors(ctx: &AuditContext, url: &str) -> Result<CompetitorReport> {
    let root = site_root(url)?;
    let target_domain = root.to_string();

    let link_details = fetch_site_description(ctx, &target_domain).await;
    let full = run_full_pipeline(ctx, &target_domain).await?;
    let competitor_urls = discover_competitors(ctx, &target_domain, &link_details).await;

    let competitor_jobs: Vec<_> = competitor_urls
        .into_iter()
        .map(|competitor_url| async move {
            let audit = run_audit(ctx, &competitor_url).await;
            (competitor_url, audit)
        })
        .collect();
    let audits: Vec<(String, Result<AuditResult>)> = stream::iter(competitor_jobs)
        .buffered(ctx.config().concurrency.max(1))
        .collect()
        .await;

    let competitors: Vec<CompetitorSummary> = audits
        .into_iter()
        .filter_map(|(competitor_url, audit)| match audit {
            Ok(audit) => Some(CompetitorSummary::from_audit(competitor_url, &audit)),
            Err(err) => {
                tracing::warn!(url = %competitor_url, error = %err, "Competitor audit failed");
                None
            }
        })
        .collect();

    let target = SiteScore::from_audit(target_domain.clone(), &full.audit_report);
    let competitor_analysis =
        CompetitorAnalysis::build(&target, competitors, ctx.config().comparison_threshold);

    Ok(CompetitorReport {
        status: ReportStatus::Success,
        target_domain,
        link_details,
        audit_report: full.audit_report.into(),
        optimization_recommendations: full.optimization_recommendations,
        competitor_analysis,
    })
}
