//! Serialized report shapes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::advisor::Optimization;
use crate::page::{PageEvaluation, SiteDescription};
use crate::ranking::CompetitorAnalysis;
use crate::robots_txt::RobotsTxtReport;
use crate::scoring::{Issue, SchemaCounts};

/// A page that could not be fetched or analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageError {
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredDataReport {
    pub score: u8,
    pub schema_types_found: SchemaCounts,
    pub aeo_schemas_found: Vec<String>,
    pub issues: Vec<Issue>,
    pub pages_with_errors: Vec<PageError>,
}

/// Site-wide content findings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallFindings {
    pub avg_paragraph: usize,
    pub max_paragraph: usize,
    pub pages_with_lists: usize,
    pub pages_with_questions: usize,
    pub total_pages: usize,
    pub evaluated_urls: Vec<String>,
    /// Readability bonus (0-4) folded into the snippet score
    pub readability_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetOptimizationReport {
    pub score: u8,
    pub overall_findings: OverallFindings,
    pub featured_snippet_readiness: u8,
    pub pages_evaluated: Vec<PageEvaluation>,
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapReport {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sitemap_url: Option<String>,
    pub urls_analyzed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlabilityReport {
    pub score: u8,
    pub robots_txt: RobotsTxtReport,
    pub sitemap: SitemapReport,
    pub issues: Vec<Issue>,
}

/// The audit of one site. Built once by `run_audit` and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub url: String,
    pub structured_data: StructuredDataReport,
    pub snippet_optimization: SnippetOptimizationReport,
    pub crawlability: CrawlabilityReport,
    pub aeo_score_raw: u8,
    pub aeo_score_pct: f64,
    /// Access score (0, 70 or 100) per AI product
    pub model_scores: BTreeMap<String, u8>,
}

impl AuditResult {
    pub fn issues_count(&self) -> usize {
        self.structured_data.issues.len()
            + self.snippet_optimization.issues.len()
            + self.crawlability.issues.len()
    }

    /// Up to `per_dimension` issues from each sub-score, in dimension order.
    pub fn main_issues(&self, per_dimension: usize) -> Vec<Issue> {
        [
            &self.structured_data.issues,
            &self.snippet_optimization.issues,
            &self.crawlability.issues,
        ]
        .into_iter()
        .flat_map(|issues| issues.iter().take(per_dimension).cloned())
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub optimizations: Vec<Optimization>,
}

/// Audit plus AI recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullReport {
    pub audit_report: AuditResult,
    pub optimization_recommendations: Recommendations,
    pub model_scores: BTreeMap<String, u8>,
}

/// Headline numbers of the target audit in a competitor report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub aeo_score: f64,
    pub aeo_score_raw: u8,
    pub featured_snippet_potential: u8,
    pub content_quality_score: u8,
    pub technical_seo_score: u8,
    pub structured_data_score: u8,
    pub structured_data: StructuredDataReport,
    pub snippet_optimization: SnippetOptimizationReport,
    pub crawlability: CrawlabilityReport,
}

impl From<AuditResult> for AuditSummary {
    fn from(audit: AuditResult) -> Self {
        Self {
            aeo_score: audit.aeo_score_pct,
            aeo_score_raw: audit.aeo_score_raw,
            featured_snippet_potential: audit.snippet_optimization.featured_snippet_readiness,
            content_quality_score: audit.snippet_optimization.overall_findings.readability_score,
            technical_seo_score: audit.crawlability.score,
            structured_data_score: audit.structured_data.score,
            structured_data: audit.structured_data,
            snippet_optimization: audit.snippet_optimization,
            crawlability: audit.crawlability,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Success,
}

/// Target audit ranked against discovered competitors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorReport {
    pub status: ReportStatus,
    pub target_domain: String,
    pub link_details: SiteDescription,
    pub audit_report: AuditSummary,
    pub optimization_recommendations: Recommendations,
    pub competitor_analysis: CompetitorAnalysis,
}
