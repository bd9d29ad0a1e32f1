//! Competitor ranking
//!
//! Orders the target and its competitors by percentage, then by
//! structured-data score, and explains each competitor's lead or lag per
//! dimension.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::scoring::Issue;
use crate::types::AuditResult;

/// The numbers a site is ranked on.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteScore {
    pub domain: String,
    pub percentage: f64,
    pub structured_data: u8,
    pub snippet_optimization: u8,
    pub crawlability: u8,
}

impl SiteScore {
    pub fn from_audit(domain: impl Into<String>, audit: &AuditResult) -> Self {
        Self {
            domain: domain.into(),
            percentage: audit.aeo_score_pct.clamp(0.0, 100.0),
            structured_data: audit.structured_data.score,
            snippet_optimization: audit.snippet_optimization.score,
            crawlability: audit.crawlability.score,
        }
    }

    /// Percentage descending, then structured data descending.
    fn rank_order(&self, other: &Self) -> Ordering {
        other
            .percentage
            .total_cmp(&self.percentage)
            .then(other.structured_data.cmp(&self.structured_data))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    /// 1-based
    pub rank: usize,
    pub domain: String,
    pub score: f64,
    pub is_user_site: bool,
    pub key_advantages: Vec<String>,
    pub key_disadvantages: Vec<String>,
}

/// Condensed audit of one competitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorSummary {
    pub domain: String,
    pub aeo_score: f64,
    pub structured_data_score: u8,
    pub snippet_optimization_score: u8,
    pub crawlability_score: u8,
    pub total_pages_analyzed: usize,
    pub schema_types_found: usize,
    pub issues_count: usize,
    pub key_schema_types: Vec<String>,
    pub main_issues: Vec<Issue>,
    pub content_quality: ContentQuality,
    pub technical_status: TechnicalStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentQuality {
    pub avg_paragraph_length: usize,
    pub pages_with_lists: usize,
    pub pages_with_questions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalStatus {
    pub robots_txt_accessible: bool,
    pub sitemap_found: bool,
    pub googlebot_blocked: bool,
}

const KEY_SCHEMA_TYPES: usize = 5;
const ISSUES_PER_DIMENSION: usize = 2;

impl CompetitorSummary {
    pub fn from_audit(domain: impl Into<String>, audit: &AuditResult) -> Self {
        let findings = &audit.snippet_optimization.overall_findings;
        Self {
            domain: domain.into(),
            aeo_score: audit.aeo_score_pct.clamp(0.0, 100.0),
            structured_data_score: audit.structured_data.score,
            snippet_optimization_score: audit.snippet_optimization.score,
            crawlability_score: audit.crawlability.score,
            total_pages_analyzed: audit.snippet_optimization.pages_evaluated.len(),
            schema_types_found: audit.structured_data.schema_types_found.len(),
            issues_count: audit.issues_count(),
            key_schema_types: audit
                .structured_data
                .schema_types_found
                .keys()
                .take(KEY_SCHEMA_TYPES)
                .cloned()
                .collect(),
            main_issues: audit.main_issues(ISSUES_PER_DIMENSION),
            content_quality: ContentQuality {
                avg_paragraph_length: findings.avg_paragraph,
                pages_with_lists: findings.pages_with_lists,
                pages_with_questions: findings.pages_with_questions,
            },
            technical_status: TechnicalStatus {
                robots_txt_accessible: audit.crawlability.robots_txt.accessible,
                sitemap_found: audit.crawlability.sitemap.found,
                googlebot_blocked: audit.crawlability.robots_txt.googlebot_blocked,
            },
        }
    }

    pub fn site_score(&self) -> SiteScore {
        SiteScore {
            domain: self.domain.clone(),
            percentage: self.aeo_score,
            structured_data: self.structured_data_score,
            snippet_optimization: self.snippet_optimization_score,
            crawlability: self.crawlability_score,
        }
    }
}

/// Ranking of the target among its competitors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorAnalysis {
    pub your_ranking: usize,
    pub total_competitors: usize,
    pub average_competitor_score: f64,
    pub score_difference: f64,
    pub ranking: Vec<RankingEntry>,
    pub competitors: Vec<CompetitorSummary>,
}

impl CompetitorAnalysis {
    /// Rank `target` against `competitors`. Competitors are listed best first.
    pub fn build(target: &SiteScore, mut competitors: Vec<CompetitorSummary>, threshold: u8) -> Self {
        competitors.sort_by(|a, b| b.aeo_score.total_cmp(&a.aeo_score));

        let scores: Vec<SiteScore> = competitors.iter().map(CompetitorSummary::site_score).collect();
        let ranking = rank_sites(target, &scores, threshold);

        let your_ranking = ranking
            .iter()
            .find(|entry| entry.is_user_site)
            .map(|entry| entry.rank)
            .unwrap_or(1);
        let average_competitor_score = average(scores.iter().map(|s| s.percentage));

        Self {
            your_ranking,
            total_competitors: competitors.len(),
            average_competitor_score,
            score_difference: target.percentage - average_competitor_score,
            ranking,
            competitors,
        }
    }
}

/// Stable ranking of `[target] + competitors`; ties keep input order.
pub fn rank_sites(target: &SiteScore, competitors: &[SiteScore], threshold: u8) -> Vec<RankingEntry> {
    let mut sites: Vec<(&SiteScore, bool)> = std::iter::once((target, true))
        .chain(competitors.iter().map(|c| (c, false)))
        .collect();
    sites.sort_by(|(a, _), (b, _)| a.rank_order(b));

    sites
        .into_iter()
        .enumerate()
        .map(|(i, (site, is_user_site))| {
            let (key_advantages, key_disadvantages) = if is_user_site {
                (Vec::new(), Vec::new())
            } else {
                compare(target, site, threshold)
            };
            RankingEntry {
                rank: i + 1,
                domain: site.domain.clone(),
                score: site.percentage,
                is_user_site,
                key_advantages,
                key_disadvantages,
            }
        })
        .collect()
}

/// Advantages and disadvantages of `competitor` relative to `target`. A
/// dimension counts only when the gap exceeds `threshold`.
pub fn compare(target: &SiteScore, competitor: &SiteScore, threshold: u8) -> (Vec<String>, Vec<String>) {
    let dimensions = [
        ("structured data", competitor.structured_data, target.structured_data),
        ("content optimization", competitor.snippet_optimization, target.snippet_optimization),
        ("technical SEO", competitor.crawlability, target.crawlability),
    ];

    let mut advantages = Vec::new();
    let mut disadvantages = Vec::new();
    for (label, theirs, ours) in dimensions {
        let gap = i16::from(theirs) - i16::from(ours);
        if gap > i16::from(threshold) {
            advantages.push(format!("Better {label} ({theirs}/10 vs {ours}/10)"));
        } else if -gap > i16::from(threshold) {
            disadvantages.push(format!("Worse {label} ({theirs}/10 vs {ours}/10)"));
        }
    }
    (advantages, disadvantages)
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}
