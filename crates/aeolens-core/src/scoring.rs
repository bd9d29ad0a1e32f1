//! Scoring engine
//!
//! Turns page evaluations and crawl facts into the three 0-10 sub-scores,
//! the combined percentage, featured-snippet readiness and per-model access
//! scores. Every function here is pure.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::SnippetThresholds;
use crate::page::PageEvaluation;
use crate::robots_txt::AgentAccess;

/// Schema types that feed answer engines directly.
pub const AEO_SCHEMA_TYPES: &[&str] = &[
    "FAQPage",
    "HowTo",
    "QAPage",
    "Recipe",
    "HowToStep",
    "NutritionInformation",
    "BreadcrumbList",
    "AggregateRating",
];

pub const MAX_SUB_SCORE: u8 = 10;
pub const MAX_RAW_SCORE: u8 = 30;

/// Site-wide schema type occurrence counts.
pub type SchemaCounts = BTreeMap<String, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Impact {
    Critical,
    High,
    Medium,
    Low,
}

/// A problem found during scoring, with a suggested fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub issue: String,
    pub impact: Impact,
    pub fix: String,
}

impl Issue {
    fn new(issue: impl Into<String>, impact: Impact, fix: &str) -> Self {
        Self {
            issue: issue.into(),
            impact,
            fix: fix.to_string(),
        }
    }
}

/// One sub-score and the issues that lowered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubScore {
    pub score: u8,
    pub issues: Vec<Issue>,
}

/// Content totals across every evaluated page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentSummary {
    pub total_pages: usize,
    pub total_paragraphs: usize,
    pub total_words: usize,
    pub max_paragraph: usize,
    pub pages_with_lists: usize,
    pub pages_with_questions: usize,
    pub list_items: usize,
    pub tables: usize,
}

impl ContentSummary {
    pub fn from_pages(pages: &[PageEvaluation]) -> Self {
        pages.iter().fold(Self::default(), |mut acc, page| {
            acc.total_pages += 1;
            acc.total_paragraphs += page.paragraph_count;
            acc.total_words += page.total_paragraph_words;
            acc.max_paragraph = acc.max_paragraph.max(page.max_paragraph_words);
            acc.pages_with_lists += usize::from(page.has_lists());
            acc.pages_with_questions += usize::from(page.has_question_headings());
            acc.list_items += page.list_items;
            acc.tables += page.table_count;
            acc
        })
    }

    /// Words per paragraph across the site, floored. Zero without paragraphs.
    pub fn avg_paragraph(&self) -> usize {
        self.total_words
            .checked_div(self.total_paragraphs)
            .unwrap_or(0)
    }
}

/// Sum per-page occurrence counts.
pub fn merge_schema_counts(pages: &[PageEvaluation]) -> SchemaCounts {
    let mut counts = SchemaCounts::new();
    for page in pages {
        for (schema_type, n) in &page.schema_occurrences {
            *counts.entry(schema_type.clone()).or_default() += n;
        }
    }
    counts
}

/// Answer-engine types present in `counts`, in name order.
pub fn aeo_schemas(counts: &SchemaCounts) -> Vec<String> {
    counts
        .keys()
        .filter(|t| AEO_SCHEMA_TYPES.contains(&t.as_str()))
        .cloned()
        .collect()
}

/// Snippet-optimization score plus the readability bonus that went into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetScore {
    pub score: u8,
    pub readability_bonus: u8,
    pub issues: Vec<Issue>,
}

pub fn snippet_score(summary: &ContentSummary, thresholds: &SnippetThresholds) -> SnippetScore {
    if summary.total_pages == 0 {
        return SnippetScore {
            score: 0,
            readability_bonus: 0,
            issues: vec![Issue::new(
                "No pages could be analyzed",
                Impact::High,
                "Make sure pages return HTML with a success status to crawlers",
            )],
        };
    }

    let avg = summary.avg_paragraph();
    let total = summary.total_pages as f64;
    let mut score: i32 = 10;
    let mut issues = Vec::new();

    if avg > thresholds.avg_paragraph {
        score -= 1;
        issues.push(Issue::new(
            format!("High avg paragraph length: {avg}"),
            Impact::Medium,
            "Break down paragraphs into shorter, scannable chunks under 60 words",
        ));
    }
    if summary.max_paragraph > thresholds.max_paragraph {
        score -= 1;
        issues.push(Issue::new(
            format!("Paragraph > {} words", thresholds.max_paragraph),
            Impact::High,
            "Split long paragraphs into multiple shorter ones",
        ));
    }
    if (summary.pages_with_lists as f64) < total * thresholds.min_listed_pages_ratio {
        score -= 1;
        issues.push(Issue::new(
            "Few pages have lists",
            Impact::Medium,
            "Add bullet points and numbered lists to improve readability",
        ));
    }
    if summary.pages_with_questions == 0 {
        score -= 1;
        issues.push(Issue::new(
            "No question headings",
            Impact::High,
            "Add question-based headings (H1-H6) to target featured snippets",
        ));
    }

    let mut bonus: u8 = 0;
    if avg < 50 {
        bonus += 1;
    }
    if avg < 30 {
        bonus += 1;
    }
    if summary.pages_with_lists as f64 > total * 0.7 {
        bonus += 1;
    }
    if summary.pages_with_questions > 0 {
        bonus += 1;
    }

    SnippetScore {
        score: clamp_sub_score(score + i32::from(bonus)),
        readability_bonus: bonus,
        issues,
    }
}

/// `min(10, floor(2 * aeo + 0.5 * distinct))` when answer-engine types exist,
/// 5 when only other types exist, 2 without any structured data.
pub fn structured_data_score(counts: &SchemaCounts) -> SubScore {
    let aeo = aeo_schemas(counts).len();

    if aeo > 0 {
        let weighted = (4 * aeo + counts.len()) / 2;
        return SubScore {
            score: clamp_sub_score(i32::try_from(weighted).unwrap_or(i32::MAX)),
            issues: Vec::new(),
        };
    }

    if !counts.is_empty() {
        SubScore {
            score: 5,
            issues: vec![Issue::new(
                "No AEO-specific schema types",
                Impact::High,
                "Implement FAQ, HowTo, Recipe, or QAPage schema markup",
            )],
        }
    } else {
        SubScore {
            score: 2,
            issues: vec![Issue::new(
                "No JSON-LD found",
                Impact::Critical,
                "Add structured data markup to help search engines understand your content",
            )],
        }
    }
}

/// Crawl facts the crawlability score depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSignals {
    pub robots_accessible: bool,
    pub googlebot_blocked: bool,
    pub gptbot_blocked: bool,
    pub sitemap_found: bool,
}

pub fn crawlability_score(signals: &CrawlSignals) -> SubScore {
    let mut score: i32 = 10;
    let mut issues = Vec::new();

    if !signals.robots_accessible {
        score -= 1;
        issues.push(Issue::new(
            "robots.txt inaccessible",
            Impact::Medium,
            "Ensure robots.txt is accessible at yourdomain.com/robots.txt",
        ));
    }

    if signals.googlebot_blocked {
        // Fatal: nothing else matters once search crawling is off.
        score = 0;
        issues.push(Issue::new(
            "Googlebot blocked",
            Impact::Critical,
            "Remove Googlebot blocking from robots.txt immediately",
        ));
    } else {
        if signals.gptbot_blocked {
            score -= 2;
            issues.push(Issue::new(
                "GPTBot blocked",
                Impact::Medium,
                "Consider allowing AI crawlers for better visibility in AI search results",
            ));
        }
        if !signals.sitemap_found {
            score -= 1;
            issues.push(Issue::new(
                "No sitemap found",
                Impact::Medium,
                "Create and submit XML sitemap to search engines",
            ));
        }
    }

    SubScore {
        score: clamp_sub_score(score),
        issues,
    }
}

/// Informational 0-10 readiness for featured snippets. Not part of the total.
pub fn featured_snippet_readiness(summary: &ContentSummary, has_aeo_schema: bool) -> u8 {
    let mut score: u8 = 0;
    if has_aeo_schema {
        score += 3;
    }
    if summary.pages_with_questions > 0 {
        score += 2;
    }
    if summary.total_pages > 0 && summary.avg_paragraph() < 50 {
        score += 2;
    }
    if summary.list_items > 0 {
        score += 1;
    }
    if summary.tables > 0 {
        score += 1;
    }
    score.min(MAX_SUB_SCORE)
}

/// Raw 0-30 sum and its percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Composite {
    pub raw: u8,
    pub percentage: f64,
}

pub fn composite(structured_data: u8, snippet: u8, crawlability: u8) -> Composite {
    let raw = structured_data
        .saturating_add(snippet)
        .saturating_add(crawlability)
        .min(MAX_RAW_SCORE);
    let percentage = round2(f64::from(raw) / f64::from(MAX_RAW_SCORE) * 100.0).clamp(0.0, 100.0);
    Composite { raw, percentage }
}

/// Access score per AI product.
pub fn model_scores(access: &BTreeMap<String, AgentAccess>) -> BTreeMap<String, u8> {
    access
        .iter()
        .map(|(model, access)| (model.clone(), access.score()))
        .collect()
}

fn clamp_sub_score(score: i32) -> u8 {
    // Clamped into 0..=10, so the cast is lossless
    score.clamp(0, i32::from(MAX_SUB_SCORE)) as u8
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
