//! Per-page content analysis
//!
//! Computes the snippet metrics of one HTML page (paragraph lengths, lists,
//! tables, question headings) and the JSON-LD schema types it declares.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::parser::{extract_json_ld_from_document, schema_types_in_blocks};

/// Metrics for one successfully fetched HTML page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEvaluation {
    pub url: String,
    /// Floor of the mean word count over non-empty paragraphs
    pub avg_paragraph_words: usize,
    pub max_paragraph_words: usize,
    /// Non-empty paragraphs only
    pub paragraph_count: usize,
    pub list_items: usize,
    pub table_count: usize,
    pub question_headings: usize,
    /// Distinct schema types on the page, sorted
    pub schema_types: BTreeSet<String>,

    /// Words across all counted paragraphs, for the site-wide average
    #[serde(skip)]
    pub total_paragraph_words: usize,
    /// Every `@type` occurrence on the page
    #[serde(skip)]
    pub schema_occurrences: BTreeMap<String, usize>,
}

impl PageEvaluation {
    pub fn has_lists(&self) -> bool {
        self.list_items > 0
    }

    pub fn has_question_headings(&self) -> bool {
        self.question_headings > 0
    }
}

/// Analyze one HTML page.
pub fn analyze_page(url: &str, html: &str) -> PageEvaluation {
    let document = Html::parse_document(html);

    let word_counts: Vec<usize> = element_texts(&document, "p")
        .iter()
        .map(|text| text.split_whitespace().count())
        .filter(|&words| words > 0)
        .collect();

    let paragraph_count = word_counts.len();
    let total_paragraph_words: usize = word_counts.iter().sum();
    let avg_paragraph_words = total_paragraph_words
        .checked_div(paragraph_count)
        .unwrap_or(0);
    let max_paragraph_words = word_counts.iter().copied().max().unwrap_or(0);

    let question_headings = element_texts(&document, "h1, h2, h3, h4, h5, h6")
        .iter()
        .filter(|text| text.contains('?'))
        .count();

    let blocks = match extract_json_ld_from_document(&document) {
        Ok(blocks) => blocks,
        Err(err) => {
            tracing::debug!(url, error = %err, "JSON-LD extraction failed");
            Vec::new()
        }
    };
    let mut schema_occurrences: BTreeMap<String, usize> = BTreeMap::new();
    for schema_type in schema_types_in_blocks(&blocks) {
        *schema_occurrences.entry(schema_type).or_default() += 1;
    }

    PageEvaluation {
        url: url.to_string(),
        avg_paragraph_words,
        max_paragraph_words,
        paragraph_count,
        list_items: count_elements(&document, "ul li, ol li"),
        table_count: count_elements(&document, "table"),
        question_headings,
        schema_types: schema_occurrences.keys().cloned().collect(),
        total_paragraph_words,
        schema_occurrences,
    }
}

/// Title and description a site presents about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDescription {
    pub title: String,
    pub description: String,
}

/// `<title>`, then `meta[name=description]` falling back to
/// `meta[property=og:description]`. Missing values are empty strings.
pub fn extract_site_description(html: &str) -> SiteDescription {
    let document = Html::parse_document(html);

    let title = element_texts(&document, "title")
        .into_iter()
        .map(|t| t.trim().to_string())
        .next()
        .unwrap_or_default();

    let description = ["meta[name=\"description\"]", "meta[property=\"og:description\"]"]
        .iter()
        .find_map(|selector| first_attr(&document, selector, "content"))
        .map(|d| d.trim().to_string())
        .unwrap_or_default();

    SiteDescription { title, description }
}

// Helper functions
fn count_elements(document: &Html, selector_str: &str) -> usize {
    if let Ok(selector) = Selector::parse(selector_str) {
        document.select(&selector).count()
    } else {
        0
    }
}

fn element_texts(document: &Html, selector_str: &str) -> Vec<String> {
    if let Ok(selector) = Selector::parse(selector_str) {
        document
            .select(&selector)
            .map(|element| element.text().collect::<String>())
            .collect()
    } else {
        Vec::new()
    }
}

fn first_attr(document: &Html, selector_str: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr(attr))
        .map(str::to_string)
}
