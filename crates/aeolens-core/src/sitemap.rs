//! XML sitemap parsing

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SitemapType {
    Standard, // <urlset> with page URLs
    Index,    // <sitemapindex> pointing to other sitemaps
    Unknown,
}

/// `<loc>` entries of one sitemap document, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sitemap {
    pub sitemap_type: SitemapType,
    pub locations: Vec<String>,
}

static RE_LOC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<loc>(.*?)</loc>").expect("invalid loc regex"));

/// A sitemap body is accepted only if it starts with an XML declaration.
pub fn is_xml_document(content: &str) -> bool {
    content.trim_start().starts_with("<?xml")
}

/// Parse XML sitemap content
pub fn parse_sitemap(content: &str) -> Result<Sitemap, ParseError> {
    if !is_xml_document(content) {
        return Err(ParseError::NotXml);
    }

    let sitemap_type = if content.contains("<sitemapindex") {
        SitemapType::Index
    } else if content.contains("<urlset") {
        SitemapType::Standard
    } else {
        SitemapType::Unknown
    };

    let locations = RE_LOC
        .captures_iter(content)
        .filter_map(|cap| cap.get(1))
        .map(|m| decode_xml_entities(strip_cdata(m.as_str().trim())))
        .filter(|loc| !loc.is_empty())
        .collect();

    Ok(Sitemap {
        sitemap_type,
        locations,
    })
}

fn strip_cdata(text: &str) -> &str {
    text.strip_prefix("<![CDATA[")
        .and_then(|t| t.strip_suffix("]]>"))
        .map(str::trim)
        .unwrap_or(text)
}

fn decode_xml_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
