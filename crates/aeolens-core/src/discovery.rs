//! Page discovery
//!
//! Builds the bounded set of pages to analyze: the first readable sitemap
//! wins, otherwise same-site links from the homepage are used. The site root
//! is always the first entry.

use scraper::{Html, Selector};
use serde::Serialize;
use url::Url;

use crate::fetch::Fetcher;
use crate::robots_txt::RobotsPolicy;
use crate::sitemap::{is_xml_document, parse_sitemap};
use crate::url_utils::{is_within_site, resolve_link};

/// Link targets containing any of these are never analyzed.
pub const DENIED_PATH_PARTS: &[&str] = &["/privacy", "/terms", "/login", "/signup"];

/// Where the pages beyond the root came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoverySource {
    Sitemap,
    Links,
    RootOnly,
}

/// Ordered, bounded set of pages for one site.
#[derive(Debug, Clone)]
pub struct DiscoverySet {
    pages: Vec<Url>,
    sitemap_url: Option<Url>,
    source: DiscoverySource,
}

impl DiscoverySet {
    fn new(root: &Url) -> Self {
        Self {
            pages: vec![root.clone()],
            sitemap_url: None,
            source: DiscoverySource::RootOnly,
        }
    }

    /// Add `url` unless present or the set is full. Returns whether it was added.
    fn insert(&mut self, url: Url, max_pages: usize) -> bool {
        if self.pages.len() >= max_pages || self.pages.contains(&url) {
            return false;
        }
        self.pages.push(url);
        true
    }

    pub fn pages(&self) -> &[Url] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn sitemap_found(&self) -> bool {
        self.sitemap_url.is_some()
    }

    pub fn sitemap_url(&self) -> Option<&Url> {
        self.sitemap_url.as_ref()
    }

    pub fn source(&self) -> DiscoverySource {
        self.source
    }
}

/// Sitemaps declared in robots.txt, else the two conventional locations.
pub fn sitemap_candidates(root: &Url, policy: &RobotsPolicy) -> Vec<Url> {
    let declared: Vec<Url> = policy
        .sitemaps()
        .iter()
        .filter_map(|s| root.join(s).ok())
        .collect();

    if !declared.is_empty() {
        return declared;
    }

    ["sitemap.xml", "sitemap_index.xml"]
        .iter()
        .filter_map(|name| root.join(name).ok())
        .collect()
}

/// Discover up to `max_pages` pages under `root`.
///
/// `root_html` is the already fetched homepage body, used for the link
/// fallback when no sitemap adds anything beyond the root.
pub async fn discover_pages(
    fetcher: &dyn Fetcher,
    root: &Url,
    policy: &RobotsPolicy,
    root_html: &str,
    max_pages: usize,
) -> DiscoverySet {
    let max_pages = max_pages.max(1);
    let mut set = DiscoverySet::new(root);

    for candidate in sitemap_candidates(root, policy) {
        let response = match fetcher.fetch(&candidate).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(url = %candidate, error = %err, "Sitemap fetch failed");
                continue;
            }
        };
        if !response.is_success() || !is_xml_document(&response.body) {
            tracing::debug!(url = %candidate, status = response.status, "Sitemap candidate rejected");
            continue;
        }

        match parse_sitemap(&response.body) {
            Ok(sitemap) => {
                for loc in &sitemap.locations {
                    match Url::parse(loc) {
                        Ok(url) if matches!(url.scheme(), "http" | "https") => {
                            set.insert(url, max_pages);
                        }
                        _ => tracing::debug!(loc = %loc, "Skipping invalid sitemap location"),
                    }
                }
                tracing::info!(
                    url = %candidate,
                    kind = ?sitemap.sitemap_type,
                    locations = sitemap.locations.len(),
                    pages = set.len(),
                    "Sitemap accepted"
                );
                set.sitemap_url = Some(candidate);
                break;
            }
            Err(err) => {
                tracing::debug!(url = %candidate, error = %err, "Sitemap parse failed");
            }
        }
    }

    if set.len() > 1 {
        set.source = DiscoverySource::Sitemap;
        return set;
    }

    for link in same_site_links(root, root_html) {
        if set.len() >= max_pages {
            break;
        }
        set.insert(link, max_pages);
    }
    if set.len() > 1 {
        set.source = DiscoverySource::Links;
    }
    tracing::debug!(pages = set.len(), source = ?set.source, "Discovery finished");

    set
}

/// Same-site anchor targets of `html` in document order, deny-listed paths
/// removed, fragments stripped.
pub fn same_site_links(root: &Url, html: &str) -> Vec<Url> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    document
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter(|href| !href.trim().is_empty())
        .filter_map(|href| resolve_link(root, href))
        .filter(|url| is_within_site(root, url))
        .filter(|url| !is_denied(url))
        .collect()
}

fn is_denied(url: &Url) -> bool {
    let text = url.as_str();
    DENIED_PATH_PARTS.iter().any(|part| text.contains(part))
}
