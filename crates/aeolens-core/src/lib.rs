//! # aeolens-core
//!
//! Audits how ready a website is for answer engines (AI search and chat
//! crawlers).
//!
//! This library provides:
//! - robots.txt interpretation and sitemap-first page discovery
//! - per-page content metrics and JSON-LD schema type extraction
//! - structured data, snippet optimization and crawlability scoring
//! - competitor ranking and optional AI recommendations
//!
//! ## Example
//!
//! ```no_run
//! use aeolens_core::{AuditContext, Settings, run_audit};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Settings::from_env()?;
//! let ctx = AuditContext::from_settings(&settings)?;
//!
//! let result = run_audit(&ctx, "https://example.com").await?;
//! println!("{}% ({}/30)", result.aeo_score_pct, result.aeo_score_raw);
//! # Ok(())
//! # }
//! ```

pub mod advisor;
pub mod audit;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod page;
pub mod parser;
pub mod ranking;
pub mod robots_txt;
pub mod scoring;
pub mod sitemap;
pub mod types;
pub mod url_utils;

// Re-export commonly used types
pub use advisor::{Advisor, CompetitorFinder, GeminiAdvisor, Optimization, Recommender};
pub use audit::{
    AuditContext, fetch_site_description, run_audit, run_full_pipeline, run_with_competitors,
};
pub use config::{AuditConfig, Settings, SnippetThresholds};
pub use error::{
    AuditError, CollaboratorError, ConfigurationError, FetchError, ParseError, PolicyUnavailable,
};
pub use fetch::{CapturedFetcher, FetchResponse, Fetcher, ReqwestFetcher};
pub use page::{PageEvaluation, SiteDescription};
pub use ranking::{CompetitorAnalysis, RankingEntry};
pub use robots_txt::RobotsPolicy;
pub use scoring::{Impact, Issue};
pub use types::{AuditResult, CompetitorReport, FullReport};
