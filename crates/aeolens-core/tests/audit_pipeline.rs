//! End-to-end audits over captured responses

use aeolens_core::advisor::{CompetitorFinder, Recommender};
use aeolens_core::{
    AuditConfig, AuditContext, AuditError, CapturedFetcher, CollaboratorError, FetchError,
    Optimization, SiteDescription, run_audit, run_full_pipeline, run_with_competitors,
};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;

const ROOT: &str = "https://shop.example/";

const FAQ_PAGE: &str = r#"
<html>
<head>
    <title>Shop Example</title>
    <meta name="description" content="Everything about widgets">
    <script type="application/ld+json">
    {
        "@context": "https://schema.org",
        "@type": "FAQPage",
        "mainEntity": [{"name": "What is a widget?", "acceptedAnswer": {"text": "A small tool."}}]
    }
    </script>
</head>
<body>
    <h1>What is a widget?</h1>
    <p>A small useful tool.</p>
    <h2>How do widgets work?</h2>
    <p>They just work.</p>
    <ul><li>Cheap</li><li>Durable</li></ul>
</body>
</html>
"#;

fn context(fetcher: CapturedFetcher) -> AuditContext {
    AuditContext::new(Arc::new(fetcher), AuditConfig::default())
}

fn issue_texts(issues: &[aeolens_core::Issue]) -> Vec<&str> {
    issues.iter().map(|i| i.issue.as_str()).collect()
}

#[tokio::test]
async fn faq_page_without_robots_or_sitemap() {
    let ctx = context(CapturedFetcher::new().with_html(ROOT, FAQ_PAGE));

    let result = run_audit(&ctx, "https://shop.example").await.unwrap();

    assert_eq!(result.url, ROOT);
    assert_eq!(result.structured_data.score, 2);
    assert_eq!(result.structured_data.aeo_schemas_found, vec!["FAQPage"]);
    assert!(result.structured_data.issues.is_empty());

    assert_eq!(result.snippet_optimization.score, 10);
    assert!(result.snippet_optimization.issues.is_empty());
    assert_eq!(result.snippet_optimization.overall_findings.pages_with_lists, 1);
    assert_eq!(result.snippet_optimization.overall_findings.pages_with_questions, 1);
    assert_eq!(result.snippet_optimization.overall_findings.readability_score, 4);
    assert_eq!(result.snippet_optimization.featured_snippet_readiness, 8);

    assert_eq!(result.crawlability.score, 8);
    assert_eq!(
        issue_texts(&result.crawlability.issues),
        vec!["robots.txt inaccessible", "No sitemap found"]
    );
    assert!(!result.crawlability.robots_txt.accessible);

    assert_eq!(result.aeo_score_raw, 20);
    assert_eq!(result.aeo_score_pct, 66.67);
    assert!(result.model_scores.values().all(|&score| score == 100));
}

#[tokio::test]
async fn googlebot_block_zeroes_crawlability() {
    let fetcher = CapturedFetcher::new()
        .with_text(
            "https://shop.example/robots.txt",
            "User-agent: Googlebot\nDisallow: /\n\nUser-agent: *\nDisallow: /cart",
        )
        .with_html(ROOT, FAQ_PAGE);
    let ctx = context(fetcher);

    let result = run_audit(&ctx, ROOT).await.unwrap();

    assert_eq!(result.crawlability.score, 0);
    assert_eq!(issue_texts(&result.crawlability.issues), vec!["Googlebot blocked"]);
    assert!(result.crawlability.robots_txt.googlebot_blocked);
    assert!(!result.crawlability.robots_txt.gptbot_blocked);
    assert_eq!(result.aeo_score_raw, 12);
    assert_eq!(result.aeo_score_pct, 40.0);
    // Wildcard disallows still apply to every AI product
    assert!(result.model_scores.values().all(|&score| score == 70));
}

#[tokio::test]
async fn sitemap_pages_are_bounded_and_root_first() {
    let locs: String = (0..20)
        .map(|i| format!("<url><loc>https://shop.example/p{i}</loc></url>"))
        .collect();
    let sitemap = format!(r#"<?xml version="1.0"?><urlset>{locs}</urlset>"#);

    let mut fetcher = CapturedFetcher::new()
        .with_text(
            "https://shop.example/robots.txt",
            "User-agent: *\nDisallow:\nSitemap: https://shop.example/sitemap-main.xml",
        )
        .with_xml("https://shop.example/sitemap-main.xml", &sitemap)
        .with_html(ROOT, FAQ_PAGE);
    for i in 0..20 {
        fetcher = fetcher.with_html(&format!("https://shop.example/p{i}"), "<p>Plain page text.</p>");
    }
    let ctx = AuditContext::new(Arc::new(fetcher), AuditConfig::default().with_max_pages(5));

    let result = run_audit(&ctx, ROOT).await.unwrap();
    let sitemap = &result.crawlability.sitemap;

    assert!(sitemap.found);
    assert_eq!(sitemap.sitemap_url.as_deref(), Some("https://shop.example/sitemap-main.xml"));
    assert_eq!(sitemap.urls_analyzed.len(), 5);
    assert_eq!(sitemap.urls_analyzed[0], ROOT);
    assert_eq!(sitemap.urls_analyzed[4], "https://shop.example/p3");
    assert_eq!(result.snippet_optimization.pages_evaluated.len(), 5);
    assert_eq!(
        result.snippet_optimization.overall_findings.evaluated_urls,
        sitemap.urls_analyzed
    );
    assert_eq!(result.crawlability.score, 10);
}

#[tokio::test]
async fn failed_and_skipped_pages_do_not_abort() {
    let home = r#"
        <p>Welcome.</p>
        <a href="/guide">Guide</a>
        <a href="/broken">Broken</a>
        <a href="/missing">Missing</a>
        <a href="/feed.json">Feed</a>
    "#;
    let fetcher = CapturedFetcher::new()
        .with_html(ROOT, home)
        .with_html("https://shop.example/guide", "<h2>Why?</h2><p>Because.</p>")
        .with_error(
            "https://shop.example/broken",
            FetchError::Timeout {
                url: "https://shop.example/broken".to_string(),
            },
        )
        .with_response("https://shop.example/feed.json", 200, Some("application/json"), "{}");
    let ctx = context(fetcher);

    let result = run_audit(&ctx, ROOT).await.unwrap();

    assert_eq!(result.crawlability.sitemap.urls_analyzed.len(), 5);
    assert_eq!(
        result.snippet_optimization.overall_findings.evaluated_urls,
        vec![ROOT, "https://shop.example/guide"]
    );
    assert_eq!(result.structured_data.pages_with_errors.len(), 1);
    assert_eq!(result.structured_data.pages_with_errors[0].url, "https://shop.example/broken");
    assert!(result.structured_data.pages_with_errors[0].error.contains("timed out"));
}

#[tokio::test]
async fn no_evaluable_pages_still_scores_within_bounds() {
    let fetcher = CapturedFetcher::new().with_response(ROOT, 200, Some("application/pdf"), "%PDF");
    let ctx = context(fetcher);

    let result = run_audit(&ctx, ROOT).await.unwrap();

    assert!(result.snippet_optimization.pages_evaluated.is_empty());
    assert_eq!(result.snippet_optimization.score, 0);
    assert_eq!(
        issue_texts(&result.snippet_optimization.issues),
        vec!["No pages could be analyzed"]
    );
    assert_eq!(result.snippet_optimization.featured_snippet_readiness, 0);
    assert_eq!(result.structured_data.score, 2);
    assert_eq!(issue_texts(&result.structured_data.issues), vec!["No JSON-LD found"]);
    assert_eq!(result.aeo_score_raw, 10);
    assert_eq!(result.aeo_score_pct, 33.33);
}

#[tokio::test]
async fn root_failures_fail_the_audit() {
    let ctx = context(CapturedFetcher::new().with_response(ROOT, 500, Some("text/html"), "oops"));
    let err = run_audit(&ctx, ROOT).await.unwrap_err();
    assert!(matches!(err, AuditError::RootStatus { status: 500, .. }));

    let ctx = context(CapturedFetcher::new().with_error(
        ROOT,
        FetchError::Network {
            url: ROOT.to_string(),
            message: "connection refused".to_string(),
        },
    ));
    let err = run_audit(&ctx, ROOT).await.unwrap_err();
    assert!(matches!(err, AuditError::RootUnreachable(_)));
}

#[tokio::test]
async fn identical_responses_give_identical_reports() {
    let fetcher = Arc::new(
        CapturedFetcher::new()
            .with_text("https://shop.example/robots.txt", "User-agent: GPTBot\nDisallow: /private")
            .with_html(ROOT, r#"<a href="/a">A</a><a href="/b">B</a><p>Home page.</p>"#)
            .with_html("https://shop.example/a", FAQ_PAGE)
            .with_html(
                "https://shop.example/b",
                r#"<script type="application/ld+json">{"@type": ["Recipe", "HowTo"]}</script><table></table>"#,
            ),
    );
    let ctx = AuditContext::new(fetcher, AuditConfig::default());

    let first = serde_json::to_string(&run_audit(&ctx, ROOT).await.unwrap()).unwrap();
    let second = serde_json::to_string(&run_audit(&ctx, ROOT).await.unwrap()).unwrap();

    assert_eq!(first, second);
}

struct FakeAdvisor {
    competitors: Vec<String>,
}

#[async_trait]
impl Recommender for FakeAdvisor {
    async fn summarize(&self, audit: &JsonValue) -> Result<Vec<Optimization>, CollaboratorError> {
        assert!(audit.get("aeoScorePct").is_some());
        Ok(vec![Optimization {
            description: "Add HowTo markup".to_string(),
            impact_level: "High".to_string(),
            category: "Structured Data".to_string(),
        }])
    }
}

#[async_trait]
impl CompetitorFinder for FakeAdvisor {
    async fn discover_competitors(
        &self,
        site_url: &str,
        site: &SiteDescription,
    ) -> Result<Vec<String>, CollaboratorError> {
        assert_eq!(site_url, ROOT);
        assert_eq!(site.title, "Shop Example");
        Ok(self.competitors.clone())
    }
}

#[tokio::test]
async fn competitors_are_ranked_and_failures_excluded() {
    let rival_page = r#"
        <script type="application/ld+json">
        {"@graph": [{"@type": "FAQPage"}, {"@type": "HowTo"}, {"@type": "Recipe"}, {"@type": "BreadcrumbList"}]}
        </script>
        <h2>Why us?</h2><p>Short.</p><ol><li>One</li></ol>
    "#;
    let fetcher = CapturedFetcher::new()
        .with_html(ROOT, FAQ_PAGE)
        .with_text("https://rival.example/robots.txt", "User-agent: *\nDisallow:")
        .with_xml(
            "https://rival.example/sitemap.xml",
            r#"<?xml version="1.0"?><urlset><url><loc>https://rival.example/</loc></url></urlset>"#,
        )
        .with_html("https://rival.example/", rival_page)
        .with_error(
            "https://down.example/",
            FetchError::Timeout {
                url: "https://down.example/".to_string(),
            },
        );
    let advisor = FakeAdvisor {
        competitors: vec![
            "https://down.example/".to_string(),
            "https://rival.example/".to_string(),
        ],
    };
    let ctx = context(fetcher).with_advisor(Arc::new(advisor));

    let report = run_with_competitors(&ctx, ROOT).await.unwrap();
    let analysis = &report.competitor_analysis;

    assert_eq!(report.target_domain, ROOT);
    assert_eq!(report.link_details.description, "Everything about widgets");
    assert_eq!(report.optimization_recommendations.optimizations.len(), 1);

    assert_eq!(analysis.total_competitors, 1);
    assert_eq!(analysis.competitors[0].domain, "https://rival.example/");
    assert_eq!(analysis.competitors[0].structured_data_score, 10);
    assert_eq!(analysis.ranking.len(), 2);
    assert_eq!(analysis.ranking[0].domain, "https://rival.example/");
    assert_eq!(
        analysis.ranking[0].key_advantages,
        vec!["Better structured data (10/10 vs 2/10)", "Better technical SEO (10/10 vs 8/10)"]
    );
    assert_eq!(analysis.your_ranking, 2);
    assert_eq!(analysis.average_competitor_score, 100.0);
    assert_eq!(analysis.score_difference, report.audit_report.aeo_score - 100.0);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["competitorAnalysis"]["yourRanking"], 2);
    assert_eq!(json["auditReport"]["technicalSeoScore"], 8);
}

#[tokio::test]
async fn full_pipeline_without_competitors_ranks_target_alone() {
    let ctx = context(CapturedFetcher::new().with_html(ROOT, FAQ_PAGE))
        .with_advisor(Arc::new(FakeAdvisor { competitors: Vec::new() }));

    let report = run_with_competitors(&ctx, ROOT).await.unwrap();

    assert_eq!(report.competitor_analysis.ranking.len(), 1);
    assert_eq!(report.competitor_analysis.ranking[0].rank, 1);
    assert_eq!(report.competitor_analysis.average_competitor_score, 0.0);
    assert_eq!(report.competitor_analysis.score_difference, 66.67);

    let full = run_full_pipeline(&ctx, ROOT).await.unwrap();
    assert_eq!(full.optimization_recommendations.optimizations[0].category, "Structured Data");
}
