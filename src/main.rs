use std::time::Duration;

use aeolens_core::{AuditContext, Settings, run_audit, run_full_pipeline, run_with_competitors};
use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value as JsonValue;
use tracing_subscriber::EnvFilter;

/// Audit how ready a website is for answer engines and print the report as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Site to audit, e.g. https://example.com
    url: String,
    /// Maximum number of pages to evaluate, root included.
    #[arg(short = 'p', long, value_name = "N")]
    max_pages: Option<usize>,
    /// Per-request timeout in seconds.
    #[arg(short, long, value_name = "SECS")]
    timeout: Option<u64>,
    /// Rank the site against AI-discovered competitors (needs GEMINI_API_KEY).
    #[arg(short, long)]
    competitors: bool,
    /// Add AI recommendations to the report (needs GEMINI_API_KEY).
    #[arg(short, long)]
    recommendations: bool,
    /// Print compact JSON instead of pretty JSON.
    #[arg(long)]
    compact: bool,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: &CliArgs) -> Result<JsonValue> {
    let mut settings = Settings::from_env().context("Failed to load settings")?;
    if let Some(max_pages) = args.max_pages {
        settings.audit = settings.audit.with_max_pages(max_pages);
    }
    if let Some(secs) = args.timeout {
        settings.audit = settings.audit.with_timeout(Duration::from_secs(secs));
    }

    let ctx = AuditContext::from_settings(&settings).context("Failed to build HTTP client")?;

    let report = if args.competitors {
        serde_json::to_value(run_with_competitors(&ctx, &args.url).await?)?
    } else if args.recommendations {
        serde_json::to_value(run_full_pipeline(&ctx, &args.url).await?)?
    } else {
        serde_json::to_value(run_audit(&ctx, &args.url).await?)?
    };
    Ok(report)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = CliArgs::parse();

    tracing::info!(url = %args.url, "Starting audit");
    let report = run(&args).await?;

    let output = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{output}");

    Ok(())
}
