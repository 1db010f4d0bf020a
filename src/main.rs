//! Research Digest: batch entrypoint.
//! Ingests configured sources, runs the curation pipeline, writes the digest JSON.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use research_digest::config::DigestConfig;
use research_digest::enrich::{HttpFetcher, PageFetcher};
use research_digest::ingest::providers::{ArxivProvider, ForumProvider, JsonDumpProvider, RssProvider};
use research_digest::ingest::types::SourceProvider;
use research_digest::{ingest, pipeline};

#[derive(Parser)]
#[command(name = "research-digest")]
#[command(about = "Build the weekly research digest: dedup, filter, enrich and feature")]
struct Args {
    /// Config file (overrides $DIGEST_CONFIG_PATH and config/digest.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON record dump to include; repeatable
    #[arg(short, long)]
    input: Vec<PathBuf>,

    /// Where to write the digest
    #[arg(short, long, default_value = "data/digest.json")]
    output: PathBuf,

    /// Days to look back (overrides `ingest.days_back`)
    #[arg(short, long)]
    days: Option<i64>,

    /// Skip network enrichment; short abstracts still get a metadata sentence
    #[arg(long)]
    no_enrich: bool,

    /// Skip arXiv, live feeds and the forum; only JSON dumps are read
    #[arg(long)]
    offline: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

/// Compact logs by default, JSON with `--json-logs`. `RUST_LOG` overrides the level.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn build_providers(
    cfg: &DigestConfig,
    args: &Args,
    fetcher: Arc<dyn PageFetcher>,
) -> Result<Vec<Box<dyn SourceProvider>>> {
    let mut providers: Vec<Box<dyn SourceProvider>> = Vec::new();

    if !args.offline {
        let timeout = Duration::from_secs(cfg.enrich.timeout_secs);
        if let Some(arxiv) = &cfg.ingest.arxiv {
            providers.push(Box::new(ArxivProvider::new(
                arxiv.clone(),
                cfg.ingest.days_back,
                timeout,
            )?));
        }
        for feed in &cfg.ingest.feeds {
            providers.push(Box::new(RssProvider::new(feed.clone(), timeout)?));
        }
        if let Some(forum) = &cfg.ingest.forum {
            providers.push(Box::new(ForumProvider::new(
                cfg.enrich.forum_graphql_url.clone(),
                forum.clone(),
                cfg.ingest.days_back,
                fetcher,
            )));
        }
    }

    for path in cfg.ingest.dumps.iter().chain(args.input.iter()) {
        providers.push(Box::new(JsonDumpProvider::new(path.clone())));
    }
    Ok(providers)
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(args.json_logs);

    let mut cfg = DigestConfig::load(args.config.as_deref()).context("loading config")?;
    if let Some(days) = args.days {
        cfg.ingest.days_back = days.max(0);
    }
    let lexicon = cfg.lexicon();

    let fetcher: Arc<dyn PageFetcher> =
        Arc::new(HttpFetcher::new(&cfg.enrich).context("building http client")?);

    let providers = build_providers(&cfg, &args, fetcher.clone())?;
    if providers.is_empty() {
        warn!(target: "pipeline", "no sources configured; the digest will be empty");
    }

    let now = Utc::now();
    let raw = ingest::run_once(&providers).await;
    let records = ingest::within_window(raw, now, cfg.ingest.days_back);
    info!(target: "pipeline", records = records.len(), "ingest finished");

    let enrich_with = (!args.no_enrich).then_some(fetcher.as_ref());
    let digest = pipeline::run(records, &lexicon, &cfg, enrich_with, now).await;

    pipeline::write_digest(&args.output, &digest)?;
    info!(
        target: "pipeline",
        output = %args.output.display(),
        total = digest.total_count,
        featured = digest.featured.len(),
        "done"
    );
    Ok(())
}
