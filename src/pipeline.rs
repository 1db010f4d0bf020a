// src/pipeline.rs
//! One batch run: dedup → relevance → enrichment → output cleanup → grid
//! order → featured selection, producing the [`Digest`] artifact.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::config::DigestConfig;
use crate::dedup::deduplicate_with_stats;
use crate::enrich::{apply_synthetic, enrich_records, EnrichStats, PageFetcher};
use crate::featured::{order_for_grid, organizations, select_featured};
use crate::ingest::ensure_metrics_described;
use crate::lexicon::Lexicon;
use crate::record::Record;
use crate::relevance::filter_records;
use crate::text::clean_for_output;

/// Output artifact handed to the page renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    pub generated_at: String,
    /// `YYYY-MM-DD`, `days_back` before `generated_at`.
    pub week_start: String,
    pub week_end: String,
    /// Records after the full pipeline, featured ones included.
    pub total_count: usize,
    pub organizations: Vec<String>,
    pub featured: Vec<Record>,
    /// Grid records, featured ones excluded.
    pub records: Vec<Record>,
}

/// Per-stage counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub input: usize,
    pub exact_dupes: usize,
    pub near_dupes: usize,
    pub filtered_out: usize,
    pub enrich: EnrichStats,
    pub featured: usize,
}

/// Run the curation pipeline over already-ingested records.
///
/// With `fetcher == None` no network enrichment happens, but short abstracts
/// still get the metadata sentence.
pub async fn run(
    records: Vec<Record>,
    lexicon: &Lexicon,
    cfg: &DigestConfig,
    fetcher: Option<&dyn PageFetcher>,
    now: DateTime<Utc>,
) -> Digest {
    run_with_stats(records, lexicon, cfg, fetcher, now).await.0
}

pub async fn run_with_stats(
    records: Vec<Record>,
    lexicon: &Lexicon,
    cfg: &DigestConfig,
    fetcher: Option<&dyn PageFetcher>,
    now: DateTime<Utc>,
) -> (Digest, RunStats) {
    ensure_metrics_described();
    let mut stats = RunStats {
        input: records.len(),
        ..Default::default()
    };

    let (records, dd) = deduplicate_with_stats(records);
    stats.exact_dupes = dd.exact_removed;
    stats.near_dupes = dd.near_removed;
    counter!("digest_dedup_removed_total").increment((dd.exact_removed + dd.near_removed) as u64);

    let (mut records, fstats) = filter_records(records, lexicon);
    stats.filtered_out = fstats.removed;

    stats.enrich = match fetcher {
        Some(f) => enrich_records(&mut records, f, &cfg.enrich).await,
        None => {
            let synthetic = apply_synthetic(&mut records, cfg.enrich.min_abstract_len);
            counter!("digest_synthetic_total").increment(synthetic as u64);
            EnrichStats {
                synthetic,
                ..Default::default()
            }
        }
    };

    for rec in records.iter_mut() {
        rec.abstract_text = clean_for_output(&rec.abstract_text);
    }

    records.sort_by(|a, b| b.published_date.cmp(&a.published_date));
    let records = order_for_grid(records, lexicon);

    let featured = select_featured(
        &records,
        lexicon,
        now.naive_utc(),
        cfg.featured.max_count,
        cfg.featured.min_score,
    );
    stats.featured = featured.len();

    let featured_urls: HashSet<&str> = featured.iter().map(|r| r.url.as_str()).collect();
    let grid: Vec<Record> = records
        .iter()
        .filter(|r| !featured_urls.contains(r.url.as_str()))
        .cloned()
        .collect();

    let digest = Digest {
        generated_at: now.to_rfc3339(),
        week_start: (now - Duration::days(cfg.ingest.days_back))
            .format("%Y-%m-%d")
            .to_string(),
        week_end: now.format("%Y-%m-%d").to_string(),
        total_count: records.len(),
        organizations: organizations(&records, lexicon),
        featured,
        records: grid,
    };

    info!(
        target: "pipeline",
        input = stats.input,
        exact_dupes = stats.exact_dupes,
        near_dupes = stats.near_dupes,
        filtered_out = stats.filtered_out,
        enriched = stats.enrich.enriched,
        synthetic = stats.enrich.synthetic,
        featured = stats.featured,
        total = digest.total_count,
        "pipeline complete"
    );
    (digest, stats)
}

/// Write the digest as pretty JSON via a temp file and rename.
pub fn write_digest(path: &Path, digest: &Digest) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output dir {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(digest).context("serializing digest")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("moving digest into {}", path.display()))?;
    info!(target: "pipeline", path = %path.display(), "digest written");
    Ok(())
}

pub fn read_digest(path: &Path) -> Result<Digest> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}
