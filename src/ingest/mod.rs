// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::SourceProvider;
use crate::record::Record;
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

/// One-time metrics registration.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "digest_records_ingested_total",
            "Records produced by source providers."
        );
        describe_counter!(
            "digest_dedup_removed_total",
            "Records removed as exact or near duplicates."
        );
        describe_counter!(
            "digest_filter_removed_total",
            "Records rejected by the relevance filter."
        );
        describe_counter!(
            "digest_enriched_total",
            "Abstracts replaced with text fetched from the record URL."
        );
        describe_counter!(
            "digest_synthetic_total",
            "Abstracts replaced with a sentence built from metadata."
        );
        describe_counter!(
            "digest_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_histogram!("digest_feed_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// Run every provider once and concatenate their records in provider order.
/// A failing provider is logged and counted; the others still contribute.
pub async fn run_once(providers: &[Box<dyn SourceProvider>]) -> Vec<Record> {
    ensure_metrics_described();

    let mut raw = Vec::new();
    for p in providers {
        match p.fetch_latest().await {
            Ok(mut v) => {
                info!(target: "ingest", provider = p.name(), count = v.len(), "provider done");
                raw.append(&mut v);
            }
            Err(e) => {
                warn!(target: "ingest", error = ?e, provider = p.name(), "provider error");
                counter!("digest_provider_errors_total").increment(1);
            }
        }
    }

    counter!("digest_records_ingested_total").increment(raw.len() as u64);
    raw
}

/// Keep records published within `days` of `now`. Undated or unparseable
/// records are dropped; future-dated ones are kept.
pub fn within_window(records: Vec<Record>, now: DateTime<Utc>, days: i64) -> Vec<Record> {
    let cutoff = (now - Duration::days(days)).naive_utc();
    let before = records.len();
    let kept: Vec<Record> = records
        .into_iter()
        .filter(|r| r.published_at().is_some_and(|t| t >= cutoff))
        .collect();
    info!(target: "ingest", before, after = kept.len(), days, "date window applied");
    kept
}
