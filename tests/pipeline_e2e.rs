// tests/pipeline_e2e.rs
// Dump on disk → ingest → full pipeline → digest file, with a stub fetcher.
mod common;

use chrono::{TimeZone, Utc};
use common::StubFetcher;
use research_digest::ingest::providers::JsonDumpProvider;
use research_digest::ingest::types::SourceProvider;
use research_digest::pipeline::{read_digest, run, run_with_stats, write_digest};
use research_digest::{ingest, DigestConfig, Lexicon, Record};
use std::collections::HashSet;

const DUMP: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/records.json");
const THRESHOLDS_URL: &str = "https://openai.example/research/thresholds";
const THRESHOLDS_DESC: &str =
    "We evaluate dangerous capability thresholds for frontier models and describe the mitigations applied at each level.";

async fn ingest_fixture() -> Vec<Record> {
    let providers: Vec<Box<dyn SourceProvider>> = vec![Box::new(JsonDumpProvider::new(DUMP))];
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
    ingest::within_window(ingest::run_once(&providers).await, now, 7)
}

fn stub() -> StubFetcher {
    StubFetcher::new().page(
        THRESHOLDS_URL,
        &format!(r#"<html><head><meta property="og:description" content="{THRESHOLDS_DESC}"></head></html>"#),
    )
}

#[tokio::test]
async fn full_run_produces_consistent_digest() {
    let records = ingest_fixture().await;
    assert_eq!(records.len(), 6);

    let cfg = DigestConfig::default();
    let lx = Lexicon::default_seed();
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
    let fetcher = stub();
    let (digest, stats) = run_with_stats(records, &lx, &cfg, Some(&fetcher), now).await;

    assert_eq!(stats.input, 6);
    assert_eq!(stats.exact_dupes, 1);
    assert_eq!(stats.filtered_out, 1);
    assert_eq!(stats.enrich.enriched, 1);

    assert_eq!(digest.total_count, 4);
    assert_eq!(digest.featured.len() + digest.records.len(), digest.total_count);
    assert_eq!(digest.week_start, "2025-03-03");
    assert_eq!(digest.week_end, "2025-03-10");
    assert_eq!(digest.organizations, vec!["Anthropic", "OpenAI"]);

    // featured: best first, one per org, never repeated in the grid
    assert_eq!(digest.featured[0].title, "Alignment auditing at scale");
    let featured_urls: HashSet<&str> = digest.featured.iter().map(|r| r.url.as_str()).collect();
    assert!(digest.records.iter().all(|r| !featured_urls.contains(r.url.as_str())));
    let orgs: Vec<&str> = digest
        .featured
        .iter()
        .map(|r| r.organization.as_str())
        .filter(|o| !o.is_empty())
        .collect();
    assert_eq!(orgs.len(), orgs.iter().collect::<HashSet<_>>().len());

    let all: Vec<&Record> = digest.featured.iter().chain(digest.records.iter()).collect();
    assert!(all.iter().all(|r| !r.abstract_text.trim().is_empty()));
    assert!(all.iter().all(|r| r.title != "Team offsite recap"));

    let scaling = all
        .iter()
        .find(|r| r.title.to_lowercase().starts_with("scaling laws"))
        .expect("one scaling-laws record survives");
    assert_eq!(scaling.url, "https://arxiv.org/abs/2501.00002");

    let thresholds = all.iter().find(|r| r.url == THRESHOLDS_URL).unwrap();
    assert_eq!(thresholds.abstract_text, THRESHOLDS_DESC);
}

#[tokio::test]
async fn grid_lists_priority_orgs_first() {
    let records = ingest_fixture().await;
    let cfg = DigestConfig {
        featured: research_digest::config::FeaturedConfig {
            max_count: 0,
            min_score: 12.0,
        },
        ..DigestConfig::default()
    };
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
    let digest = run(records, &Lexicon::default_seed(), &cfg, None, now).await;
    assert!(digest.featured.is_empty());
    let titles: Vec<&str> = digest.records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Alignment auditing at scale",
            "Red teaming frontier models",
            "Evaluating dangerous capability thresholds",
            "Scaling laws for transformer models!!",
        ]
    );
}

#[tokio::test]
async fn offline_run_synthesizes_and_writes_to_disk() {
    let records = ingest_fixture().await;
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
    let digest = run(records, &Lexicon::default_seed(), &DigestConfig::default(), None, now).await;

    let all: Vec<&Record> = digest.featured.iter().chain(digest.records.iter()).collect();
    let thresholds = all.iter().find(|r| r.url == THRESHOLDS_URL).unwrap();
    assert_eq!(
        thresholds.abstract_text,
        "Research from OpenAI titled 'Evaluating dangerous capability thresholds'. Published 2025-03-07. Authors: Sam Tester."
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("digest.json");
    write_digest(&path, &digest).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["total_count"], 4);
    assert!(json["records"][0].get("abstract").is_some());
    assert_eq!(read_digest(&path).unwrap(), digest);
}

#[tokio::test]
async fn empty_input_gives_empty_digest() {
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
    let digest = run(vec![], &Lexicon::default_seed(), &DigestConfig::default(), None, now).await;
    assert_eq!(digest.total_count, 0);
    assert!(digest.featured.is_empty());
    assert!(digest.organizations.is_empty());
}
