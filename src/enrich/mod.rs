// src/enrich/mod.rs
//! Abstract enrichment.
//!
//! Records whose trimmed abstract is shorter than `min_abstract_len` get a
//! second chance: the forum API (for forum post URLs), then the page itself
//! through the archive lookup and the generic strategy chain. Fetches run
//! concurrently up to `max_concurrent`; each in-flight task owns exactly one
//! `&mut Record`. Whatever is still short afterwards gets a sentence built
//! from its metadata, so every record leaves here with a non-empty abstract.

pub mod fetch;
pub mod forum;
pub mod strategies;

use futures::stream::{self, StreamExt};
use metrics::counter;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::EnrichConfig;
use crate::record::Record;
use crate::relevance::truncate_chars;
use crate::text::{cap_words, finalize_abstract};

pub use fetch::{FetchError, FetchedPage, HttpFetcher, PageFetcher};
use strategies::ExtractLimits;

/// Default "missing abstract" bar, in chars.
pub const MIN_ABSTRACT_LEN: usize = 50;

/// Counts reported by [`enrich_records`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichStats {
    /// Records that needed enrichment.
    pub candidates: usize,
    /// Abstracts replaced with fetched text.
    pub enriched: usize,
    /// Fetches that errored out (logged, not raised).
    pub failed: usize,
    /// Abstracts replaced with the metadata sentence.
    pub synthetic: usize,
}

enum Outcome {
    Enriched,
    NotFound,
    Failed,
}

pub fn needs_enrichment(rec: &Record, min_len: usize) -> bool {
    rec.trimmed_abstract_len() < min_len
}

fn limits(cfg: &EnrichConfig) -> ExtractLimits {
    ExtractLimits {
        min_abstract_len: cfg.min_abstract_len,
        min_paragraph_len: cfg.min_paragraph_len,
    }
}

/// Try to pull an abstract for `url`. `Ok(None)` means nothing usable was
/// found; `Err` means the page fetch itself failed.
pub async fn extract_abstract(
    fetcher: &dyn PageFetcher,
    url: &str,
    cfg: &EnrichConfig,
) -> Result<Option<(&'static str, String)>, FetchError> {
    if strategies::is_pdf_url(url) {
        debug!(target: "enrich", %url, "skipping pdf url");
        return Ok(None);
    }
    let limits = limits(cfg);
    let finish = |name: &'static str, text: String| Some((name, finalize_abstract(&text, cfg.max_words)));

    if forum::post_id(url).is_some() {
        if let Some(t) =
            forum::fetch_excerpt(fetcher, &cfg.forum_graphql_url, url, cfg.min_abstract_len).await
        {
            return Ok(finish("forum_api", t));
        }
    }

    let page = fetcher.get_page(url).await?;
    if page.is_binary() {
        return Err(FetchError::BinaryContent(page.content_type));
    }

    if strategies::is_arxiv_url(url) {
        if let Some(t) = strategies::arxiv_abstract(&page.body, &limits) {
            return Ok(finish("arxiv", t));
        }
        if let Some(alt) = strategies::arxiv_alt_url(url) {
            debug!(target: "enrich", %url, %alt, "trying arxiv alternate");
            match fetcher.get_page(&alt).await {
                Ok(alt_page) if !alt_page.is_binary() => {
                    if let Some(t) = strategies::arxiv_blockquote(&alt_page.body, &limits) {
                        return Ok(finish("arxiv_alt", t));
                    }
                }
                Ok(_) => {}
                Err(e) => debug!(target: "enrich", %alt, error = %e, "arxiv alternate fetch failed"),
            }
        }
    }

    Ok(strategies::run_chain(&page.body, url, &limits).and_then(|(name, t)| finish(name, t)))
}

/// "Research from {org} titled '{title}'. Published {date}. Authors: a, b, c and N others."
pub fn synthetic_abstract(rec: &Record) -> String {
    let mut sentence = if rec.organization.is_empty() {
        "Research".to_string()
    } else {
        format!("Research from {}", rec.organization)
    };
    if !rec.title.is_empty() {
        sentence.push_str(&format!(" titled '{}'", rec.title));
    }
    sentence.push('.');

    let mut parts = vec![sentence];
    if !rec.published_date.is_empty() {
        let date: String = rec.published_date.chars().take(10).collect();
        parts.push(format!("Published {date}."));
    }
    if !rec.authors.is_empty() {
        let mut names = rec.authors.iter().take(3).cloned().collect::<Vec<_>>().join(", ");
        if rec.authors.len() > 3 {
            names.push_str(&format!(" and {} others", rec.authors.len() - 3));
        }
        parts.push(format!("Authors: {names}."));
    }
    parts.join(" ")
}

/// Sequential sweep in input order: synthesize for anything still short.
pub fn apply_synthetic(records: &mut [Record], min_len: usize) -> usize {
    let mut n = 0;
    for rec in records.iter_mut().filter(|r| needs_enrichment(r, min_len)) {
        rec.abstract_text = synthetic_abstract(rec);
        debug!(target: "enrich", title = %truncate_chars(&rec.title, 80), "synthetic abstract");
        n += 1;
    }
    n
}

/// Enrich short abstracts in place and return the counts.
pub async fn enrich_records(
    records: &mut [Record],
    fetcher: &dyn PageFetcher,
    cfg: &EnrichConfig,
) -> EnrichStats {
    let t0 = Instant::now();
    let mut stats = EnrichStats {
        candidates: records
            .iter()
            .filter(|r| needs_enrichment(r, cfg.min_abstract_len))
            .count(),
        ..Default::default()
    };

    if stats.candidates == 0 {
        info!(target: "enrich", total = records.len(), "all abstracts long enough; nothing to enrich");
        return stats;
    }
    info!(target: "enrich", candidates = stats.candidates, total = records.len(), "enriching abstracts");

    let outcomes: Vec<Outcome> = stream::iter(
        records
            .iter_mut()
            .filter(|r| needs_enrichment(r, cfg.min_abstract_len)),
    )
    .map(move |rec| async move {
        match extract_abstract(fetcher, &rec.url, cfg).await {
            Ok(Some((strategy, text))) => {
                rec.abstract_text = cap_words(&text, cfg.max_words);
                debug!(target: "enrich", strategy, title = %truncate_chars(&rec.title, 80), "enriched");
                Outcome::Enriched
            }
            Ok(None) => {
                debug!(target: "enrich", url = %rec.url, "no abstract found");
                Outcome::NotFound
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!(target: "enrich", url = %rec.url, error = %e, "enrichment fetch failed");
                } else {
                    debug!(target: "enrich", url = %rec.url, error = %e, "enrichment fetch rejected");
                }
                Outcome::Failed
            }
        }
    })
    .buffer_unordered(cfg.max_concurrent.max(1))
    .collect()
    .await;

    for o in &outcomes {
        match o {
            Outcome::Enriched => stats.enriched += 1,
            Outcome::Failed => stats.failed += 1,
            Outcome::NotFound => {}
        }
    }

    stats.synthetic = apply_synthetic(records, cfg.min_abstract_len);

    counter!("digest_enriched_total").increment(stats.enriched as u64);
    counter!("digest_synthetic_total").increment(stats.synthetic as u64);
    info!(
        target: "enrich",
        enriched = stats.enriched,
        candidates = stats.candidates,
        failed = stats.failed,
        synthetic = stats.synthetic,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "enrichment complete"
    );
    stats
}

/// By-value form of [`enrich_records`].
pub async fn enrich(
    mut records: Vec<Record>,
    fetcher: &dyn PageFetcher,
    cfg: &EnrichConfig,
) -> Vec<Record> {
    enrich_records(&mut records, fetcher, cfg).await;
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(org: &str, date: &str, authors: &[&str]) -> Record {
        Record::new(
            "Scaling Oversight",
            authors.iter().map(|s| s.to_string()).collect(),
            org,
            "",
            "https://x.test/a",
            date,
            "rss",
            "",
        )
        .unwrap()
    }

    #[test]
    fn synthetic_bare() {
        assert_eq!(synthetic_abstract(&rec("", "", &[])), "Research titled 'Scaling Oversight'.");
    }

    #[test]
    fn synthetic_full() {
        let r = rec("Acme Lab", "2025-03-04T10:00:00Z", &["A", "B", "C", "D", "E"]);
        assert_eq!(
            synthetic_abstract(&r),
            "Research from Acme Lab titled 'Scaling Oversight'. Published 2025-03-04. Authors: A, B, C and 2 others."
        );
    }

    #[test]
    fn synthetic_sweep_only_touches_short() {
        let mut rs = vec![rec("", "", &[]), rec("", "", &[])];
        rs[1].abstract_text = "x".repeat(60);
        assert_eq!(apply_synthetic(&mut rs, MIN_ABSTRACT_LEN), 1);
        assert_eq!(rs[1].abstract_text, "x".repeat(60));
    }
}
