// src/relevance.rs
//! Relevance gate: keyword scoring against the lexicon's research vocabulary.
//!
//! - Records from the scholarly archive (`SourceType::Arxiv`) always pass.
//! - Otherwise the score is the number of *distinct* vocabulary terms found as
//!   substrings of `lowercase(title + " " + abstract)`.
//! - Trusted organizations need 1 hit, everyone else needs 2.

use metrics::counter;
use tracing::{debug, info};

use crate::lexicon::Lexicon;
use crate::record::{Record, SourceType};

pub const THRESHOLD_DEFAULT: usize = 2;
pub const THRESHOLD_TRUSTED_ORG: usize = 1;

/// Result of relevance evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Relevance {
    pub passed: bool,
    pub score: usize,
    pub threshold: usize,
    pub matched: Vec<String>,
    pub reasons: Vec<String>,
}

/// Full evaluation with matched terms and reasons, for diagnostics and tests.
pub fn evaluate(record: &Record, lexicon: &Lexicon) -> Relevance {
    let mut rel = Relevance::default();

    if record.source_type == SourceType::Arxiv {
        rel.passed = true;
        rel.reasons.push("trusted_source_type:arxiv".into());
        return rel;
    }

    let searchable = format!("{} {}", record.title, record.abstract_text).to_lowercase();
    rel.matched = lexicon
        .research_terms()
        .iter()
        .filter(|term| searchable.contains(term.as_str()))
        .cloned()
        .collect();
    rel.score = rel.matched.len();

    if lexicon.is_trusted(&record.organization) {
        rel.threshold = THRESHOLD_TRUSTED_ORG;
        rel.reasons.push("trusted_org".into());
    } else {
        rel.threshold = THRESHOLD_DEFAULT;
    }

    rel.passed = rel.score >= rel.threshold;
    rel.reasons.push(if rel.passed {
        format!("threshold_ok:{}", rel.threshold)
    } else {
        format!("threshold_fail:{}", rel.threshold)
    });
    rel
}

/// Pure yes/no decision.
pub fn is_relevant(record: &Record, lexicon: &Lexicon) -> bool {
    evaluate(record, lexicon).passed
}

/// Counts reported by [`filter_records`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub kept: usize,
    pub removed: usize,
}

/// Keep relevant records, preserving order.
pub fn filter_records(records: Vec<Record>, lexicon: &Lexicon) -> (Vec<Record>, FilterStats) {
    let before = records.len();
    let mut kept = Vec::with_capacity(before);
    for rec in records {
        let rel = evaluate(&rec, lexicon);
        if rel.passed {
            kept.push(rec);
        } else {
            debug!(
                target: "relevance",
                title = %truncate_chars(&rec.title, 80),
                score = rel.score,
                threshold = rel.threshold,
                matched = ?rel.matched,
                "record rejected"
            );
        }
    }

    let stats = FilterStats {
        kept: kept.len(),
        removed: before - kept.len(),
    };
    counter!("digest_filter_removed_total").increment(stats.removed as u64);
    info!(
        target: "relevance",
        kept = stats.kept,
        removed = stats.removed,
        total = before,
        "research filter applied"
    );
    (kept, stats)
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(title: &str, abs: &str, org: &str, st: &str) -> Record {
        Record::new(title, vec![], org, abs, "https://x.test", "", st, "").unwrap()
    }

    #[test]
    fn arxiv_always_passes() {
        let lx = Lexicon::default_seed();
        let r = rec("Cooking tips", "", "", "arxiv");
        assert!(is_relevant(&r, &lx));
    }

    #[test]
    fn repeated_term_counts_once() {
        let lx = Lexicon::from_lists(vec!["safety".into()], vec![], vec![], vec![], vec![]);
        let r = rec("Safety safety SAFETY", "safety", "", "rss");
        let rel = evaluate(&r, &lx);
        assert_eq!(rel.score, 1);
        assert!(!rel.passed);
    }

    #[test]
    fn trusted_org_threshold_is_one() {
        let lx = Lexicon::from_lists(
            vec!["benchmark".into()],
            vec!["Acme".into()],
            vec![],
            vec![],
            vec![],
        );
        assert!(is_relevant(&rec("A benchmark", "", "ACME", "scrape"), &lx));
        assert!(!is_relevant(&rec("A recipe", "", "Acme", "scrape"), &lx));
        assert!(!is_relevant(&rec("A benchmark", "", "Other", "scrape"), &lx));
    }

    #[test]
    fn filter_preserves_order_and_counts() {
        let lx = Lexicon::default_seed();
        let input = vec![
            rec("New benchmark for model evaluation", "", "", "rss"),
            rec("Weekend photos", "", "", "rss"),
            rec("Anything", "", "", "arxiv"),
        ];
        let (out, stats) = filter_records(input, &lx);
        assert_eq!(stats, FilterStats { kept: 2, removed: 1 });
        assert_eq!(out[0].title, "New benchmark for model evaluation");
        assert_eq!(out[1].title, "Anything");
    }
}
