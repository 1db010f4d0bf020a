// src/dedup.rs
//! Two-pass title deduplication.
//!
//! 1. Exact: records sharing a normalized title collapse to the one with the
//!    longest abstract (first seen wins ties). Groups keep first-seen order.
//! 2. Near: every surviving pair whose normalized titles have a similarity
//!    ratio strictly above [`NEAR_DUP_THRESHOLD`] loses the record with the
//!    shorter abstract; on a tie the later one goes.
//!
//! The second pass is O(n^2) over survivors, which is fine for weekly batches.

use std::collections::HashMap;
use tracing::info;

use crate::record::Record;
use crate::similarity::ratio;

/// Similarity above which two titles are considered the same item.
pub const NEAR_DUP_THRESHOLD: f64 = 0.85;

/// Lowercase, drop ASCII punctuation, collapse whitespace.
pub fn normalize_title(title: &str) -> String {
    let lowered: String = title
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Counts reported by [`deduplicate_with_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub exact_removed: usize,
    pub near_removed: usize,
}

/// Remove exact and near-duplicate records.
pub fn deduplicate(records: Vec<Record>) -> Vec<Record> {
    deduplicate_with_stats(records).0
}

pub fn deduplicate_with_stats(records: Vec<Record>) -> (Vec<Record>, DedupStats) {
    let mut stats = DedupStats::default();
    if records.is_empty() {
        return (records, stats);
    }
    let before = records.len();

    // Pass 1: exact normalized-title groups, keyed in first-seen order.
    let mut slot_by_key: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<(String, Record)> = Vec::new();
    for rec in records {
        let key = normalize_title(&rec.title);
        match slot_by_key.get(&key) {
            Some(&slot) => {
                stats.exact_removed += 1;
                if rec.abstract_len() > unique[slot].1.abstract_len() {
                    unique[slot].1 = rec;
                }
            }
            None => {
                slot_by_key.insert(key.clone(), unique.len());
                unique.push((key, rec));
            }
        }
    }
    if stats.exact_removed > 0 {
        info!(target: "dedup", removed = stats.exact_removed, "exact-title duplicates removed");
    }

    // Pass 2: pairwise near-duplicates.
    let lens: Vec<usize> = unique.iter().map(|(_, r)| r.abstract_len()).collect();
    let mut keep = vec![true; unique.len()];
    for i in 0..unique.len() {
        if !keep[i] {
            continue;
        }
        for j in (i + 1)..unique.len() {
            if !keep[j] {
                continue;
            }
            if ratio(&unique[i].0, &unique[j].0) > NEAR_DUP_THRESHOLD {
                if lens[j] > lens[i] {
                    keep[i] = false;
                    break;
                }
                keep[j] = false;
            }
        }
    }
    stats.near_removed = keep.iter().filter(|k| !**k).count();
    if stats.near_removed > 0 {
        info!(
            target: "dedup",
            removed = stats.near_removed,
            threshold = NEAR_DUP_THRESHOLD,
            "near-duplicate titles removed"
        );
    }

    let out: Vec<Record> = unique
        .into_iter()
        .zip(keep)
        .filter_map(|((_, rec), k)| k.then_some(rec))
        .collect();
    info!(target: "dedup", before, after = out.len(), "deduplication complete");
    (out, stats)
}
