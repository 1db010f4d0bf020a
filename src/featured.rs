// src/featured.rs
//! Featured ("hero") selection and grid ordering.
//!
//! Score components, all additive:
//! - authority: top tier +20, else priority +12, else named non-community +5
//! - quality: `min(abstract_chars / 100, 5)`, research-y title +3, a real
//!   author +2, scholarly archive +3
//! - recency: `10 * exp(-0.2 * days_ago)`, 0 without a parseable date
//! - penalties: community/aggregator -5, abstract under 20 chars -3
//!
//! The total is rounded to two decimals. Selection walks the scores from the
//! top, stops at the first one under `min_score`, and never takes two records
//! from the same non-empty organization.

use chrono::NaiveDateTime;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

use crate::lexicon::Lexicon;
use crate::record::{Record, SourceType};
use crate::relevance::truncate_chars;

pub const FEATURED_MAX_COUNT: usize = 3;
pub const FEATURED_MIN_SCORE: f64 = 12.0;

const SCORE_TOP_TIER: f64 = 20.0;
const SCORE_PRIORITY: f64 = 12.0;
const SCORE_NAMED_ORG: f64 = 5.0;
const SCORE_RESEARCH_TITLE: f64 = 3.0;
const SCORE_REAL_AUTHOR: f64 = 2.0;
const SCORE_ARCHIVE: f64 = 3.0;
const RECENCY_MAX: f64 = 10.0;
const RECENCY_DECAY: f64 = 0.2;
const PENALTY_COMMUNITY: f64 = 5.0;
const PENALTY_THIN_ABSTRACT: f64 = 3.0;
const THIN_ABSTRACT_LEN: usize = 20;

fn re_research_title() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)\b(?:",
            r"paper|model|benchmark|evaluat\w+|framework|alignment|safety|",
            r"interpretab\w+|reward|reinforcement|fine[- ]?tun\w+|train\w+|",
            r"scal\w+|language model|LLM|agent|auditing|red[- ]?team\w+|",
            r"monitor\w+|oversight|robustness|jailbreak|watermark\w+|",
            r"decepti\w+|mesa[- ]?optim\w+|corrigib\w+|specification|",
            r"governance|regulation|risk|catastroph\w+|existential|",
            r"superint\w+|capability|dangerous|dual[- ]?use|biosecurity|",
            r"cyber|verification|detect\w+|mitigat\w+",
            r")\b",
        ))
        .expect("research title regex")
    })
}

fn has_real_author(authors: &[String]) -> bool {
    authors.iter().any(|a| {
        let a = a.trim();
        !a.is_empty() && !a.eq_ignore_ascii_case("unknown")
    })
}

/// Featured score for one record relative to `now`.
pub fn score(rec: &Record, lexicon: &Lexicon, now: NaiveDateTime) -> f64 {
    let org = rec.organization.as_str();
    let mut s = 0.0;

    if lexicon.is_top_tier(org) {
        s += SCORE_TOP_TIER;
    } else if lexicon.is_priority(org) {
        s += SCORE_PRIORITY;
    } else if !org.is_empty() && !lexicon.is_community(org) {
        s += SCORE_NAMED_ORG;
    }

    let abstract_len = rec.abstract_len();
    s += (abstract_len as f64 / 100.0).min(5.0);
    if re_research_title().is_match(&rec.title) {
        s += SCORE_RESEARCH_TITLE;
    }
    if has_real_author(&rec.authors) {
        s += SCORE_REAL_AUTHOR;
    }
    if rec.source_type == SourceType::Arxiv {
        s += SCORE_ARCHIVE;
    }

    if let Some(published) = rec.published_at() {
        let secs = (now - published).num_milliseconds() as f64 / 1000.0;
        let days_ago = (secs / 86_400.0).max(0.0);
        s += RECENCY_MAX * (-RECENCY_DECAY * days_ago).exp();
    }

    if lexicon.is_community(org) {
        s -= PENALTY_COMMUNITY;
    }
    if abstract_len < THIN_ABSTRACT_LEN {
        s -= PENALTY_THIN_ABSTRACT;
    }

    (s * 100.0).round() / 100.0
}

/// `(score, index)` for every record, best first; ties keep input order.
pub fn rank(records: &[Record], lexicon: &Lexicon, now: NaiveDateTime) -> Vec<(f64, usize)> {
    let mut scored: Vec<(f64, usize)> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (score(r, lexicon, now), i))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    scored
}

/// Up to `max_count` records scoring at least `min_score`, one per organization.
pub fn select_featured(
    records: &[Record],
    lexicon: &Lexicon,
    now: NaiveDateTime,
    max_count: usize,
    min_score: f64,
) -> Vec<Record> {
    let mut featured: Vec<Record> = Vec::new();
    let mut seen_orgs: HashSet<&str> = HashSet::new();

    for (s, idx) in rank(records, lexicon, now) {
        if featured.len() >= max_count || s < min_score {
            break;
        }
        let rec = &records[idx];
        let org = rec.organization.as_str();
        if !org.is_empty() && !seen_orgs.insert(org) {
            debug!(target: "featured", %org, title = %truncate_chars(&rec.title, 80), "skipped for diversity");
            continue;
        }
        debug!(target: "featured", score = s, title = %truncate_chars(&rec.title, 80), "featured");
        featured.push(rec.clone());
    }

    info!(target: "featured", selected = featured.len(), candidates = records.len(), "featured selection done");
    featured
}

/// Priority organizations first (in list order), then everything else;
/// newest first within each tier. Stable.
pub fn order_for_grid(mut records: Vec<Record>, lexicon: &Lexicon) -> Vec<Record> {
    let last = lexicon.priority_orgs().len();
    records.sort_by(|a, b| {
        let ta = lexicon.priority_tier(&a.organization).unwrap_or(last);
        let tb = lexicon.priority_tier(&b.organization).unwrap_or(last);
        ta.cmp(&tb).then_with(|| b.published_date.cmp(&a.published_date))
    });
    records
}

/// Distinct non-empty organizations: priority ones in list order, then the
/// rest alphabetically.
pub fn organizations(records: &[Record], lexicon: &Lexicon) -> Vec<String> {
    let present: BTreeSet<&str> = records
        .iter()
        .map(|r| r.organization.as_str())
        .filter(|o| !o.is_empty())
        .collect();

    let mut out: Vec<String> = Vec::with_capacity(present.len());
    let mut tiered: Vec<(usize, &str)> = present
        .iter()
        .filter_map(|o| lexicon.priority_tier(o).map(|t| (t, *o)))
        .collect();
    tiered.sort();
    out.extend(tiered.iter().map(|(_, o)| o.to_string()));
    out.extend(
        present
            .iter()
            .filter(|o| !lexicon.is_priority(o))
            .map(|o| o.to_string()),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn rec(title: &str, org: &str, abs_len: usize, date: &str, st: &str) -> Record {
        Record::new(
            title,
            vec!["Jane Doe".into()],
            org,
            "x".repeat(abs_len),
            format!("https://x.test/{title}"),
            date,
            st,
            "",
        )
        .unwrap()
    }

    #[test]
    fn score_components_add_up() {
        let lx = Lexicon::default_seed();
        // top tier 20 + abstract 5 + title 3 + author 2 + recency 10
        let r = rec("A new benchmark", "Anthropic", 800, "2025-03-10", "rss");
        assert_eq!(score(&r, &lx, now()), 40.0);

        // community: 0 - 5, abstract 0.1, thin -3, author 2, no date
        let r = rec("Weekly links", "LessWrong", 10, "", "rss");
        assert_eq!(score(&r, &lx, now()), -5.9);
    }

    #[test]
    fn recency_decays_and_future_dates_clamp() {
        let lx = Lexicon::default_seed();
        let week_old = rec("Notes", "", 100, "2025-03-03", "rss");
        // 1 + 2 + 10*exp(-1.4)
        assert_eq!(score(&week_old, &lx, now()), 5.47);
        let future = rec("Notes", "", 100, "2025-03-20T00:00:00Z", "rss");
        assert_eq!(score(&future, &lx, now()), 13.0);
    }

    #[test]
    fn unknown_author_does_not_count() {
        assert!(!has_real_author(&["Unknown".into(), "  ".into()]));
        assert!(has_real_author(&["unknown".into(), "Ada".into()]));
    }

    #[test]
    fn selection_respects_threshold_and_diversity() {
        let lx = Lexicon::default_seed();
        let rs = vec![
            rec("Alignment paper one", "Anthropic", 500, "2025-03-09", "rss"),
            rec("Alignment paper two", "Anthropic", 500, "2025-03-09", "rss"),
            rec("Safety benchmark", "OpenAI", 300, "2025-03-08", "rss"),
            rec("Random musings", "", 0, "", "rss"),
        ];
        let picked = select_featured(&rs, &lx, now(), 3, 12.0);
        let titles: Vec<&str> = picked.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Alignment paper one", "Safety benchmark"]);
        for r in &picked {
            assert!(score(r, &lx, now()) >= 12.0);
        }
    }

    #[test]
    fn grid_order_and_org_index() {
        let lx = Lexicon::default_seed();
        let rs = vec![
            rec("a", "Zeta Blog", 0, "2025-03-09", "rss"),
            rec("b", "OpenAI", 0, "2025-03-01", "rss"),
            rec("c", "Anthropic", 0, "2025-03-02", "rss"),
            rec("d", "OpenAI", 0, "2025-03-05", "rss"),
            rec("e", "Alpha Blog", 0, "2025-03-08", "rss"),
        ];
        let titles: Vec<String> = order_for_grid(rs.clone(), &lx)
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["c", "d", "b", "a", "e"]);
        assert_eq!(
            organizations(&rs, &lx),
            vec!["Anthropic", "OpenAI", "Alpha Blog", "Zeta Blog"]
        );
    }
}
