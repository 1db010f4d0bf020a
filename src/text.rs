// src/text.rs
//! Text cleanup shared by enrichment and the final output pass.
//!
//! Every function here is total: worst case it hands back the input (or "").

use once_cell::sync::OnceCell;
use regex::Regex;

/// Default word cap for abstracts.
pub const MAX_ABSTRACT_WORDS: usize = 150;

/// A sentence break must sit past this share of the truncated text to be used.
pub const SENTENCE_CUT_RATIO: f64 = 0.6;

/// Looser cut ratio applied by the output-stage cleanup.
pub const OUTPUT_SENTENCE_CUT_RATIO: f64 = 0.5;

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag regex"))
}

fn re_ws() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

fn re_label_prefix() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:Abstract\s*[:.\-]\s*|Summary\s*[:.\-]\s*|TL;?\s*DR\s*[:.\-]\s*)")
            .expect("label prefix regex")
    })
}

fn re_cta_suffix() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\s*(?:Read more\.?|Continue reading\.?|Click here\.?|Learn more\.?|See more\.?|View full (?:article|paper|post)\.?)\.?\s*$",
        )
        .expect("cta suffix regex")
    })
}

fn re_date_prefixes() -> &'static [Regex; 3] {
    static RE: OnceCell<[Regex; 3]> = OnceCell::new();
    RE.get_or_init(|| {
        [
            // "Published on March 3, 2025 10:00 AM GMT"
            Regex::new(r"^Published on [A-Z][a-z]+ \d{1,2}, \d{4}\s*\d*:?\d*\s*[AP]?M?\s*GMT\s*")
                .expect("published-on regex"),
            // "Blog Safety & Security • Mar 3, 2025"
            Regex::new(
                r"^(?:Blog|Research|Report|Paper)\s+[\w\s&]+\x{2022}\s*(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d{1,2},?\s+\d{4}\s*",
            )
            .expect("category-bullet regex"),
            // "16 May 2024"
            Regex::new(r"^\d{1,2}\s+(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d{4}\s*")
                .expect("day-month-year regex"),
        ]
    })
}

fn collapse_ws(s: &str) -> String {
    re_ws().replace_all(s, " ").trim().to_string()
}

/// Unescape HTML entities, drop leftover tags, collapse whitespace, trim.
pub fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let untagged = re_tags().replace_all(&decoded, " ");
    collapse_ws(&untagged)
}

/// Remove a leading "Abstract:"/"Summary:"/"TL;DR:" label and a trailing
/// call-to-action such as "Read more." or "View full paper".
pub fn strip_boilerplate(s: &str) -> String {
    let out = re_label_prefix().replace(s, "");
    let out = out.trim();
    let out = re_cta_suffix().replace(out, "");
    out.trim().to_string()
}

/// Cap `text` at `max_words` words, preferring a sentence boundary past 60%.
pub fn cap_words(text: &str, max_words: usize) -> String {
    cap_words_at(text, max_words, SENTENCE_CUT_RATIO)
}

/// Same as [`cap_words`] with an explicit boundary ratio.
///
/// Under the cap the input comes back untouched. Over it, the first
/// `max_words` words are joined with single spaces; when the last ". " in that
/// prefix lies strictly after `ratio` of its length the text is cut right after
/// the period, otherwise "..." is appended.
pub fn cap_words_at(text: &str, max_words: usize, ratio: f64) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_string();
    }
    let truncated = words[..max_words].join(" ");
    if let Some(byte_idx) = truncated.rfind(". ") {
        let char_idx = truncated[..byte_idx].chars().count();
        let total = truncated.chars().count();
        if char_idx as f64 > total as f64 * ratio {
            return truncated[..byte_idx + 1].to_string();
        }
    }
    truncated + "..."
}

/// Drop leading bylines and date stamps that feeds prepend to summaries.
pub fn strip_date_boilerplate(s: &str) -> String {
    let mut out = s.to_string();
    for re in re_date_prefixes() {
        out = re.replace(&out, "").to_string();
    }
    out.trim().to_string()
}

/// Pipeline used on freshly extracted text: clean, strip labels/CTAs, cap.
pub fn finalize_abstract(s: &str, max_words: usize) -> String {
    let cleaned = clean_text(s);
    let stripped = strip_boilerplate(&cleaned);
    cap_words(&stripped, max_words)
}

/// Final output pass applied to every abstract before it is written out.
pub fn clean_for_output(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let untagged = re_tags().replace_all(s, " ");
    let collapsed = collapse_ws(&untagged);
    let undated = strip_date_boilerplate(&collapsed);
    cap_words_at(&undated, MAX_ABSTRACT_WORDS, OUTPUT_SENTENCE_CUT_RATIO)
}
