// src/record.rs
//! Normalized content record shared by every source adapter and pipeline stage.
//!
//! Identity is the `url` (plus its `source_type`); only `abstract_text` is
//! rewritten as a record moves through enrichment and cleanup.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Validation failures raised while constructing a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("source_type must be one of [rss, arxiv, scrape, api, social], got '{0}'")]
    InvalidSourceType(String),

    #[error("record title must not be empty")]
    EmptyTitle,
}

/// Where a record came from. `Arxiv` is the scholarly archive and is always
/// trusted by the relevance gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SourceType {
    Rss,
    Arxiv,
    Scrape,
    Api,
    Social,
}

impl SourceType {
    pub const ALL: [SourceType; 5] = [
        SourceType::Rss,
        SourceType::Arxiv,
        SourceType::Scrape,
        SourceType::Api,
        SourceType::Social,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Rss => "rss",
            SourceType::Arxiv => "arxiv",
            SourceType::Scrape => "scrape",
            SourceType::Api => "api",
            SourceType::Social => "social",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rss" | "feed" => Ok(SourceType::Rss),
            "arxiv" => Ok(SourceType::Arxiv),
            "scrape" => Ok(SourceType::Scrape),
            "api" => Ok(SourceType::Api),
            "social" | "twitter" => Ok(SourceType::Social),
            _ => Err(RecordError::InvalidSourceType(s.to_string())),
        }
    }
}

impl TryFrom<String> for SourceType {
    type Error = RecordError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SourceType> for String {
    fn from(value: SourceType) -> Self {
        value.as_str().to_string()
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// One paper, post or article, normalized across sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub organization: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    pub url: String,
    /// ISO-8601 timestamp.
    #[serde(default)]
    pub published_date: String,
    pub source_type: SourceType,
    #[serde(default)]
    pub source_url: String,
    #[serde(default = "now_rfc3339")]
    pub fetched_at: String,
}

impl Record {
    /// Build a record from adapter output; fails on an unknown `source_type`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: impl Into<String>,
        authors: Vec<String>,
        organization: impl Into<String>,
        abstract_text: impl Into<String>,
        url: impl Into<String>,
        published_date: impl Into<String>,
        source_type: &str,
        source_url: impl Into<String>,
    ) -> Result<Self, RecordError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(RecordError::EmptyTitle);
        }
        Ok(Self {
            title,
            authors,
            organization: organization.into(),
            abstract_text: abstract_text.into(),
            url: url.into(),
            published_date: published_date.into(),
            source_type: source_type.parse()?,
            source_url: source_url.into(),
            fetched_at: now_rfc3339(),
        })
    }

    /// Character length of the abstract (not bytes).
    pub fn abstract_len(&self) -> usize {
        self.abstract_text.chars().count()
    }

    /// Character length of the trimmed abstract, used for the "missing" check.
    pub fn trimmed_abstract_len(&self) -> usize {
        self.abstract_text.trim().chars().count()
    }

    /// `published_date` as a naive timestamp, if it parses.
    pub fn published_at(&self) -> Option<NaiveDateTime> {
        parse_iso_date(&self.published_date)
    }
}

/// Lenient ISO-8601 parse into a naive timestamp.
///
/// Strings containing `T` are read as a full timestamp (offset optional, `Z`
/// accepted) and keep their wall-clock time; anything else is read from its
/// first ten chars as `YYYY-MM-DD` at midnight.
pub fn parse_iso_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.contains('T') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.naive_local());
        }
        return ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok());
    }
    let head: String = s.chars().take(10).collect();
    NaiveDate::parse_from_str(&head, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse a JSON array of records, or an object wrapping them as `{"records": [...]}`.
pub fn records_from_json(s: &str) -> anyhow::Result<Vec<Record>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Dump {
        List(Vec<Record>),
        Wrapped { records: Vec<Record> },
    }
    let dump: Dump = serde_json::from_str(s)?;
    let records = match dump {
        Dump::List(v) => v,
        Dump::Wrapped { records } => records,
    };
    // Same rule as `Record::new`; serde bypasses the constructor.
    if let Some(i) = records.iter().position(|r| r.title.trim().is_empty()) {
        return Err(anyhow::Error::new(RecordError::EmptyTitle).context(format!("record #{i}")));
    }
    Ok(records)
}
