// src/ingest/providers/arxiv.rs
//! arXiv API search (Atom response).
//!
//! Query shape: `(ti:"kw1" OR ti:"kw2") AND (cat:cs.AI OR cat:cs.LG)`, newest
//! submissions first. Entries older than the window are dropped. The
//! organization is the first author's first affiliation when the API exposes
//! one, else "arXiv".

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::config::ArxivConfig;
use crate::ingest::types::SourceProvider;
use crate::record::{Record, SourceType};
use crate::text::clean_text;

pub const ARXIV_ORG: &str = "arXiv";
pub const ARXIV_SOURCE_URL: &str = "https://arxiv.org/";

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    #[serde(rename = "author", default)]
    author: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<String>,
    /// `arxiv:affiliation`
    #[serde(rename = "affiliation", default)]
    affiliation: Vec<String>,
}

/// `(ti:"a" OR ti:"b") AND (cat:x OR cat:y)`
pub fn build_query(keywords: &[String], categories: &[String]) -> String {
    let kw = keywords
        .iter()
        .map(|k| format!(r#"ti:"{}""#, k.trim()))
        .collect::<Vec<_>>()
        .join(" OR ");
    let cats = categories
        .iter()
        .map(|c| format!("cat:{}", c.trim()))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("({kw}) AND ({cats})")
}

/// Full API URL for one search.
pub fn search_url(cfg: &ArxivConfig) -> Result<Url> {
    let mut url = Url::parse(&cfg.api_url).with_context(|| format!("arxiv api url {}", cfg.api_url))?;
    url.query_pairs_mut()
        .append_pair("search_query", &build_query(&cfg.keywords, &cfg.categories))
        .append_pair("start", "0")
        .append_pair("max_results", &cfg.max_results.to_string())
        .append_pair("sortBy", "submittedDate")
        .append_pair("sortOrder", "descending");
    Ok(url)
}

pub struct ArxivProvider {
    cfg: ArxivConfig,
    days_back: i64,
    mode: Mode,
    now: Option<DateTime<Utc>>,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl ArxivProvider {
    pub fn new(cfg: ArxivConfig, days_back: i64, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("research-digest/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building arxiv http client")?;
        Ok(Self {
            cfg,
            days_back,
            mode: Mode::Http { client },
            now: None,
        })
    }

    /// Provider over a saved API response.
    pub fn from_fixture(cfg: ArxivConfig, days_back: i64, xml: &str) -> Self {
        Self {
            cfg,
            days_back,
            mode: Mode::Fixture(xml.to_string()),
            now: None,
        }
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    fn records_from_str(&self, xml: &str, now: DateTime<Utc>) -> Result<Vec<Record>> {
        if !xml.contains("<feed") {
            return Err(anyhow!("arxiv response is not an atom feed"));
        }
        let feed: Feed = from_str(xml).context("parsing arxiv atom")?;
        let cutoff = now - ChronoDuration::days(self.days_back);
        let total = feed.entry.len();

        let mut out = Vec::with_capacity(total);
        for e in feed.entry {
            let Some(published) = e
                .published
                .as_deref()
                .and_then(|p| DateTime::parse_from_rfc3339(p.trim()).ok())
                .map(|d| d.with_timezone(&Utc))
            else {
                continue;
            };
            if published < cutoff {
                continue;
            }
            let title = clean_text(e.title.as_deref().unwrap_or_default());
            let url = e.id.as_deref().map(str::trim).unwrap_or_default().to_string();
            if title.is_empty() || url.is_empty() {
                continue;
            }
            let organization = e
                .author
                .first()
                .and_then(|a| a.affiliation.iter().map(|s| s.trim()).find(|s| !s.is_empty()))
                .unwrap_or(ARXIV_ORG)
                .to_string();
            let authors = e
                .author
                .iter()
                .filter_map(|a| a.name.as_deref().map(str::trim))
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect();

            out.push(Record::new(
                title,
                authors,
                organization,
                clean_text(e.summary.as_deref().unwrap_or_default()),
                url,
                published.to_rfc3339(),
                SourceType::Arxiv.as_str(),
                ARXIV_SOURCE_URL,
            )?);
        }
        info!(target: "ingest", provider = self.name(), entries = total, kept = out.len(), "arxiv papers collected");
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for ArxivProvider {
    async fn fetch_latest(&self) -> Result<Vec<Record>> {
        if self.cfg.keywords.is_empty() || self.cfg.categories.is_empty() {
            warn!(target: "ingest", "arxiv config missing keywords or categories; skipping");
            return Ok(Vec::new());
        }
        let now = self.now.unwrap_or_else(Utc::now);
        match &self.mode {
            Mode::Fixture(s) => self.records_from_str(s, now),
            Mode::Http { client } => {
                let url = search_url(&self.cfg)?;
                info!(target: "ingest", query = %build_query(&self.cfg.keywords, &self.cfg.categories), "arxiv query");
                let body = client
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .context("arxiv search request")?
                    .text()
                    .await
                    .context("reading arxiv response")?;
                self.records_from_str(&body, now)
            }
        }
    }

    fn name(&self) -> &str {
        ARXIV_ORG
    }
}
