// src/ingest/providers/rss.rs
//! RSS 2.0 and Atom feeds.
//!
//! One provider per configured feed. Items without a parseable date are
//! dropped; when the feed has keywords, items matching none of them are
//! dropped too.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, info};

use crate::config::FeedConfig;
use crate::ingest::types::SourceProvider;
use crate::record::{Record, SourceType};
use crate::text::clean_text;

const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    /// `content:encoded`; the deserializer matches local names.
    #[serde(rename = "encoded")]
    content: Option<String>,
    author: Option<String>,
    /// `dc:creator`
    #[serde(rename = "creator")]
    creator: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    title: Option<AtomText>,
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    #[serde(rename = "author", default)]
    author: Vec<AtomAuthor>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

/// Feed-agnostic item before it becomes a [`Record`].
struct FeedEntry {
    title: String,
    link: String,
    published: Option<OffsetDateTime>,
    summary: String,
    authors: Vec<String>,
}

fn parse_rfc2822(ts: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822).ok()
}

fn parse_rfc3339(ts: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(ts.trim(), &Rfc3339).ok()
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn rss_entries(rss: Rss) -> Vec<FeedEntry> {
    let channel_title = non_empty(rss.channel.title.as_deref());
    rss.channel
        .item
        .into_iter()
        .map(|it| {
            let authors = non_empty(it.author.as_deref())
                .or_else(|| non_empty(it.creator.as_deref()))
                .or_else(|| channel_title.clone())
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
            FeedEntry {
                title: it.title.unwrap_or_default(),
                link: it.link.unwrap_or_default().trim().to_string(),
                published: it.pub_date.as_deref().and_then(|d| parse_rfc2822(d).or_else(|| parse_rfc3339(d))),
                summary: non_empty(it.description.as_deref())
                    .or_else(|| non_empty(it.content.as_deref()))
                    .unwrap_or_default(),
                authors: vec![authors],
            }
        })
        .collect()
}

fn atom_entries(feed: AtomFeed) -> Vec<FeedEntry> {
    let feed_title = feed.title.as_ref().and_then(|t| non_empty(Some(t.value.as_str())));
    feed.entry
        .into_iter()
        .map(|e| {
            let mut authors: Vec<String> = e
                .author
                .iter()
                .filter_map(|a| non_empty(a.name.as_deref()))
                .collect();
            if authors.is_empty() {
                authors.push(feed_title.clone().unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()));
            }
            let link = e
                .link
                .iter()
                .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
                .or_else(|| e.link.first())
                .map(|l| l.href.trim().to_string())
                .unwrap_or_default();
            FeedEntry {
                title: e.title.map(|t| t.value).unwrap_or_default(),
                link,
                published: e
                    .published
                    .as_deref()
                    .and_then(parse_rfc3339)
                    .or_else(|| e.updated.as_deref().and_then(parse_rfc3339)),
                summary: e
                    .summary
                    .and_then(|t| non_empty(Some(t.value.as_str())))
                    .or_else(|| e.content.and_then(|t| non_empty(Some(t.value.as_str()))))
                    .unwrap_or_default(),
                authors,
            }
        })
        .collect()
}

/// Parse either flavour, picked by the root element.
fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let xml = scrub_html_entities_for_xml(xml);
    if xml.contains("<rss") {
        let rss: Rss = from_str(&xml).context("parsing rss xml")?;
        Ok(rss_entries(rss))
    } else if xml.contains("<feed") {
        let atom: AtomFeed = from_str(&xml).context("parsing atom xml")?;
        Ok(atom_entries(atom))
    } else {
        Err(anyhow!("document is neither rss nor atom"))
    }
}

pub struct RssProvider {
    feed: FeedConfig,
    keywords: Vec<String>,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl RssProvider {
    /// Provider that reads the feed over HTTP.
    pub fn new(feed: FeedConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("research-digest/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building feed http client")?;
        Ok(Self::with_mode(feed, Mode::Http { client }))
    }

    /// Provider over an in-memory document (tests, replays).
    pub fn from_fixture(feed: FeedConfig, xml: &str) -> Self {
        Self::with_mode(feed, Mode::Fixture(xml.to_string()))
    }

    fn with_mode(feed: FeedConfig, mode: Mode) -> Self {
        let keywords = feed
            .keywords
            .iter()
            .flatten()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { feed, keywords, mode }
    }

    fn matches_keywords(&self, title: &str, summary: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let searchable = format!("{title} {summary}").to_lowercase();
        self.keywords.iter().any(|k| searchable.contains(k.as_str()))
    }

    fn records_from_str(&self, xml: &str) -> Result<Vec<Record>> {
        let t0 = std::time::Instant::now();
        let entries = parse_feed(xml).with_context(|| format!("feed {}", self.name()))?;
        let total = entries.len();

        let mut out = Vec::with_capacity(total);
        for e in entries {
            let Some(published) = e.published else {
                debug!(target: "ingest", feed = self.name(), title = %e.title, "skipping undated entry");
                continue;
            };
            let title = clean_text(&e.title);
            let summary = clean_text(&e.summary);
            if !self.matches_keywords(&title, &summary) {
                continue;
            }
            let published = published
                .to_offset(UtcOffset::UTC)
                .format(&Rfc3339)
                .context("formatting published date")?;
            match Record::new(
                title,
                e.authors,
                self.feed.org.clone(),
                summary,
                e.link,
                published,
                SourceType::Rss.as_str(),
                self.feed.url.clone(),
            ) {
                Ok(r) => out.push(r),
                Err(err) => debug!(target: "ingest", feed = self.name(), error = %err, "dropping entry"),
            }
        }

        histogram!("digest_feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        info!(target: "ingest", feed = self.name(), entries = total, kept = out.len(), "feed parsed");
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for RssProvider {
    async fn fetch_latest(&self) -> Result<Vec<Record>> {
        match &self.mode {
            Mode::Fixture(s) => self.records_from_str(s),
            Mode::Http { client } => {
                let body = client
                    .get(&self.feed.url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .with_context(|| format!("GET {}", self.feed.url))?
                    .text()
                    .await
                    .context("reading feed body")?;
                self.records_from_str(&body)
            }
        }
    }

    fn name(&self) -> &str {
        self.feed.name.as_deref().unwrap_or(&self.feed.url)
    }
}

/// HTML entities that are not valid XML but show up in real feeds.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
