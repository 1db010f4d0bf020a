// src/ingest/providers/forum.rs
//! Top forum posts of the window, via the forum's GraphQL endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::config::ForumConfig;
use crate::enrich::PageFetcher;
use crate::ingest::types::SourceProvider;
use crate::record::{Record, SourceType};

pub const FORUM_ORG: &str = "LessWrong";
pub const FORUM_BASE_URL: &str = "https://www.lesswrong.com";
const EXCERPT_MAX_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
struct Response {
    data: Option<Data>,
}

#[derive(Debug, Deserialize)]
struct Data {
    posts: Option<Posts>,
}

#[derive(Debug, Deserialize)]
struct Posts {
    #[serde(default)]
    results: Vec<Post>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Post {
    title: Option<String>,
    page_url: Option<String>,
    posted_at: Option<String>,
    base_score: Option<i64>,
    excerpt: Option<String>,
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    display_name: Option<String>,
}

/// GraphQL body asking for the top `limit` posts since `after` (`YYYY-MM-DD`).
pub fn top_posts_request(after: &str, limit: usize) -> serde_json::Value {
    let query = format!(
        r#"{{ posts(input: {{ terms: {{ after: "{after}", limit: {limit}, sortedBy: "top" }} }}) {{ results {{ title pageUrl postedAt baseScore excerpt user {{ displayName }} }} }} }}"#
    );
    json!({ "query": query, "variables": {} })
}

/// Cut at `max` chars, back off to the last space, and mark the cut.
fn truncate_excerpt(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max).collect();
    let cut = head.rsplit_once(' ').map(|(h, _)| h).unwrap_or(head.as_str());
    format!("{cut}...")
}

fn absolute_url(page_url: Option<&str>) -> String {
    match page_url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(u) if u.starts_with('/') => format!("{FORUM_BASE_URL}{u}"),
        Some(u) => u.to_string(),
        None => format!("{FORUM_BASE_URL}/"),
    }
}

pub struct ForumProvider {
    endpoint: String,
    cfg: ForumConfig,
    days_back: i64,
    fetcher: Arc<dyn PageFetcher>,
    now: Option<DateTime<Utc>>,
}

impl ForumProvider {
    pub fn new(
        endpoint: impl Into<String>,
        cfg: ForumConfig,
        days_back: i64,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            cfg,
            days_back,
            fetcher,
            now: None,
        }
    }

    /// Pin the reference time (the window start is derived from it).
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    fn records_from_response(&self, data: serde_json::Value, now: DateTime<Utc>) -> Result<Vec<Record>> {
        let rsp: Response = serde_json::from_value(data).context("decoding forum response")?;
        let posts = rsp.data.and_then(|d| d.posts).map(|p| p.results).unwrap_or_default();

        let mut out = Vec::new();
        for post in posts {
            let score = post.base_score.unwrap_or(0);
            if score < self.cfg.min_karma {
                continue;
            }
            let title = post.title.as_deref().map(str::trim).unwrap_or_default();
            if title.is_empty() {
                continue;
            }
            let author = post
                .user
                .and_then(|u| u.display_name)
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Unknown".to_string());
            let abstract_text = post
                .excerpt
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(|e| truncate_excerpt(e, EXCERPT_MAX_CHARS))
                .unwrap_or_else(|| format!("{FORUM_ORG} post with {score} karma."));
            let published = post
                .posted_at
                .as_deref()
                .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
                .map(|d| d.to_rfc3339())
                .unwrap_or_else(|| now.to_rfc3339());

            out.push(Record::new(
                title,
                vec![author],
                FORUM_ORG,
                abstract_text,
                absolute_url(post.page_url.as_deref()),
                published,
                SourceType::Api.as_str(),
                self.endpoint.clone(),
            )?);
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for ForumProvider {
    async fn fetch_latest(&self) -> Result<Vec<Record>> {
        let now = self.now.unwrap_or_else(Utc::now);
        let after = (now - Duration::days(self.days_back)).format("%Y-%m-%d").to_string();
        let body = top_posts_request(&after, self.cfg.max_results);

        let data = self
            .fetcher
            .post_json(&self.endpoint, &body, &self.endpoint)
            .await
            .context("forum top-posts query")?;
        let out = self.records_from_response(data, now)?;
        info!(target: "ingest", provider = self.name(), kept = out.len(), min_karma = self.cfg.min_karma, "forum posts collected");
        Ok(out)
    }

    fn name(&self) -> &str {
        FORUM_ORG
    }
}
