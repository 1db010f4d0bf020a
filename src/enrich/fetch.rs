// src/enrich/fetch.rs
//! Outbound HTTP for enrichment: page GETs and JSON POSTs.
//!
//! `PageFetcher` is the seam; `HttpFetcher` is the reqwest-backed implementation
//! with a bounded timeout, one retry for transient failures and a user-agent
//! picked deterministically from the URL.

use async_trait::async_trait;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

use crate::config::EnrichConfig;

/// Realistic browser identification strings, rotated per URL.
pub const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Pick a user agent from a stable hash of the URL.
pub fn user_agent_for(url: &str) -> &'static str {
    let digest = Sha256::digest(url.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let idx = u64::from_be_bytes(head) % USER_AGENTS.len() as u64;
    USER_AGENTS[idx as usize]
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("non-text content type: {0}")]
    BinaryContent(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("request error: {0}")]
    Request(String),
}

impl FetchError {
    /// Timeouts, connection errors and 5xx are worth one more try.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Connect(_) => true,
            FetchError::Status(code) => *code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e.to_string())
        } else if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else if e.is_body() {
            FetchError::Body(e.to_string())
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

/// A fetched HTML page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub content_type: String,
    pub body: String,
}

impl FetchedPage {
    pub fn html(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: "text/html; charset=utf-8".to_string(),
            body: body.into(),
        }
    }

    /// True for PDF and generic binary payloads.
    pub fn is_binary(&self) -> bool {
        is_binary_content_type(&self.content_type)
    }
}

pub fn is_binary_content_type(ct: &str) -> bool {
    let ct = ct.to_ascii_lowercase();
    ct.contains("pdf") || ct.contains("octet-stream")
}

/// Anything that can GET a page or POST a JSON query.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get_page(&self, url: &str) -> Result<FetchedPage, FetchError>;

    /// POST `body` as JSON to `endpoint`; `user_agent_key` picks the user agent.
    async fn post_json(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
        user_agent_key: &str,
    ) -> Result<serde_json::Value, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    backoff: Duration,
}

impl HttpFetcher {
    pub fn new(cfg: &EnrichConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(cfg.timeout_secs.clamp(1, 5)))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            client,
            max_retries: cfg.max_retries,
            backoff: Duration::from_millis(cfg.backoff_ms),
        })
    }

    async fn get_once(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let rsp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent_for(url))
            .send()
            .await?;
        let status = rsp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let content_type = rsp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if is_binary_content_type(&content_type) {
            return Err(FetchError::BinaryContent(content_type));
        }
        let body = rsp.text().await.map_err(|e| FetchError::Body(e.to_string()))?;
        Ok(FetchedPage {
            url: url.to_string(),
            content_type,
            body,
        })
    }

    async fn post_once(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
        user_agent_key: &str,
    ) -> Result<serde_json::Value, FetchError> {
        let rsp = self
            .client
            .post(endpoint)
            .header(reqwest::header::USER_AGENT, user_agent_for(user_agent_key))
            .json(body)
            .send()
            .await?;
        let status = rsp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        rsp.json::<serde_json::Value>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        // 1x, 2x, 4x ... of the base backoff
        self.backoff * 2u32.saturating_pow(attempt)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn get_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            match self.get_once(url).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let wait = self.backoff_for(attempt);
                    debug!(target: "enrich", %url, error = %e, wait_ms = wait.as_millis() as u64, "retrying fetch");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_json(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
        user_agent_key: &str,
    ) -> Result<serde_json::Value, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            match self.post_once(endpoint, body, user_agent_key).await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    tokio::time::sleep(self.backoff_for(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
