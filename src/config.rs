// src/config.rs
//! Runtime configuration (`config/digest.toml`).
//!
//! Resolution order: explicit path (CLI) → `$DIGEST_CONFIG_PATH` →
//! `config/digest.toml` → built-in defaults. Every section and field is
//! optional; missing values fall back to the defaults below.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::lexicon::{Lexicon, LexiconConfig};

pub const ENV_PATH: &str = "DIGEST_CONFIG_PATH";
pub const DEFAULT_PATH: &str = "config/digest.toml";

pub const DEFAULT_FORUM_GRAPHQL_URL: &str = "https://www.lesswrong.com/graphql";
pub const DEFAULT_ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub lexicon: LexiconConfig,
    pub enrich: EnrichConfig,
    pub featured: FeaturedConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    /// Abstracts shorter than this (trimmed, in chars) get enriched.
    pub min_abstract_len: usize,
    /// Minimum paragraph length for the first-paragraph strategies.
    pub min_paragraph_len: usize,
    pub max_words: usize,
    pub max_concurrent: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub forum_graphql_url: String,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            min_abstract_len: 50,
            min_paragraph_len: 80,
            max_words: 150,
            max_concurrent: 5,
            timeout_secs: 10,
            max_retries: 1,
            backoff_ms: 1000,
            forum_graphql_url: DEFAULT_FORUM_GRAPHQL_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeaturedConfig {
    pub max_count: usize,
    pub min_score: f64,
}

impl Default for FeaturedConfig {
    fn default() -> Self {
        Self {
            max_count: 3,
            min_score: 12.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub days_back: i64,
    pub feeds: Vec<FeedConfig>,
    pub forum: Option<ForumConfig>,
    pub arxiv: Option<ArxivConfig>,
    pub dumps: Vec<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            days_back: 7,
            feeds: Vec::new(),
            forum: None,
            arxiv: None,
            dumps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FeedConfig {
    pub url: String,
    pub org: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForumConfig {
    pub min_karma: i64,
    pub max_results: usize,
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            min_karma: 50,
            max_results: 20,
        }
    }
}

/// `[ingest.arxiv]`: title keywords OR-ed together, restricted to the
/// listed categories.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArxivConfig {
    pub keywords: Vec<String>,
    pub categories: Vec<String>,
    pub max_results: usize,
    pub api_url: String,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            categories: Vec::new(),
            max_results: 40,
            api_url: DEFAULT_ARXIV_API_URL.to_string(),
        }
    }
}

impl DigestConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: DigestConfig = toml::from_str(s).context("parsing digest config")?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Load using the explicit path, then env var, then `config/digest.toml`.
    /// Defaults when nothing is found.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::load_from(p);
        }
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_PATH} points to non-existent path {}", pb.display()));
        }
        let fallback = PathBuf::from(DEFAULT_PATH);
        if fallback.exists() {
            return Self::load_from(&fallback);
        }
        Ok(Self::default())
    }

    pub fn lexicon(&self) -> Lexicon {
        Lexicon::from_config(&self.lexicon)
    }

    fn sanitize(&mut self) {
        let d = EnrichConfig::default();
        if self.enrich.max_concurrent == 0 {
            self.enrich.max_concurrent = d.max_concurrent;
        }
        if self.enrich.timeout_secs == 0 {
            self.enrich.timeout_secs = d.timeout_secs;
        }
        if self.enrich.max_words == 0 {
            self.enrich.max_words = d.max_words;
        }
        if self.ingest.days_back < 0 {
            self.ingest.days_back = IngestConfig::default().days_back;
        }
        self.ingest.feeds.retain(|f| !f.url.trim().is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = DigestConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.enrich.min_abstract_len, 50);
        assert_eq!(cfg.enrich.max_concurrent, 5);
        assert_eq!(cfg.featured.max_count, 3);
        assert_eq!(cfg.featured.min_score, 12.0);
        assert_eq!(cfg.ingest.days_back, 7);
        assert!(cfg.ingest.forum.is_none());
    }

    #[test]
    fn sections_override_and_sanitize() {
        let toml = r#"
            [enrich]
            max_concurrent = 0
            timeout_secs = 3

            [featured]
            min_score = 20.5

            [ingest]
            days_back = 14
            feeds = [
              { url = "https://blog.example/rss", org = "Example Lab", keywords = ["alignment"] },
              { url = "  ", org = "Broken" },
            ]
            forum = { min_karma = 75 }
        "#;
        let cfg = DigestConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.enrich.max_concurrent, 5);
        assert_eq!(cfg.enrich.timeout_secs, 3);
        assert_eq!(cfg.featured.min_score, 20.5);
        assert_eq!(cfg.ingest.days_back, 14);
        assert_eq!(cfg.ingest.feeds.len(), 1);
        assert_eq!(cfg.ingest.feeds[0].org, "Example Lab");
        let forum = cfg.ingest.forum.unwrap();
        assert_eq!(forum.min_karma, 75);
        assert_eq!(forum.max_results, 20);
    }

    #[serial_test::serial]
    #[test]
    fn load_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_PATH);

        let cfg = DigestConfig::load(None).unwrap();
        assert_eq!(cfg.featured.max_count, 3);

        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(tmp.path().join(DEFAULT_PATH), "[featured]\nmax_count = 4\n").unwrap();
        assert_eq!(DigestConfig::load(None).unwrap().featured.max_count, 4);

        let p = tmp.path().join("other.toml");
        fs::write(&p, "[featured]\nmax_count = 9\n").unwrap();
        env::set_var(ENV_PATH, p.display().to_string());
        assert_eq!(DigestConfig::load(None).unwrap().featured.max_count, 9);

        env::set_var(ENV_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(DigestConfig::load(None).is_err());
        env::remove_var(ENV_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
