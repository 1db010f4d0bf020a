// src/ingest/providers/json_dump.rs
//! Records replayed from a JSON dump on disk (a previous run, or another tool).

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use crate::ingest::types::SourceProvider;
use crate::record::{records_from_json, Record};

pub struct JsonDumpProvider {
    path: PathBuf,
    name: String,
}

impl JsonDumpProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("dump:{}", path.display());
        Self { path, name }
    }
}

#[async_trait]
impl SourceProvider for JsonDumpProvider {
    async fn fetch_latest(&self) -> Result<Vec<Record>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))?;
        records_from_json(&raw).with_context(|| format!("parsing {}", self.path.display()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
