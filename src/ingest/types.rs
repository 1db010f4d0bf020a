// src/ingest/types.rs
use anyhow::Result;

use crate::record::Record;

/// A source adapter: anything that can produce a batch of normalized records.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Record>>;
    fn name(&self) -> &str;
}
