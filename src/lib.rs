// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod dedup;
pub mod enrich;
pub mod featured;
pub mod ingest;
pub mod lexicon;
pub mod pipeline;
pub mod record;
pub mod relevance;
pub mod similarity;
pub mod text;

// ---- Re-exports for a stable public API ----
pub use crate::config::DigestConfig;
pub use crate::dedup::deduplicate;
pub use crate::enrich::enrich;
pub use crate::featured::select_featured;
pub use crate::lexicon::Lexicon;
pub use crate::pipeline::Digest;
pub use crate::record::{Record, RecordError, SourceType};
pub use crate::relevance::{filter_records, is_relevant};
