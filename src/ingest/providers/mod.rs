// src/ingest/providers/mod.rs
pub mod arxiv;
pub mod forum;
pub mod json_dump;
pub mod rss;

pub use arxiv::ArxivProvider;
pub use forum::ForumProvider;
pub use json_dump::JsonDumpProvider;
pub use rss::RssProvider;
