// tests/common/mod.rs
// Offline PageFetcher for integration tests: canned pages, canned JSON,
// call log and an in-flight high-water mark.
#![allow(dead_code)]

use async_trait::async_trait;
use research_digest::enrich::{FetchError, FetchedPage, PageFetcher};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct StubFetcher {
    pages: HashMap<String, FetchedPage>,
    statuses: HashMap<String, u16>,
    json: HashMap<String, Value>,
    delay: Option<Duration>,
    gets: Mutex<Vec<String>>,
    posts: Mutex<Vec<Value>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), FetchedPage::html(url, html));
        self
    }

    pub fn binary(mut self, url: &str, content_type: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            FetchedPage {
                url: url.to_string(),
                content_type: content_type.to_string(),
                body: String::new(),
            },
        );
        self
    }

    pub fn status(mut self, url: &str, code: u16) -> Self {
        self.statuses.insert(url.to_string(), code);
        self
    }

    pub fn json(mut self, endpoint: &str, body: Value) -> Self {
        self.json.insert(endpoint.to_string(), body);
        self
    }

    pub fn delay(mut self, d: Duration) -> Self {
        self.delay = Some(d);
        self
    }

    pub fn gets(&self) -> Vec<String> {
        self.gets.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<Value> {
        self.posts.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn get_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.gets.lock().unwrap().push(url.to_string());
        self.enter().await;
        let out = if let Some(code) = self.statuses.get(url) {
            Err(FetchError::Status(*code))
        } else {
            self.pages.get(url).cloned().ok_or(FetchError::Status(404))
        };
        self.leave();
        out
    }

    async fn post_json(
        &self,
        endpoint: &str,
        body: &Value,
        _user_agent_key: &str,
    ) -> Result<Value, FetchError> {
        self.posts.lock().unwrap().push(body.clone());
        self.enter().await;
        let out = self.json.get(endpoint).cloned().ok_or(FetchError::Status(404));
        self.leave();
        out
    }
}
