//! Scriptable source adapter for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::time::{sleep, Duration};

use crate::danmaku::RawComments;
use crate::registry::NewTitle;
use crate::source::{SourceAdapter, SourceError};

/// A source adapter that serves pre-configured results.
pub struct MockSource {
    platform: String,
    search_hits: Vec<NewTitle>,
    comments: Option<RawComments>,
    fail: bool,
    delay_ms: u64,
    search_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MockSource {
    pub fn new(platform: &str) -> Self {
        Self {
            platform: platform.to_string(),
            search_hits: Vec::new(),
            comments: None,
            fail: false,
            delay_ms: 0,
            search_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Serve these titles for every search.
    pub fn with_search_hits(mut self, hits: Vec<NewTitle>) -> Self {
        self.search_hits = hits;
        self
    }

    /// Serve this payload for every comment fetch.
    pub fn with_comments(mut self, comments: RawComments) -> Self {
        self.comments = Some(comments);
        self
    }

    /// Fail every call.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Sleep before answering, to exercise timeouts and races.
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    async fn maybe_delay(&self) {
        if self.delay_ms > 0 {
            sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }
}

#[async_trait]
impl SourceAdapter for MockSource {
    fn platform(&self) -> &str {
        &self.platform
    }

    async fn search(&self, _keyword: &str) -> Result<Vec<NewTitle>, SourceError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_delay().await;
        if self.fail {
            return Err(SourceError::ApiError("mock failure".to_string()));
        }
        Ok(self.search_hits.clone())
    }

    async fn fetch_comments(&self, _locator: &str) -> Result<RawComments, SourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_delay().await;
        if self.fail {
            return Err(SourceError::ApiError("mock failure".to_string()));
        }
        Ok(self
            .comments
            .clone()
            .unwrap_or(RawComments::Objects(Vec::new())))
    }
}
