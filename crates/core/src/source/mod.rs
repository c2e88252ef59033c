//! Source adapter contract and fan-out helpers.
//!
//! A source adapter knows how to talk to one upstream platform: search for
//! titles by keyword and fetch the raw comment payload for an episode
//! locator. The core never interprets locators beyond routing them back to
//! the adapter that produced them.

mod compat;
mod fanout;

pub use compat::CompatSource;
pub use fanout::{fetch_fastest, search_all};

use async_trait::async_trait;
use thiserror::Error;

use crate::danmaku::RawComments;
use crate::registry::NewTitle;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream connection failed: {0}")]
    ConnectionFailed(String),

    #[error("upstream API error: {0}")]
    ApiError(String),

    #[error("failed to decode upstream payload: {0}")]
    Decode(String),
}

/// One upstream platform.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Platform tag, used for routing locators and labeling episodes.
    fn platform(&self) -> &str;

    /// Search for titles matching a keyword. Episodes must be materialized.
    async fn search(&self, keyword: &str) -> Result<Vec<NewTitle>, SourceError>;

    /// Fetch the raw comment payload for an episode locator.
    async fn fetch_comments(&self, locator: &str) -> Result<RawComments, SourceError>;
}
