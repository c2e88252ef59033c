//! Per-client sliding-window rate limiter for the comment-fetch path.
//!
//! Callers must check the comment cache before consulting the limiter:
//! limiting guards the expensive upstream fetch, never repeat reads of
//! already-cached content.

use std::collections::HashMap;
use tokio::time::{Duration, Instant};
use tracing::debug;

const WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window request counter keyed by client id (usually the peer IP).
pub struct SlidingWindowLimiter {
    max_per_minute: u32,
    windows: HashMap<String, Vec<Instant>>,
}

impl SlidingWindowLimiter {
    /// `max_per_minute == 0` disables limiting entirely.
    pub fn new(max_per_minute: u32) -> Self {
        Self {
            max_per_minute,
            windows: HashMap::new(),
        }
    }

    /// Returns whether this request is allowed, recording it if so.
    pub fn allow(&mut self, client: &str) -> bool {
        if self.max_per_minute == 0 {
            return true;
        }
        let now = Instant::now();
        let window = self.windows.entry(client.to_string()).or_default();
        window.retain(|&t| now.duration_since(t) < WINDOW);
        if window.len() >= self.max_per_minute as usize {
            debug!(client, count = window.len(), "rate limit exceeded");
            return false;
        }
        window.push(now);
        true
    }

    /// Drop clients with no requests left in the window. Called periodically
    /// to bound memory; correctness never depends on it.
    pub fn sweep(&mut self) {
        let now = Instant::now();
        self.windows.retain(|_, window| {
            window.retain(|&t| now.duration_since(t) < WINDOW);
            !window.is_empty()
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}
