//! Concurrent fan-out over source adapters.

use std::sync::Arc;

use futures::future::{join_all, select_all};
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::{SourceAdapter, SourceError};
use crate::danmaku::RawComments;
use crate::registry::NewTitle;

/// Search all adapters concurrently and merge their hits in adapter order.
///
/// A failed or timed-out adapter contributes nothing; the aggregation
/// continues with whatever the others returned.
pub async fn search_all(
    adapters: &[Arc<dyn SourceAdapter>],
    keyword: &str,
    timeout_ms: u64,
) -> Vec<NewTitle> {
    let calls = adapters.iter().map(|adapter| {
        let adapter = Arc::clone(adapter);
        let keyword = keyword.to_string();
        async move {
            let platform = adapter.platform().to_string();
            let result = timeout(Duration::from_millis(timeout_ms), adapter.search(&keyword))
                .await
                .unwrap_or(Err(SourceError::Timeout));
            (platform, result)
        }
    });

    let mut merged = Vec::new();
    for (platform, result) in join_all(calls).await {
        match result {
            Ok(hits) => {
                debug!(platform, hits = hits.len(), "source search succeeded");
                merged.extend(hits);
            }
            Err(e) => warn!(platform, error = %e, "source search failed"),
        }
    }
    merged
}

/// Race all adapters for a comment payload and take the fastest successful
/// non-empty result.
///
/// Only an empty (or failed) fastest result falls back to waiting for the
/// remaining calls; the first non-empty payload in completion order wins.
pub async fn fetch_fastest(
    adapters: &[Arc<dyn SourceAdapter>],
    locator: &str,
    timeout_ms: u64,
) -> Option<(String, RawComments)> {
    if adapters.is_empty() {
        return None;
    }

    let mut pending: Vec<_> = adapters
        .iter()
        .map(|adapter| {
            let adapter = Arc::clone(adapter);
            let locator = locator.to_string();
            Box::pin(async move {
                let platform = adapter.platform().to_string();
                let result = timeout(
                    Duration::from_millis(timeout_ms),
                    adapter.fetch_comments(&locator),
                )
                .await
                .unwrap_or(Err(SourceError::Timeout));
                (platform, result)
            })
        })
        .collect();

    while !pending.is_empty() {
        let ((platform, result), _index, rest) = select_all(pending).await;
        pending = rest;
        match result {
            Ok(raw) if !raw.is_empty() => {
                debug!(platform, "fastest source won the race");
                return Some((platform, raw));
            }
            Ok(_) => debug!(platform, "source returned empty payload, waiting for the rest"),
            Err(e) => warn!(platform, error = %e, "source comment fetch failed"),
        }
    }
    None
}
