//! Optional durable key-value store used to survive process restarts.

mod rest;
mod sync;

pub use rest::RestKvStore;
pub use sync::{StateSnapshot, SyncState, KEY_EPISODES, KEY_EPISODE_COUNTER, KEY_PREFERENCES, KEY_TITLES};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    ConnectionFailed(String),

    #[error("store API error: {0}")]
    ApiError(String),

    #[error("failed to decode store response: {0}")]
    Decode(String),
}

/// Remote key-value store contract.
///
/// Both operations are batched: one round trip per call regardless of how
/// many keys are involved.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Read several keys in one pipelined request. Missing keys come back
    /// as `None` in the same positions.
    async fn multi_get(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError>;

    /// Write several pairs in one pipelined request. The result carries a
    /// per-pair acknowledgment in the same order.
    async fn pipeline_set(&self, pairs: &[(String, String)]) -> Result<Vec<bool>, StoreError>;

    /// Liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}
