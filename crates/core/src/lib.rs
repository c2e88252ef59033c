pub mod cache;
pub mod codec;
pub mod config;
pub mod context;
pub mod danmaku;
pub mod matching;
pub mod prefs;
pub mod rate_limit;
pub mod registry;
pub mod source;
pub mod store;
pub mod testing;

pub use cache::TtlCache;
pub use config::{
    load_config, load_config_from_str, validate_config, CompiledFilter, Config, ConfigError,
    SanitizedConfig,
};
pub use context::{AggregationContext, CoreError, MatchOutcome};
pub use danmaku::{RawComments, WireComment};
pub use prefs::PreferenceMemory;
pub use rate_limit::SlidingWindowLimiter;
pub use registry::{Episode, NewEpisode, NewTitle, Registry, Title};
pub use source::{CompatSource, SourceAdapter, SourceError};
pub use store::{DurableStore, RestKvStore, StoreError, SyncState};
