use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub danmaku: DanmakuConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub store: Option<StoreConfig>,
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    9321
}

/// TTL settings for the search and comment caches, in minutes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_search_ttl")]
    pub search_ttl_minutes: u64,
    #[serde(default = "default_comment_ttl")]
    pub comment_ttl_minutes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            search_ttl_minutes: default_search_ttl(),
            comment_ttl_minutes: default_comment_ttl(),
        }
    }
}

fn default_search_ttl() -> u64 {
    60
}

fn default_comment_ttl() -> u64 {
    360
}

/// Per-IP limit on upstream comment fetches. 0 disables limiting.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit")]
    pub max_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_minute: default_rate_limit(),
        }
    }
}

fn default_rate_limit() -> u32 {
    3
}

/// Normalization pipeline settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DanmakuConfig {
    /// Dedup window in minutes; 0 bypasses grouping.
    #[serde(default = "default_dedup_window")]
    pub dedup_window_minutes: u32,
    /// Comma-separated `/regex/` patterns; matching comments are dropped.
    #[serde(default)]
    pub blocked_words: String,
    /// Convert top/bottom-anchored comments to scrolling.
    #[serde(default)]
    pub convert_to_scroll: bool,
    /// Force all comment colors to white.
    #[serde(default)]
    pub force_white: bool,
}

impl Default for DanmakuConfig {
    fn default() -> Self {
        Self {
            dedup_window_minutes: default_dedup_window(),
            blocked_words: String::new(),
            convert_to_scroll: false,
            force_white: false,
        }
    }
}

fn default_dedup_window() -> u32 {
    1
}

/// Matching engine settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchingConfig {
    /// Platform try-order for automatic matching; a trailing wildcard is
    /// always appended at runtime.
    #[serde(default = "default_platform_order")]
    pub platform_order: Vec<String>,
    /// Episode titles matching this regex are dropped from listings.
    /// An invalid pattern falls back to the built-in default with a warning.
    #[serde(default)]
    pub episode_title_filter: Option<String>,
    #[serde(default = "default_true")]
    pub episode_title_filter_enabled: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            platform_order: default_platform_order(),
            episode_title_filter: None,
            episode_title_filter_enabled: default_true(),
        }
    }
}

fn default_platform_order() -> Vec<String> {
    ["qq", "qiyi", "youku", "imgo", "bilibili1", "renren"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

/// Optional remote key-value store used to survive restarts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// REST endpoint base URL.
    pub url: String,
    /// Bearer token.
    pub token: String,
}

/// Source adapter settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourcesConfig {
    /// Per-call timeout for adapter requests, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Upstream danmu servers speaking the same protocol.
    #[serde(default)]
    pub compat_servers: Vec<CompatServerConfig>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            compat_servers: Vec::new(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// One upstream protocol-compatible server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompatServerConfig {
    /// Platform tag episodes from this server are labeled with.
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// Sanitized config for API responses (store token redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub danmaku: DanmakuConfig,
    pub matching: MatchingConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<SanitizedStoreConfig>,
    pub sources: SanitizedSourcesConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStoreConfig {
    pub url: String,
    pub token_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSourcesConfig {
    pub timeout_ms: u64,
    pub compat_servers: Vec<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            cache: config.cache.clone(),
            rate_limit: config.rate_limit.clone(),
            danmaku: config.danmaku.clone(),
            matching: config.matching.clone(),
            store: config.store.as_ref().map(|s| SanitizedStoreConfig {
                url: s.url.clone(),
                token_configured: !s.token.is_empty(),
            }),
            sources: SanitizedSourcesConfig {
                timeout_ms: config.sources.timeout_ms,
                compat_servers: config
                    .sources
                    .compat_servers
                    .iter()
                    .map(|s| s.name.clone())
                    .collect(),
            },
        }
    }
}
