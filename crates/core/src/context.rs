//! The aggregation context - owns all runtime state and drives the
//! search / match / comment flows end to end.
//!
//! One instance lives behind an `Arc` for the lifetime of the process. All
//! interior state sits behind async locks so handlers can share it freely;
//! durable-store writes happen on a fire-and-forget task after each mutation
//! so request latency never waits on the store.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::config::{CompiledFilter, Config};
use crate::danmaku::{normalize, NormalizeError, NormalizeOptions, WireComment};
use crate::matching::{
    fallback_match, parse_file_name, platform_try_order, resolve_match, ParsedFileName,
};
use crate::prefs::{self, PreferenceMemory};
use crate::rate_limit::SlidingWindowLimiter;
use crate::registry::{self, Episode, Registry, Title};
use crate::source::{fetch_fastest, search_all, SourceAdapter, SourceError};
use crate::store::{DurableStore, StateSnapshot, SyncState};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("upstream request timed out: {0}")]
    UpstreamTimeout(String),

    #[error("upstream request failed: {0}")]
    UpstreamFailure(String),

    #[error("rate limited")]
    RateLimited,
}

/// A successful automatic match for one file name.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub title_id: u32,
    pub title_name: String,
    pub category: String,
    pub episode_id: u32,
    pub episode_title: String,
}

pub struct AggregationContext {
    config: Config,
    blocked: CompiledFilter,
    episode_filter: CompiledFilter,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    registry: RwLock<Registry>,
    search_cache: Mutex<TtlCache<Vec<Title>>>,
    comment_cache: Mutex<TtlCache<Vec<WireComment>>>,
    prefs: Mutex<PreferenceMemory>,
    limiter: Mutex<SlidingWindowLimiter>,
    sync: Option<Mutex<SyncState>>,
}

impl AggregationContext {
    pub fn new(
        config: Config,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        store: Option<Arc<dyn DurableStore>>,
    ) -> Self {
        let blocked = CompiledFilter::from_blocked_words(&config.danmaku.blocked_words);
        let episode_filter =
            CompiledFilter::episode_title_filter(config.matching.episode_title_filter.as_deref());
        Self {
            search_cache: Mutex::new(TtlCache::new(config.cache.search_ttl_minutes)),
            comment_cache: Mutex::new(TtlCache::new(config.cache.comment_ttl_minutes)),
            limiter: Mutex::new(SlidingWindowLimiter::new(config.rate_limit.max_per_minute)),
            registry: RwLock::new(Registry::new(registry::DEFAULT_CAPACITY)),
            prefs: Mutex::new(PreferenceMemory::new(prefs::DEFAULT_CAPACITY)),
            sync: store.map(|s| Mutex::new(SyncState::new(s))),
            blocked,
            episode_filter,
            adapters,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Restore registry and preference state from the durable store. Runs
    /// the store read at most once per process lifetime; safe to call again.
    pub async fn ensure_loaded(&self) {
        let Some(sync) = &self.sync else {
            return;
        };
        let Some(loaded) = sync.lock().await.load().await else {
            return;
        };

        let titles: Vec<Title> = loaded
            .titles
            .as_deref()
            .and_then(|v| decode_or_warn(v, "titles"))
            .unwrap_or_default();
        let episodes: Vec<Episode> = loaded
            .episodes
            .as_deref()
            .and_then(|v| decode_or_warn(v, "episodes"))
            .unwrap_or_default();
        let counter: u32 = loaded
            .episode_counter
            .as_deref()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0);
        let preferences = loaded
            .preferences
            .as_deref()
            .and_then(|v| decode_or_warn(v, "preferences"))
            .unwrap_or_default();

        let restored = titles.len();
        self.registry.write().await.restore(titles, episodes, counter);
        self.prefs.lock().await.restore(preferences);
        info!(titles = restored, "restored state from durable store");
    }

    /// Drop expired rate-limit windows. Intended for a periodic task.
    pub async fn sweep_rate_limiter(&self) {
        self.limiter.lock().await.sweep();
    }

    /// Search all sources for a keyword, merging hits into the registry.
    ///
    /// Served from the search cache when fresh. An upstream failure on every
    /// source degrades to an empty result rather than an error.
    pub async fn search(self: &Arc<Self>, keyword: &str) -> Result<Vec<Title>, CoreError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(CoreError::InvalidInput("empty search keyword".to_string()));
        }

        if let Some(hit) = self.search_cache.lock().await.get(keyword) {
            debug!(keyword, "search cache hit");
            return Ok(hit);
        }

        let hits = search_all(&self.adapters, keyword, self.config.sources.timeout_ms).await;
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(hits.len());
        let mut titles = Vec::with_capacity(hits.len());
        {
            let mut registry = self.registry.write().await;
            for hit in hits {
                let id = hit.id;
                match registry.add_title(hit) {
                    // Sources can agree on an id; report the merged entry
                    // once.
                    Ok(()) if !ids.contains(&id) => ids.push(id),
                    Ok(()) => {}
                    Err(e) => warn!(error = %e, "skipping unusable search hit"),
                }
            }
            for id in &ids {
                if let Some(title) = registry.get_title(*id) {
                    titles.push(title.clone());
                }
            }
        }

        self.prefs.lock().await.record(keyword, ids);
        self.search_cache
            .lock()
            .await
            .set(keyword, titles.clone());
        self.spawn_sync();

        Ok(titles)
    }

    /// Search restricted to episodes whose title contains `episode`.
    ///
    /// Titles left with no episodes after filtering are dropped.
    pub async fn search_episodes(
        self: &Arc<Self>,
        anime: &str,
        episode: Option<&str>,
    ) -> Result<Vec<Title>, CoreError> {
        let mut titles = self.search(anime).await?;
        if let Some(needle) = episode.map(str::trim).filter(|s| !s.is_empty()) {
            for title in &mut titles {
                title.episodes.retain(|ep| ep.title.contains(needle));
                title.episode_count = title.episodes.len() as u32;
            }
            titles.retain(|t| !t.episodes.is_empty());
        }
        Ok(titles)
    }

    /// Look up one registered title with its episode listing.
    pub async fn bangumi(&self, title_id: u32) -> Result<Title, CoreError> {
        self.registry
            .read()
            .await
            .get_title(title_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("title {title_id} is not registered")))
    }

    /// Resolve a file name to a registered episode.
    ///
    /// Searches with the parsed title, then walks the platform try-order;
    /// the wildcard pass and the final fallback make a hit likely whenever
    /// any candidate exists. A hit pins the title for future searches of the
    /// same keyword.
    pub async fn match_file(
        self: &Arc<Self>,
        file_name: &str,
    ) -> Result<Option<MatchOutcome>, CoreError> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return Err(CoreError::InvalidInput("empty file name".to_string()));
        }

        let parsed = parse_file_name(file_name);
        debug!(
            title = %parsed.title,
            season = ?parsed.season,
            episode = ?parsed.episode,
            platform = ?parsed.platform,
            "parsed file name"
        );

        let titles = self.search(&parsed.title).await?;
        if titles.is_empty() {
            return Ok(None);
        }

        let preferred_id = self.prefs.lock().await.preferred_for(&parsed.title);
        let resolved = self.resolve(&titles, &parsed, preferred_id);

        let Some((title_id, episode)) = resolved else {
            return Ok(None);
        };

        if let Some(keyword) = self.prefs.lock().await.pin(title_id) {
            debug!(title_id, keyword, "pinned matched title");
        }
        self.spawn_sync();

        let registry = self.registry.read().await;
        let Some(title) = registry.get_title(title_id) else {
            return Ok(None);
        };
        Ok(Some(MatchOutcome {
            title_id,
            title_name: title.display_title.clone(),
            category: title.category.clone(),
            episode_id: episode.id,
            episode_title: episode.title,
        }))
    }

    fn resolve(
        &self,
        titles: &[Title],
        parsed: &ParsedFileName,
        preferred_id: Option<u32>,
    ) -> Option<(u32, Episode)> {
        let order = platform_try_order(
            parsed.platform.as_deref(),
            &self.config.matching.platform_order,
        );
        for platform in &order {
            if let Some(found) = resolve_match(
                titles,
                parsed,
                platform.as_deref(),
                preferred_id,
                &self.episode_filter,
                self.config.matching.episode_title_filter_enabled,
            ) {
                return Some(found);
            }
        }
        fallback_match(
            titles,
            parsed,
            &self.episode_filter,
            self.config.matching.episode_title_filter_enabled,
        )
    }

    /// Fetch the normalized comments of a registered episode.
    ///
    /// A cache hit bypasses the rate limiter entirely; only requests that
    /// would reach an upstream source count against the client.
    pub async fn comments_for_episode(
        self: &Arc<Self>,
        episode_id: u32,
        client: &str,
    ) -> Result<Vec<WireComment>, CoreError> {
        let (locator, title_id) = {
            let registry = self.registry.read().await;
            let locator = registry.find_episode_url(episode_id).ok_or_else(|| {
                CoreError::NotFound(format!("episode {episode_id} is not registered"))
            })?;
            let title_id = registry.find_title_by_episode_id(episode_id).map(|t| t.id);
            (locator, title_id)
        };

        // Keyed by the resolved locator, so episode ids sharing one source
        // URL (and by-url requests for it) share the cache entry.
        if let Some(hit) = self.comment_cache.lock().await.get(&locator) {
            debug!(episode_id, "comment cache hit");
            return Ok(hit);
        }

        if !self.limiter.lock().await.allow(client) {
            return Err(CoreError::RateLimited);
        }

        let (platform, raw) = self.fetch_raw(&locator).await?;
        let comments = self.run_pipeline(raw, &platform)?;
        self.comment_cache
            .lock()
            .await
            .set(locator, comments.clone());

        if let Some(title_id) = title_id {
            self.prefs.lock().await.pin(title_id);
        }
        self.spawn_sync();

        Ok(comments)
    }

    /// Fetch normalized comments for a raw page URL, racing every source.
    pub async fn comments_for_url(
        self: &Arc<Self>,
        url: &str,
        client: &str,
    ) -> Result<Vec<WireComment>, CoreError> {
        let url = url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(CoreError::InvalidInput(
                "url must be http(s)".to_string(),
            ));
        }

        if let Some(hit) = self.comment_cache.lock().await.get(url) {
            debug!(url, "comment cache hit");
            return Ok(hit);
        }

        if !self.limiter.lock().await.allow(client) {
            return Err(CoreError::RateLimited);
        }

        let Some((platform, raw)) =
            fetch_fastest(&self.adapters, url, self.config.sources.timeout_ms).await
        else {
            return Ok(Vec::new());
        };
        let comments = self.run_pipeline(raw, &platform)?;
        self.comment_cache.lock().await.set(url, comments.clone());
        Ok(comments)
    }

    /// Fetch the raw payload for a locator, routed to the owning adapter by
    /// its `platform://` scheme; an unclaimed locator races all adapters.
    async fn fetch_raw(
        &self,
        locator: &str,
    ) -> Result<(String, crate::danmaku::RawComments), CoreError> {
        let owner = self
            .adapters
            .iter()
            .find(|a| locator.starts_with(&format!("{}://", a.platform())));

        match owner {
            Some(adapter) => {
                let raw = timeout(
                    Duration::from_millis(self.config.sources.timeout_ms),
                    adapter.fetch_comments(locator),
                )
                .await
                .unwrap_or(Err(SourceError::Timeout))
                .map_err(map_source_error)?;
                Ok((adapter.platform().to_string(), raw))
            }
            None => fetch_fastest(&self.adapters, locator, self.config.sources.timeout_ms)
                .await
                .ok_or_else(|| {
                    CoreError::UpstreamFailure("no source produced comments".to_string())
                }),
        }
    }

    fn run_pipeline(
        &self,
        raw: crate::danmaku::RawComments,
        platform: &str,
    ) -> Result<Vec<WireComment>, CoreError> {
        let opts = NormalizeOptions {
            blocked: &self.blocked,
            window_minutes: self.config.danmaku.dedup_window_minutes,
            to_scroll: self.config.danmaku.convert_to_scroll,
            force_white: self.config.danmaku.force_white,
        };
        match normalize(raw, platform, &opts) {
            Ok(comments) => Ok(comments),
            Err(NormalizeError::EmptyInput) => Ok(Vec::new()),
            Err(e @ NormalizeError::UnrecognizedShape) => {
                Err(CoreError::UpstreamFailure(e.to_string()))
            }
        }
    }

    /// Serialize the durable state under the registry and preference locks.
    async fn snapshot_state(&self) -> StateSnapshot {
        let (titles, episodes, counter) = {
            let registry = self.registry.read().await;
            (
                registry.snapshot_titles(),
                registry.snapshot_episodes(),
                registry.episode_counter(),
            )
        };
        let preferences = self.prefs.lock().await.snapshot();
        StateSnapshot {
            titles: encode_or_empty(&titles),
            episodes: encode_or_empty(&episodes),
            episode_counter: counter.to_string(),
            preferences: encode_or_empty(&preferences),
        }
    }

    /// Push dirty state to the durable store without blocking the caller.
    fn spawn_sync(self: &Arc<Self>) {
        if self.sync.is_none() {
            return;
        }
        let ctx = Arc::clone(self);
        tokio::spawn(async move {
            let Some(sync) = &ctx.sync else {
                return;
            };
            let snapshot = ctx.snapshot_state().await;
            match sync.lock().await.sync(&snapshot).await {
                Ok(0) => {}
                Ok(written) => debug!(keys = written, "synced state to durable store"),
                Err(e) => warn!(error = %e, "durable store sync failed"),
            }
        });
    }
}

fn map_source_error(e: SourceError) -> CoreError {
    match e {
        SourceError::Timeout => CoreError::UpstreamTimeout(e.to_string()),
        other => CoreError::UpstreamFailure(other.to_string()),
    }
}

fn decode_or_warn<T: serde::de::DeserializeOwned>(value: &str, key: &str) -> Option<T> {
    match serde_json::from_str(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(key, error = %e, "discarding undecodable durable state");
            None
        }
    }
}

fn encode_or_empty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
}
