//! Bounded registry of discovered titles and their episodes.
//!
//! Titles are kept in discovery order and evicted strict-FIFO past the
//! configured capacity; episode ids are process-unique, monotonically
//! increasing and never reused, and an identical `(url, title)` pair always
//! resolves to the id it was first given.

mod fifo;

pub use fifo::FifoMap;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

/// Default maximum number of titles retained.
pub const DEFAULT_CAPACITY: usize = 100;

/// Episode ids start here so they never collide with low sequence numbers
/// handed out by upstream platforms.
const FIRST_EPISODE_ID: u32 = 10_001;

/// One aggregated work as surfaced by search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Title {
    pub id: u32,
    pub external_id: String,
    /// Display title; encodes the source tag and year where known.
    pub display_title: String,
    pub category: String,
    pub image_url: String,
    pub start_date: String,
    pub episode_count: u32,
    pub rating: f64,
    pub episodes: Vec<Episode>,
}

/// One playable unit within a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: u32,
    /// Opaque locator handed back to the owning source adapter.
    pub url: String,
    /// May carry a bracketed platform prefix, e.g. `【qq】第1集`.
    pub title: String,
}

/// A title as reported by a source adapter, before episode ids exist.
#[derive(Debug, Clone)]
pub struct NewTitle {
    pub id: u32,
    pub display_title: String,
    pub category: String,
    pub image_url: String,
    pub start_date: String,
    pub rating: f64,
    pub episodes: Vec<NewEpisode>,
}

#[derive(Debug, Clone)]
pub struct NewEpisode {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("title {0:?} has no episodes")]
    MissingEpisodes(String),

    #[error("episode {index} of title {title:?} has no url")]
    EpisodeMissingUrl { title: String, index: usize },
}

/// In-memory title/episode store with FIFO eviction.
pub struct Registry {
    capacity: usize,
    titles: FifoMap<u32, Title>,
    /// `(url, episode title)` to allocated id.
    episode_ids: HashMap<(String, String), u32>,
    next_episode_id: u32,
}

impl Registry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            titles: FifoMap::new(),
            episode_ids: HashMap::new(),
            next_episode_id: FIRST_EPISODE_ID,
        }
    }

    /// Allocate (or look up) the episode id for a `(url, title)` pair.
    pub fn add_episode(&mut self, url: &str, title: &str) -> u32 {
        let key = (url.to_string(), title.to_string());
        if let Some(&id) = self.episode_ids.get(&key) {
            return id;
        }
        let id = self.next_episode_id;
        self.next_episode_id += 1;
        self.episode_ids.insert(key, id);
        id
    }

    /// Insert or refresh a title, relocating it to the most-recent position.
    ///
    /// Evicts the oldest title (and its episodes' url associations) once the
    /// capacity is exceeded.
    pub fn add_title(&mut self, new: NewTitle) -> Result<(), RegistryError> {
        if new.episodes.is_empty() {
            return Err(RegistryError::MissingEpisodes(new.display_title));
        }
        for (index, ep) in new.episodes.iter().enumerate() {
            if ep.url.is_empty() {
                return Err(RegistryError::EpisodeMissingUrl {
                    title: new.display_title,
                    index,
                });
            }
        }

        let episodes: Vec<Episode> = new
            .episodes
            .iter()
            .map(|ep| Episode {
                id: self.add_episode(&ep.url, &ep.title),
                url: ep.url.clone(),
                title: ep.title.clone(),
            })
            .collect();

        let title = Title {
            id: new.id,
            external_id: new.id.to_string(),
            display_title: new.display_title,
            category: new.category,
            image_url: new.image_url,
            start_date: new.start_date,
            episode_count: episodes.len() as u32,
            rating: new.rating,
            episodes,
        };

        // Re-discovery replaces the old entry and relocates to most-recent.
        self.titles.insert(title.id, title);

        while self.titles.len() > self.capacity {
            if let Some((id, evicted)) = self.titles.pop_oldest() {
                info!(title_id = id, title = %evicted.display_title, "evicting oldest title");
                for ep in &evicted.episodes {
                    self.episode_ids.remove(&(ep.url.clone(), ep.title.clone()));
                }
            }
        }
        Ok(())
    }

    pub fn get_title(&self, id: u32) -> Option<&Title> {
        self.titles.get(&id)
    }

    /// Titles oldest-first.
    pub fn titles(&self) -> impl Iterator<Item = &Title> {
        self.titles.iter().map(|(_, t)| t)
    }

    pub fn find_episode_url(&self, episode_id: u32) -> Option<String> {
        let found = self
            .titles()
            .flat_map(|t| t.episodes.iter())
            .find(|ep| ep.id == episode_id)
            .map(|ep| ep.url.clone());
        if found.is_none() {
            debug!(episode_id, "episode url not found");
        }
        found
    }

    pub fn find_episode_title(&self, episode_id: u32) -> Option<String> {
        self.titles()
            .flat_map(|t| t.episodes.iter())
            .find(|ep| ep.id == episode_id)
            .map(|ep| ep.title.clone())
    }

    pub fn find_title_by_episode_id(&self, episode_id: u32) -> Option<&Title> {
        self.titles()
            .find(|t| t.episodes.iter().any(|ep| ep.id == episode_id))
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn episode_counter(&self) -> u32 {
        self.next_episode_id
    }

    /// Snapshot for durable-store sync, oldest-first.
    pub fn snapshot_titles(&self) -> Vec<Title> {
        self.titles().cloned().collect()
    }

    /// Snapshot of the episode id index for durable-store sync.
    pub fn snapshot_episodes(&self) -> Vec<Episode> {
        let mut episodes: Vec<Episode> = self
            .episode_ids
            .iter()
            .map(|((url, title), &id)| Episode {
                id,
                url: url.clone(),
                title: title.clone(),
            })
            .collect();
        episodes.sort_by_key(|ep| ep.id);
        episodes
    }

    /// Adopt state read back from the durable store.
    pub fn restore(&mut self, titles: Vec<Title>, episodes: Vec<Episode>, counter: u32) {
        self.titles = FifoMap::new();
        self.episode_ids = HashMap::new();
        for ep in episodes {
            self.episode_ids.insert((ep.url, ep.title), ep.id);
        }
        for title in titles {
            self.titles.insert(title.id, title);
        }
        self.next_episode_id = counter.max(FIRST_EPISODE_ID);
    }
}
