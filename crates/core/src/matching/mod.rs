//! The matching engine: resolves a filename-like query to one title and
//! episode using ordered platform preference, season-numeral disambiguation
//! and a guaranteed fallback.
//!
//! The pure resolution steps live here; the async orchestration (search
//! fan-out, preference pinning, durable sync) is driven by the
//! [`AggregationContext`](crate::context::AggregationContext).

mod filename;
mod season;

pub use filename::{parse_file_name, ParsedFileName};
pub use season::{match_season, parse_numeral};

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::config::CompiledFilter;
use crate::registry::{Episode, Title};

static PLATFORM_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^【([^】]+)】").unwrap());

/// Build the platform try-order: explicit hint first (when configured),
/// then the configured default order, then the unconditional wildcard.
pub fn platform_try_order(hint: Option<&str>, configured: &[String]) -> Vec<Option<String>> {
    let mut order: Vec<Option<String>> = Vec::with_capacity(configured.len() + 2);
    if let Some(hint) = hint {
        if configured.iter().any(|p| p == hint) {
            order.push(Some(hint.to_string()));
        }
    }
    for platform in configured {
        if order.iter().flatten().any(|p| p == platform) {
            continue;
        }
        order.push(Some(platform.clone()));
    }
    order.push(None);
    order
}

/// The bracketed platform tag of an episode title, e.g. `【qq】第1集` -> `qq`.
pub fn episode_platform_tag(episode_title: &str) -> Option<&str> {
    PLATFORM_TAG_RE
        .captures(episode_title)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Collapse consecutive duplicate episode titles, keeping the first.
pub fn filter_same_episode_title(episodes: &[Episode]) -> Vec<Episode> {
    let mut out: Vec<Episode> = Vec::with_capacity(episodes.len());
    for ep in episodes {
        if out.last().map(|prev: &Episode| prev.title == ep.title) != Some(true) {
            out.push(ep.clone());
        }
    }
    out
}

/// The display title with any trailing parenthetical (year, source note)
/// removed.
pub fn base_title(display_title: &str) -> &str {
    display_title
        .split(['(', '（'])
        .next()
        .unwrap_or(display_title)
        .trim()
}

/// Pick the `index`-th (1-based) episode, restricted to the hinted platform
/// when a hint is given.
///
/// With a hint there must be at least `index` tagged episodes; without one
/// the pick is over all episodes.
fn pick_episode(episodes: &[Episode], index: usize, hint: Option<&str>) -> Option<Episode> {
    match hint {
        Some(tag) => episodes
            .iter()
            .filter(|ep| episode_platform_tag(&ep.title) == Some(tag))
            .nth(index.checked_sub(1)?)
            .cloned(),
        None => episodes.get(index.checked_sub(1)?).cloned(),
    }
}

/// Resolve one platform pass over the candidate titles.
///
/// `preferred_id`, when set, restricts candidates to that title. Returns the
/// owning title id and the chosen episode.
pub fn resolve_match(
    titles: &[Title],
    parsed: &ParsedFileName,
    platform: Option<&str>,
    preferred_id: Option<u32>,
    episode_filter: &CompiledFilter,
    filter_enabled: bool,
) -> Option<(u32, Episode)> {
    let candidates = titles
        .iter()
        .filter(|t| preferred_id.is_none_or(|id| t.id == id));

    match (parsed.season, parsed.episode) {
        (Some(season), Some(episode)) => {
            for title in candidates {
                if !match_season(base_title(&title.display_title), &parsed.title, season) {
                    continue;
                }
                let mut episodes: Vec<Episode> = title.episodes.clone();
                if filter_enabled {
                    episodes.retain(|ep| !episode_filter.matches(&ep.title));
                }
                let episodes = filter_same_episode_title(&episodes);
                if let Some(found) = pick_episode(&episodes, episode as usize, platform) {
                    return Some((title.id, found));
                }
            }
            None
        }
        _ => {
            // Movie query: exact base-title equality, hint-tagged or first
            // episode.
            for title in candidates {
                if base_title(&title.display_title) != parsed.title {
                    continue;
                }
                let found = match platform {
                    Some(tag) => title
                        .episodes
                        .iter()
                        .find(|ep| episode_platform_tag(&ep.title) == Some(tag))
                        .cloned(),
                    None => title.episodes.first().cloned(),
                };
                if let Some(found) = found {
                    return Some((title.id, found));
                }
            }
            None
        }
    }
}

/// Last-resort scan ignoring platform and season constraints entirely.
///
/// A season+episode query still filters and collapses episode titles like
/// the main path and skips titles without enough episodes; only a query
/// with no episode number falls back to the first episode.
pub fn fallback_match(
    titles: &[Title],
    parsed: &ParsedFileName,
    episode_filter: &CompiledFilter,
    filter_enabled: bool,
) -> Option<(u32, Episode)> {
    for title in titles {
        if !title.display_title.contains(&parsed.title) {
            continue;
        }
        match (parsed.season, parsed.episode) {
            (Some(_), Some(episode)) => {
                let mut episodes: Vec<Episode> = title.episodes.clone();
                if filter_enabled {
                    episodes.retain(|ep| !episode_filter.matches(&ep.title));
                }
                let episodes = filter_same_episode_title(&episodes);
                let found = (episode as usize)
                    .checked_sub(1)
                    .and_then(|i| episodes.get(i));
                if let Some(found) = found {
                    return Some((title.id, found.clone()));
                }
            }
            _ => {
                if let Some(found) = title.episodes.first() {
                    return Some((title.id, found.clone()));
                }
            }
        }
    }
    None
}
