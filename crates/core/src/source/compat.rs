//! Source adapter for upstream servers speaking the same protocol.
//!
//! A compat server exposes the familiar search/bangumi/comment endpoints;
//! this adapter folds its catalog into ours, labeling episodes with the
//! configured platform tag.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

use super::{SourceAdapter, SourceError};
use crate::codec::title_id_for;
use crate::config::CompatServerConfig;
use crate::danmaku::RawComments;
use crate::registry::{NewEpisode, NewTitle};

/// How many search hits to materialize episodes for per request.
const MAX_HITS: usize = 5;

pub struct CompatSource {
    client: Client,
    config: CompatServerConfig,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    animes: Vec<AnimeHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnimeHit {
    anime_id: u64,
    anime_title: String,
    #[serde(default, rename = "type")]
    type_: String,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    start_date: String,
    #[serde(default)]
    rating: f64,
}

#[derive(Debug, Deserialize)]
struct BangumiResponse {
    bangumi: BangumiDetail,
}

#[derive(Debug, Deserialize)]
struct BangumiDetail {
    #[serde(default)]
    episodes: Vec<BangumiEpisode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BangumiEpisode {
    episode_id: u64,
    #[serde(default)]
    episode_title: String,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    #[serde(default)]
    comments: Vec<CommentItem>,
}

#[derive(Debug, Deserialize)]
struct CommentItem {
    p: String,
    m: String,
}

impl CompatSource {
    pub fn new(config: CompatServerConfig, timeout_ms: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, config }
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn search_url(&self, keyword: &str) -> String {
        format!(
            "{}/api/v2/search/anime?keyword={}",
            self.base_url(),
            urlencoding::encode(keyword)
        )
    }

    fn locator_for(&self, episode_id: u64) -> String {
        format!("{}://{}", self.config.name, episode_id)
    }

    fn episode_id_from(&self, locator: &str) -> Result<u64, SourceError> {
        locator
            .strip_prefix(&format!("{}://", self.config.name))
            .and_then(|rest| rest.parse().ok())
            .ok_or_else(|| SourceError::Decode(format!("bad locator {:?}", locator)))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout
            } else if e.is_connect() {
                SourceError::ConnectionFailed(e.to_string())
            } else {
                SourceError::ApiError(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(SourceError::ApiError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SourceAdapter for CompatSource {
    fn platform(&self) -> &str {
        &self.config.name
    }

    async fn search(&self, keyword: &str) -> Result<Vec<NewTitle>, SourceError> {
        let search: SearchResponse = self.get_json(&self.search_url(keyword)).await?;
        debug!(
            platform = self.config.name,
            hits = search.animes.len(),
            "compat search"
        );

        let mut titles = Vec::new();
        for hit in search.animes.into_iter().take(MAX_HITS) {
            let url = format!("{}/api/v2/bangumi/{}", self.base_url(), hit.anime_id);
            let detail: BangumiResponse = match self.get_json(&url).await {
                Ok(d) => d,
                Err(e) => {
                    debug!(platform = self.config.name, anime_id = hit.anime_id, error = %e,
                        "skipping hit without episode list");
                    continue;
                }
            };
            if detail.bangumi.episodes.is_empty() {
                continue;
            }

            let episodes = detail
                .bangumi
                .episodes
                .iter()
                .map(|ep| NewEpisode {
                    url: self.locator_for(ep.episode_id),
                    title: format!("【{}】{}", self.config.name, ep.episode_title),
                })
                .collect();

            titles.push(NewTitle {
                id: title_id_for(&format!("{}@{}", hit.anime_title, self.config.name)),
                display_title: display_title(&hit.anime_title, &hit.start_date),
                category: if hit.type_.is_empty() {
                    "tvseries".to_string()
                } else {
                    hit.type_
                },
                image_url: hit.image_url,
                start_date: hit.start_date,
                rating: hit.rating,
                episodes,
            });
        }
        Ok(titles)
    }

    async fn fetch_comments(&self, locator: &str) -> Result<RawComments, SourceError> {
        let episode_id = self.episode_id_from(locator)?;
        let url = format!(
            "{}/api/v2/comment/{}?withRelated=true",
            self.base_url(),
            episode_id
        );
        let response: CommentResponse = self.get_json(&url).await?;

        let objects: Vec<Map<String, Value>> = response
            .comments
            .iter()
            .filter_map(|c| {
                let (time, mode, color) = parse_p_field(&c.p)?;
                let mut obj = Map::new();
                obj.insert("time".to_string(), json!(time));
                obj.insert("mode".to_string(), json!(mode));
                obj.insert("color".to_string(), json!(color));
                obj.insert("content".to_string(), json!(c.m));
                Some(obj)
            })
            .collect();
        Ok(RawComments::Objects(objects))
    }
}

/// Decode a wire `p` field back into `(time, mode, color)`.
fn parse_p_field(p: &str) -> Option<(f64, u32, u32)> {
    let mut fields = p.split(',');
    let time = fields.next()?.parse().ok()?;
    let mode = fields.next()?.parse().ok()?;
    let color = fields.next()?.parse().ok()?;
    Some((time, mode, color))
}

fn display_title(anime_title: &str, start_date: &str) -> String {
    if anime_title.contains('(') {
        return anime_title.to_string();
    }
    match start_date.get(..4) {
        Some(year) if year.chars().all(|c| c.is_ascii_digit()) => {
            format!("{} ({})", anime_title, year)
        }
        _ => anime_title.to_string(),
    }
}
