//! Search and title-listing handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use barrage_core::Title;

use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchAnimeParams {
    #[serde(default)]
    pub keyword: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchEpisodesParams {
    #[serde(default)]
    pub anime: String,
    pub episode: Option<String>,
}

/// One title as surfaced by search.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleSummary {
    pub anime_id: u32,
    pub anime_title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub type_description: String,
    pub image_url: String,
    pub start_date: String,
    pub episode_count: u32,
    pub rating: f64,
}

impl From<&Title> for TitleSummary {
    fn from(title: &Title) -> Self {
        Self {
            anime_id: title.id,
            anime_title: title.display_title.clone(),
            kind: title.category.clone(),
            type_description: title.category.clone(),
            image_url: title.image_url.clone(),
            start_date: title.start_date.clone(),
            episode_count: title.episode_count,
            rating: title.rating,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeSummary {
    pub episode_id: u32,
    pub episode_title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnimeResponse {
    pub error_code: u32,
    pub success: bool,
    pub error_message: String,
    pub animes: Vec<TitleSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleWithEpisodes {
    #[serde(flatten)]
    pub summary: TitleSummary,
    pub episodes: Vec<EpisodeSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEpisodesResponse {
    pub error_code: u32,
    pub success: bool,
    pub error_message: String,
    pub has_more: bool,
    pub animes: Vec<TitleWithEpisodes>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BangumiResponse {
    pub error_code: u32,
    pub success: bool,
    pub error_message: String,
    pub bangumi: TitleWithEpisodes,
}

fn with_episodes(title: &Title) -> TitleWithEpisodes {
    TitleWithEpisodes {
        summary: TitleSummary::from(title),
        episodes: title
            .episodes
            .iter()
            .map(|ep| EpisodeSummary {
                episode_id: ep.id,
                episode_title: ep.title.clone(),
            })
            .collect(),
    }
}

pub async fn search_anime(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchAnimeParams>,
) -> Result<Json<SearchAnimeResponse>, ApiError> {
    let titles = state.context().search(&params.keyword).await?;
    Ok(Json(SearchAnimeResponse {
        error_code: 0,
        success: true,
        error_message: String::new(),
        animes: titles.iter().map(TitleSummary::from).collect(),
    }))
}

pub async fn search_episodes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchEpisodesParams>,
) -> Result<Json<SearchEpisodesResponse>, ApiError> {
    let titles = state
        .context()
        .search_episodes(&params.anime, params.episode.as_deref())
        .await?;
    Ok(Json(SearchEpisodesResponse {
        error_code: 0,
        success: true,
        error_message: String::new(),
        has_more: false,
        animes: titles.iter().map(with_episodes).collect(),
    }))
}

pub async fn bangumi(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<BangumiResponse>, ApiError> {
    let title = state.context().bangumi(id).await?;
    Ok(Json(BangumiResponse {
        error_code: 0,
        success: true,
        error_message: String::new(),
        bangumi: with_episodes(&title),
    }))
}
