//! Automatic file-name matching handler.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchBody {
    #[serde(default)]
    pub file_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub episode_id: u32,
    pub anime_id: u32,
    pub anime_title: String,
    pub episode_title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub type_description: String,
    pub shift: f64,
    pub image_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub error_code: u32,
    pub success: bool,
    pub error_message: String,
    pub is_matched: bool,
    pub matches: Vec<MatchCandidate>,
}

pub async fn match_file(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MatchBody>,
) -> Result<Json<MatchResponse>, ApiError> {
    let outcome = state.context().match_file(&body.file_name).await?;

    let matches = match outcome {
        Some(hit) => vec![MatchCandidate {
            episode_id: hit.episode_id,
            anime_id: hit.title_id,
            anime_title: hit.title_name,
            episode_title: hit.episode_title,
            kind: hit.category.clone(),
            type_description: hit.category,
            shift: 0.0,
            image_url: String::new(),
        }],
        None => Vec::new(),
    };

    Ok(Json(MatchResponse {
        error_code: 0,
        success: true,
        error_message: String::new(),
        is_matched: !matches.is_empty(),
        matches,
    }))
}
