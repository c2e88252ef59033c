use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{comment, handlers, matching, search};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        .route("/config", get(handlers::get_config))
        // Search
        .route("/search/anime", get(search::search_anime))
        .route("/search/episodes", get(search::search_episodes))
        .route("/bangumi/{id}", get(search::bangumi))
        // Matching
        .route("/match", post(matching::match_file))
        // Comments
        .route("/comment/{episode_id}", get(comment::comment_by_episode))
        .route("/comment/by-url", post(comment::comment_by_url))
        .with_state(state);

    Router::new()
        .nest("/api/v2", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
