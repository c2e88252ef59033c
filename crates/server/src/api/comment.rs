//! Comment fetch handlers (JSON and XML forms).

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use barrage_core::WireComment;

use super::client_ip;
use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CommentParams {
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentByUrlBody {
    #[serde(default)]
    pub video_url: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub count: usize,
    pub comments: Vec<WireComment>,
}

pub async fn comment_by_episode(
    State(state): State<Arc<AppState>>,
    Path(episode_id): Path<u32>,
    Query(params): Query<CommentParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let client = client_ip(&headers);
    let comments = state
        .context()
        .comments_for_episode(episode_id, &client)
        .await?;

    if params.format.as_deref() == Some("xml") {
        return Ok(xml_response(&comments));
    }
    Ok(Json(CommentResponse {
        count: comments.len(),
        comments,
    })
    .into_response())
}

pub async fn comment_by_url(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CommentByUrlBody>,
) -> Result<Json<CommentResponse>, ApiError> {
    let client = client_ip(&headers);
    let comments = state
        .context()
        .comments_for_url(&body.video_url, &client)
        .await?;
    Ok(Json(CommentResponse {
        count: comments.len(),
        comments,
    }))
}

/// Render comments in the classic `<root><d p="...">text</d></root>` shape.
fn xml_response(comments: &[WireComment]) -> Response {
    let mut body = String::with_capacity(64 + comments.len() * 48);
    body.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?><root>");
    for comment in comments {
        body.push_str("<d p=\"");
        body.push_str(&escape_xml(&comment.p));
        body.push_str("\">");
        body.push_str(&escape_xml(&comment.m));
        body.push_str("</d>");
    }
    body.push_str("</root>");

    (
        [(header::CONTENT_TYPE, "text/xml; charset=utf-8")],
        body,
    )
        .into_response()
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
