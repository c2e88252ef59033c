pub mod comment;
pub mod error;
pub mod handlers;
pub mod matching;
pub mod routes;
pub mod search;

pub use routes::create_router;

use axum::http::HeaderMap;

/// The client identity used for rate limiting: the first proxy-reported
/// address, falling back to a shared bucket for direct connections.
pub(crate) fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("local")
        .to_string()
}
