//! Error-to-response mapping.
//!
//! Every failure leaves the server as a JSON body carrying an explicit
//! `errorCode` and `success: false`; handlers never surface an opaque 500
//! for a failure the core classified.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use barrage_core::CoreError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_code: u32,
    pub success: bool,
    pub error_message: String,
}

pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self.0 {
            CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, 404, msg.clone()),
            CoreError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, 400, msg.clone()),
            CoreError::UpstreamTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, 504, msg.clone()),
            CoreError::UpstreamFailure(msg) => (StatusCode::BAD_GATEWAY, 502, msg.clone()),
            CoreError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                429,
                "too many upstream fetches, please retry in a minute".to_string(),
            ),
        };
        let body = ErrorBody {
            error_code: code,
            success: false,
            error_message: message,
        };
        (status, Json(body)).into_response()
    }
}
