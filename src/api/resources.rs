//! Cached resource endpoint

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use super::state::AppState;
use super::types::ApiError;
use crate::domain::CacheKey;
use crate::infrastructure::services::ConditionalResponse;

/// GET /api/{resource}
///
/// Full responses carry the payload with its `ETag`; a matching
/// `If-None-Match` gets `304 Not Modified` with no body.
pub async fn get_resource(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let key = CacheKey::new(resource);
    let if_none_match = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok());

    let response = state.resources.respond(&key, if_none_match).await?;

    let etag = response.fingerprint().to_string();
    let cache_control = format!(
        "public, max-age={}, must-revalidate",
        response.max_age().as_secs()
    );

    let response = match response {
        ConditionalResponse::NotModified { .. } => (
            StatusCode::NOT_MODIFIED,
            [(header::ETAG, etag), (header::CACHE_CONTROL, cache_control)],
        )
            .into_response(),
        ConditionalResponse::Full { entry, .. } => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/json".to_string()),
                (header::ETAG, etag),
                (header::CACHE_CONTROL, cache_control),
            ],
            entry.payload().to_string(),
        )
            .into_response(),
    };

    Ok(response)
}
