//! Administrative cache endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::state::AppState;
use crate::domain::CacheKey;

/// Body of a successful eviction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearedResponse {
    #[serde(rename = "Cleared")]
    pub cleared: String,
}

/// DELETE /cache/{key} - always succeeds, whether or not the key was cached
pub async fn clear_cache(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<ClearedResponse> {
    let eviction = state.invalidator.evict(CacheKey::new(key)).await;

    Json(ClearedResponse {
        cleared: eviction.cleared.to_string(),
    })
}
