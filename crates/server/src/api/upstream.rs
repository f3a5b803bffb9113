//! Upstream host API handlers: folder listings, quality links and
//! cross-reference ids.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use captionrelay_core::{FileListing, QualityLink, UpstreamError};
use serde::{Deserialize, Serialize};

use super::handlers::ErrorResponse;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesParams {
    #[serde(default)]
    pub share_key: String,
    #[serde(default)]
    pub parent_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileParams {
    #[serde(default)]
    pub fid: String,
    #[serde(default)]
    pub share_key: String,
}

#[derive(Debug, Serialize)]
pub struct CrossReferenceResponse {
    pub imdb: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map an upstream failure to a status code and JSON error body.
pub fn upstream_error(e: UpstreamError) -> ApiError {
    let status = match &e {
        UpstreamError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        UpstreamError::Transport(_) | UpstreamError::Upstream(_) => StatusCode::BAD_GATEWAY,
        UpstreamError::Status(code) => {
            StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_GATEWAY)
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/files?shareKey=..&parentId=..
///
/// List a shared folder. Entries are returned exactly as the host sent them.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilesParams>,
) -> Result<Json<FileListing>, ApiError> {
    state
        .upstream()
        .resolve_file_listing(&params.share_key, &params.parent_id)
        .await
        .map(Json)
        .map_err(upstream_error)
}

/// GET /api/links?fid=..&shareKey=..
///
/// List the playable renditions of a file.
pub async fn list_links(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FileParams>,
) -> Result<Json<Vec<QualityLink>>, ApiError> {
    state
        .upstream()
        .resolve_quality_links(&params.fid, &params.share_key)
        .await
        .map(Json)
        .map_err(upstream_error)
}

/// GET /api/xref?fid=..&shareKey=..
///
/// Look up a file's cross-reference id. An unknown id is an empty string.
pub async fn get_cross_reference(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FileParams>,
) -> Result<Json<CrossReferenceResponse>, ApiError> {
    state
        .upstream()
        .resolve_cross_reference_id(&params.fid, &params.share_key)
        .await
        .map(|imdb| Json(CrossReferenceResponse { imdb }))
        .map_err(upstream_error)
}
