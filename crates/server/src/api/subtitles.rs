//! Subtitle API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use captionrelay_core::{CaptionAsset, SubtitleError};
use serde::Serialize;

use super::handlers::ErrorResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SubtitleResponse {
    pub subs: Vec<CaptionAsset>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn subtitle_error(e: SubtitleError) -> ApiError {
    let status = match &e {
        SubtitleError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        SubtitleError::NotFound(_) => StatusCode::NOT_FOUND,
        SubtitleError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

/// Public origin used in caption URLs: the configured one, otherwise the
/// request's own scheme and host. Empty when neither is known, which makes
/// the URLs host-relative.
fn public_origin(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(url) = &state.config().server.public_url {
        return url.trim_end_matches('/').to_string();
    }

    let Some(host) = headers.get(header::HOST).and_then(|h| h.to_str().ok()) else {
        return String::new();
    };
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");

    format!("{}://{}", scheme, host)
}

async fn respond(
    state: &AppState,
    headers: &HeaderMap,
    fid: &str,
) -> Result<Json<SubtitleResponse>, ApiError> {
    let origin = public_origin(state, headers);

    state
        .subtitles()
        .fetch(fid, &origin)
        .await
        .map(|subs| Json(SubtitleResponse { subs }))
        .map_err(subtitle_error)
}

/// GET /api/subtitles/{fid}
///
/// Return the caption tracks for a file, acquiring them on first request.
pub async fn get_subtitles(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(fid): Path<String>,
) -> Result<Json<SubtitleResponse>, ApiError> {
    respond(&state, &headers, &fid).await
}

/// GET /api/subtitles/
pub async fn get_subtitles_without_fid(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SubtitleResponse>, ApiError> {
    respond(&state, &headers, "").await
}
