use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::{handlers, middleware::metrics_middleware, subtitles, upstream};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let caption_config = state.config().subtitles.clone();

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Upstream host
        .route("/files", get(upstream::list_files))
        .route("/links", get(upstream::list_links))
        .route("/xref", get(upstream::get_cross_reference))
        // Subtitles
        .route("/subtitles/", get(subtitles::get_subtitles_without_fid))
        .route("/subtitles/{fid}", get(subtitles::get_subtitles))
        .with_state(state);

    // Converted caption tracks, served from disk
    let captions = ServeDir::new(&caption_config.storage_dir);
    let public_path = caption_config.public_path.trim_end_matches('/');

    let router = Router::new()
        .nest("/api", api_routes)
        .route("/metrics", get(handlers::metrics));

    let router = if public_path.is_empty() {
        router.fallback_service(captions)
    } else {
        router.nest_service(public_path, captions)
    };

    router
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
