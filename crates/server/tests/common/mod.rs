//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! whose upstream host and subtitle index are a local mock HTTP server,
//! enabling E2E testing without external infrastructure.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mockito::{Server, ServerGuard};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use captionrelay_core::testing::MockCrossReference;
use captionrelay_core::{Config, SubtitleConfig, SubtitlePipeline, UpstreamClient, UpstreamConfig};
use captionrelay_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use captionrelay_core::testing::fixtures;

/// Host header sent with every request.
pub const TEST_HOST: &str = "captions.test";

/// Test fixture for E2E testing with mock dependencies.
///
/// Provides an in-process server with:
/// - A mock HTTP server standing in for both the share host and the subtitle index
/// - A mock cross-reference resolver feeding the subtitle pipeline
/// - A temporary caption storage directory
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_missing_fid() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.get("/api/subtitles/").await;
///
///     assert_eq!(response.status, 400);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock share host and subtitle index
    pub server: ServerGuard,
    /// Mock resolver used by the subtitle pipeline
    pub resolver: Arc<MockCrossReference>,
    /// Temporary directory holding caption storage
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture with default settings.
    pub async fn new() -> Self {
        Self::with_public_url(None).await
    }

    /// Create a test fixture whose caption URLs use a fixed public origin.
    pub async fn with_public_url(public_url: Option<&str>) -> Self {
        let server = Server::new_async().await;
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let resolver = Arc::new(MockCrossReference::new());

        let mut config = Config {
            upstream: UpstreamConfig {
                base_url: server.url(),
                default_share_key: "DEFAULTKEY".to_string(),
                ui_cookie: "test-cookie".to_string(),
                timeout_secs: 5,
                ..Default::default()
            },
            subtitles: SubtitleConfig {
                index_base_url: server.url(),
                storage_dir: temp_dir.path().join("subtitles"),
                timeout_secs: 5,
                task_timeout_secs: 10,
                ..Default::default()
            },
            ..Default::default()
        };
        config.server.public_url = public_url.map(str::to_string);
        std::fs::create_dir_all(&config.subtitles.storage_dir)
            .expect("Failed to create storage dir");

        let upstream = Arc::new(
            UpstreamClient::new(&config.upstream).expect("Failed to create upstream client"),
        );
        let subtitles = Arc::new(
            SubtitlePipeline::new(&config.subtitles, resolver.clone())
                .expect("Failed to create subtitle pipeline"),
        );

        let state = Arc::new(AppState::new(config, upstream, subtitles));
        let router = create_router(state);

        Self {
            router,
            server,
            resolver,
            temp_dir,
        }
    }

    /// Directory holding the converted tracks of `fid`.
    pub fn caption_dir(&self, fid: &str) -> PathBuf {
        self.temp_dir.path().join("subtitles").join(fid)
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .header(header::HOST, TEST_HOST)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status, $response.status, $response.text
        );
    };
}
