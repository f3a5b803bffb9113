use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use captionrelay_core::{
    load_config, load_config_from_env, validate_config, ConfigError, CrossReferenceResolver,
    SubtitlePipeline, UpstreamClient,
};
use captionrelay_server::{create_router, AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("captionrelay {}", VERSION);

    // Determine config path
    let config_path = std::env::var("CAPTIONRELAY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration, falling back to defaults + environment
    info!("Loading configuration from {:?}", config_path);
    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(ConfigError::FileNotFound(_)) => {
            warn!(
                "Config file {:?} not found, using defaults and environment",
                config_path
            );
            load_config_from_env().context("Failed to load config from environment")?
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to load config from {:?}", config_path))
        }
    };

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Upstream host: {}", config.upstream.base_url);
    info!("Subtitle index: {}", config.subtitles.index_base_url);
    info!("Caption storage: {:?}", config.subtitles.storage_dir);

    // Make sure the caption directory exists before serving it
    tokio::fs::create_dir_all(&config.subtitles.storage_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create caption storage directory {:?}",
                config.subtitles.storage_dir
            )
        })?;

    // Create upstream client and start the listing cache sweeper
    let upstream = Arc::new(
        UpstreamClient::new(&config.upstream).context("Failed to create upstream client")?,
    );
    let sweeper = upstream.spawn_cache_sweeper();
    info!(
        "Listing cache: ttl {}s, sweep every {}s",
        config.upstream.cache_ttl_secs, config.upstream.cache_sweep_secs
    );

    // Create subtitle pipeline, resolving cross-reference ids through the upstream client
    let resolver: Arc<dyn CrossReferenceResolver> = upstream.clone();
    let subtitles = Arc::new(
        SubtitlePipeline::new(&config.subtitles, resolver)
            .context("Failed to create subtitle pipeline")?,
    );
    info!("Subtitle pipeline initialized");

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), upstream, subtitles));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    sweeper.abort();

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
