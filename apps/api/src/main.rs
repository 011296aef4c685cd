mod auth;
mod config;
mod cv;
mod db;
mod engine;
mod errors;
mod models;
mod profile;
mod render;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::cv::CvPipeline;
use crate::db::create_pool;
use crate::engine::{ChromiumLauncher, DocumentEngine, EngineLimiter};
use crate::profile::{PgProfileStore, ProfileAggregator};
use crate::render::{CvRenderer, HelperRegistry};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Portfolio API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url, config.db_max_connections).await?;
    let aggregator = ProfileAggregator::new(Arc::new(PgProfileStore::new(db)));

    // Templates compile once here; a broken template stops startup
    let helpers = HelperRegistry::system();
    let renderer = CvRenderer::new(&helpers, &config.cv_template)?;
    info!("CV template '{}' loaded", renderer.default_template());

    // Document engine: one Chromium process per CV, bounded
    if config.chrome_no_sandbox {
        warn!("Chromium sandbox disabled via CHROME_NO_SANDBOX");
    }
    let launcher = ChromiumLauncher::new(config.chrome_path.clone(), config.chrome_no_sandbox);
    let limiter = EngineLimiter::new(config.engine_max_concurrent, config.engine_queue_timeout);
    info!(
        "Document engine: {} concurrent processes, queue timeout {}ms",
        limiter.bound(),
        config.engine_queue_timeout.as_millis()
    );
    let engine = DocumentEngine::new(Arc::new(launcher), limiter, config.render_options());

    let pipeline = CvPipeline::new(aggregator, renderer, engine, config.cv_projects);

    // Build app state
    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the portfolio frontend

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves on Ctrl-C so in-flight CVs finish and their browsers exit.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
