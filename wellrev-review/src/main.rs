//! wellrev-review - Well clustering review service
//!
//! Serves the review workflow over HTTP + SSE and talks to the external
//! clustering service on the reviewer's behalf.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wellrev_common::config;
use wellrev_common::events::EventBus;

use wellrev_review::services::ClusterServiceClient;
use wellrev_review::workflow::WorkflowController;
use wellrev_review::AppState;

/// Command-line arguments for wellrev-review
#[derive(Parser, Debug)]
#[command(name = "wellrev-review")]
#[command(about = "Human-in-the-loop review of well clusterings")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "WELLREV_PORT")]
    port: Option<u16>,

    /// Clustering service base URL
    #[arg(short, long, env = "WELLREV_SERVICE_URL")]
    service_url: Option<String>,

    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = match config::resolve_config_path(args.config.as_deref()) {
        Some(path) => config::load_toml_config(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => config::TomlConfig::default(),
    };

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting wellrev-review");
    info!(
        "Version: {} ({}), built {} [{}]",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let service_url = config::resolve_service_url(args.service_url.as_deref(), &toml_config);
    let port = args.port.unwrap_or(toml_config.port);
    info!("Clustering service: {}", service_url);

    let client = ClusterServiceClient::new(
        service_url,
        Duration::from_secs(toml_config.request_timeout_secs),
    )
    .context("Failed to create clustering service client")?;

    let event_bus = EventBus::new(100);
    let controller = Arc::new(WorkflowController::new(
        Arc::new(client),
        event_bus,
        toml_config.baseline_clusters,
    ));
    info!(
        baseline_clusters = toml_config.baseline_clusters,
        "Workflow controller initialized"
    );

    let state = AppState::new(controller, toml_config.export_filename.clone());
    let app = wellrev_review::build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
