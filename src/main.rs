//! ollama-relay server entrypoint.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use ollama_relay::config::{Cli, Config};
use ollama_relay::relay::{HealthAggregator, RelayEngine};
use ollama_relay::server::api::{build_router, AppState};
use ollama_relay::upstream::{OllamaClient, Upstream};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "ollama_relay=debug,tower_http=debug"
    } else {
        "ollama_relay=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("ollama-relay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let mut config = Config::load(&cli.config)?;
    config.apply_env();
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }
    config.validate()?;
    let config = Arc::new(config);

    info!(
        backend = config.backend.host.as_str(),
        default_model = config.backend.default_model.as_str(),
        api_prefix = config.server.api_prefix.as_str(),
        probe_timeout_secs = config.backend.probe_timeout_secs,
        "Configuration loaded"
    );

    // One client shared by every request task.
    let upstream: Arc<dyn Upstream> = Arc::new(OllamaClient::from_config(&config)?);

    let state = Arc::new(AppState {
        relay: RelayEngine::new(upstream.clone(), config.backend.default_model.clone()),
        health: HealthAggregator::new(upstream),
        config: config.clone(),
    });

    // Build the HTTP router.
    let app = build_router(state);

    // Start the server.
    let listen_addr = config.server.listen.clone();
    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
