use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use vessel_feed::api::{self, AppState};
use vessel_feed::config::resolve_config;
use vessel_feed::fleet::FleetStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vessel_feed=info,feed_server=info".into()),
        )
        .init();

    info!("Feed server starting...");

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("VESSEL_FEED_CONFIG").ok())
        .map(PathBuf::from);
    let config = resolve_config(config_path.as_deref()).context("Failed to load configuration")?;
    let server = config.server;

    let fleet = Arc::new(FleetStore::new());
    if let Some(seed) = &server.seed_file {
        let outcome = fleet
            .load_seed_file(seed)
            .with_context(|| format!("Failed to load seed file {}", seed.display()))?;
        info!(
            path = %seed.display(),
            accepted = outcome.accepted,
            rejected = outcome.rejected,
            "Seeded fleet"
        );
    }

    let state = Arc::new(AppState::new(fleet, &server));
    info!(ports = state.ports.len(), "Port registry loaded");

    let listener = tokio::net::TcpListener::bind(&server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", server.bind))?;

    api::serve(listener, state, async {
        // Wait for shutdown signal
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
        }
        info!("Shutdown signal received");
    })
    .await?;

    info!("Feed server stopped");
    Ok(())
}
