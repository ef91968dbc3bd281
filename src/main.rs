use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};
use vessel_feed::config::resolve_config;
use vessel_feed::LiveFeedController;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vessel_feed=info".into()),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("VESSEL_FEED_CONFIG").ok())
        .map(PathBuf::from);
    let config = resolve_config(config_path.as_deref()).context("Failed to load configuration")?;

    let controller = LiveFeedController::from_config(&config)?;
    info!(
        push = %controller.endpoints().push,
        pull = %controller.endpoints().pull,
        region = %config.feed.region,
        "Vessel feed starting"
    );

    let mut updates = controller.subscribe();
    controller.start(config.feed.clone()).await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut last_state = None;
    let mut last_error = None;
    let mut last_count = None;
    loop {
        tokio::select! {
            result = &mut shutdown => {
                result.context("Failed to listen for ctrl-c")?;
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let (status, view) = {
                    let state = updates.borrow_and_update();
                    (state.status(), state.view())
                };

                if last_state != Some(status.state) {
                    info!(
                        state = ?status.state,
                        reason = status.reason.as_deref().unwrap_or(""),
                        "Feed status changed"
                    );
                    last_state = Some(status.state);
                }
                if view.error != last_error {
                    if let Some(error) = &view.error {
                        warn!(error = %error, "Feed error");
                    }
                    last_error = view.error.clone();
                }
                if last_count != Some(view.vessels.len()) {
                    info!(
                        vessels = view.vessels.len(),
                        port_connections = view.port_connections.len(),
                        loading = view.loading,
                        "Snapshot updated"
                    );
                    last_count = Some(view.vessels.len());
                }
            }
        }
    }

    info!("Shutting down...");
    controller.stop().await;
    let metrics = controller.metrics();
    info!(
        messages = metrics.messages_received,
        batches = metrics.batches_applied,
        fallback_fetches = metrics.fallback_fetches,
        "Vessel feed stopped"
    );

    Ok(())
}
