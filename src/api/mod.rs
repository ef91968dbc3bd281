// HTTP and WebSocket APIs for the reference feed server

mod ingestion;
pub mod query;
pub mod websocket;

pub use ingestion::create_ingestion_router;
pub use query::create_query_router;
pub use websocket::{create_ws_router, ws_handler};

use crate::config::ServerConfig;
use crate::fleet::FleetStore;
use crate::proximity::PortRegistry;
use crate::session::SessionSettings;
use anyhow::{Context, Result};
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application state
pub struct AppState {
    pub fleet: Arc<FleetStore>,
    pub ports: Arc<PortRegistry>,
    pub settings: SessionSettings,
}

impl AppState {
    pub fn new(fleet: Arc<FleetStore>, config: &ServerConfig) -> Self {
        Self {
            fleet,
            ports: Arc::new(PortRegistry::new(config.ports.clone())),
            settings: SessionSettings::from(config),
        }
    }
}

/// Full reference server router
pub fn create_app(state: Arc<AppState>) -> Router {
    let health_state = Arc::clone(&state);
    Router::new()
        .route(
            "/health",
            get(move || async move { health(&health_state) }),
        )
        .merge(create_ws_router(Arc::clone(&state)))
        .merge(create_query_router(Arc::clone(&state)))
        .merge(create_ingestion_router(state))
        .layer(CorsLayer::permissive())
}

fn health(state: &AppState) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "vessels": state.fleet.len(),
        "ports": state.ports.len(),
    }))
}

/// Serve `state` on an already-bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!(addr = %addr, "Feed server listening");

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Feed server error")
}
