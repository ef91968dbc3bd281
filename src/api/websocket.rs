use super::AppState;
use crate::session::PushSession;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::info;

/// GET /ws - WebSocket upgrade into a push session
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    info!("WebSocket upgrade request received");
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Create WebSocket router
pub fn create_ws_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session = PushSession::new(
        Arc::clone(&state.fleet),
        Arc::clone(&state.ports),
        state.settings.clone(),
    );

    session.handle(socket).await;
}
