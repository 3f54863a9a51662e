//! SecureChat Relay Server
//!
//! One process serving the two things clients need from a server:
//!
//! 1. **Key directory**: principals publish their exported public keys and
//!    look up each other's by name. Signing keys live under `<name>_sig`.
//!
//! 2. **Room relay**: a WebSocket per room member; every frame is forwarded
//!    to every member of the room.
//!
//! **Privacy**: The relay only ever handles ciphertext and public keys.
//! Nothing is stored beyond the current directory entries, and no message
//! history is kept.

pub mod directory;
pub mod handler;
pub mod state;

use axum::{
    extract::{Path, State, WebSocketUpgrade},
    http::Method,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::{RelayConfig, RelayState};

/// Build the relay router.
pub fn router(state: RelayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/chat/keys/upload/", post(directory::upload_key))
        .route("/api/chat/keys/:username/", get(directory::get_key))
        .route("/ws/chat/:room/", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

// ── Route Handlers ────────────────────────────────────────────────────────────

/// WebSocket upgrade handler for room members.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    State(state): State<RelayState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handler::handle_websocket(socket, room, state))
}

/// Health check endpoint.
async fn health_handler(State(state): State<RelayState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "securechat-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "rooms": state.room_count(),
        "keys": state.key_count(),
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
