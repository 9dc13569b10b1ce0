mod bench;
mod meta;
mod metrics;
mod rooms;

use crate::state::AppState;
use crate::ws;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(meta::health))
        // Runtime configuration for peers
        .route("/config.json", get(meta::config))
        // Room pairing
        .route("/api/new-room", get(rooms::new_room))
        // Telemetry
        .route("/api/metrics", post(metrics::ingest))
        .route("/api/metrics/snapshot", get(metrics::snapshot))
        .route("/bench/start", get(bench::start))
        // Signaling WebSocket
        .route("/ws", get(ws::handler::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
