//! Framelink Server Library
//!
//! This module exposes the server components for testing and embedding.

pub mod api;
pub mod error;
pub mod infer;
pub mod metrics;
pub mod rooms;
pub mod state;
pub mod ws;

/// Create and configure the server application
pub fn create_app(state: state::AppState) -> axum::Router {
    api::create_router(state)
}
