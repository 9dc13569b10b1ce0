use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
};
use framelink_protocol::{MetricsSample, MetricsSnapshot};
use serde::Deserialize;
use serde_json::{Value, json};

pub const DEFAULT_WINDOW_SECONDS: u64 = 30;

#[derive(Debug, Deserialize)]
pub struct MetricsIngest {
    #[serde(default)]
    pub samples: Vec<MetricsSample>,
}

/// Batch ingestion of telemetry reported by peers.
pub async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<MetricsIngest>,
) -> Json<Value> {
    state.metrics.record_batch(body.samples).await;
    Json(json!({ "ok": true }))
}

#[derive(Debug, Deserialize)]
pub struct SnapshotParams {
    pub window: Option<u64>,
}

pub async fn snapshot(
    State(state): State<AppState>,
    Query(params): Query<SnapshotParams>,
) -> Json<MetricsSnapshot> {
    let window = params.window.unwrap_or(DEFAULT_WINDOW_SECONDS);
    Json(state.metrics.query(window).await)
}
