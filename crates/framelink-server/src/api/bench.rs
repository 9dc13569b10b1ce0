use crate::error::Result;
use crate::state::AppState;
use anyhow::Context;
use axum::{
    Json,
    extract::{Query, State},
};
use framelink_protocol::MetricsSnapshot;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;

const REPORT_FILENAME: &str = "metrics.json";

#[derive(Debug, Deserialize)]
pub struct BenchParams {
    pub duration: Option<u64>,
    pub mode: Option<String>,
}

/// Synchronization point for an external load generator: suspend for the
/// requested window while peers keep reporting, then summarize exactly
/// that window and persist the report.
pub async fn start(
    State(state): State<AppState>,
    Query(params): Query<BenchParams>,
) -> Result<Json<Value>> {
    let duration = params.duration.unwrap_or(30);
    let mode = params.mode.unwrap_or_else(|| "server".to_string());

    tracing::info!(duration, %mode, "bench window started");
    tokio::time::sleep(Duration::from_secs(duration)).await;

    let metrics = state.metrics.query(duration).await;
    write_report(&state.config.bench_output_dir, &mode, duration, &metrics).await?;
    tracing::info!(samples = metrics.samples, "bench window finished");

    Ok(Json(json!({
        "ok": true,
        "written": REPORT_FILENAME,
        "metrics": metrics,
    })))
}

async fn write_report(
    out_dir: &Path,
    mode: &str,
    duration: u64,
    metrics: &MetricsSnapshot,
) -> anyhow::Result<()> {
    let mut report = json!({ "mode": mode, "duration_s": duration });
    if let (Some(fields), Value::Object(snapshot)) = (
        report.as_object_mut(),
        serde_json::to_value(metrics).context("unserializable snapshot")?,
    ) {
        fields.extend(snapshot);
    }

    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let out_path = out_dir.join(REPORT_FILENAME);
    tokio::fs::write(&out_path, serde_json::to_vec_pretty(&report)?)
        .await
        .with_context(|| format!("writing {}", out_path.display()))?;

    Ok(())
}
