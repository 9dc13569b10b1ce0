use framelink_protocol::{MetricsSample, MetricsSnapshot};
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Retention cap for the sample backlog. Samples older than any window a
/// client can still observe are the first to go, so capped eviction never
/// changes a windowed result in practice.
const MAX_RETAINED_SAMPLES: usize = 100_000;

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone)]
struct StoredSample {
    /// Assigned by the aggregator at insertion, never by the sender.
    received_at: i64,
    sample: MetricsSample,
}

/// Append-only telemetry log with windowed percentile queries.
pub struct MetricsAggregator {
    samples: RwLock<VecDeque<StoredSample>>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self {
            samples: RwLock::new(VecDeque::new()),
        }
    }

    pub async fn record(&self, sample: MetricsSample) {
        self.record_batch(vec![sample]).await;
    }

    /// Append a batch under one lock and one receipt timestamp.
    pub async fn record_batch(&self, batch: Vec<MetricsSample>) {
        if batch.is_empty() {
            return;
        }
        let received_at = now_ms();
        let mut samples = self.samples.write().await;
        for sample in batch {
            samples.push_back(StoredSample {
                received_at,
                sample,
            });
        }
        while samples.len() > MAX_RETAINED_SAMPLES {
            samples.pop_front();
        }
    }

    /// Summary over the trailing window. Pure over the retained log.
    pub async fn query(&self, window_seconds: u64) -> MetricsSnapshot {
        let samples = self.samples.read().await;
        snapshot_from(&samples, window_seconds, now_ms())
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn snapshot_from(
    samples: &VecDeque<StoredSample>,
    window_seconds: u64,
    now: i64,
) -> MetricsSnapshot {
    let cutoff = now - (window_seconds as i64) * 1000;
    let window: Vec<&StoredSample> = samples
        .iter()
        .filter(|s| s.received_at >= cutoff)
        .collect();

    let values = |field: fn(&MetricsSample) -> Option<f64>| -> Vec<f64> {
        window.iter().filter_map(|s| field(&s.sample)).collect()
    };

    let e2e = values(|s| s.e2e_ms);
    let fps = values(|s| s.fps);
    let uplink = values(|s| s.uplink_kbps);
    let downlink = values(|s| s.downlink_kbps);
    let server_lat = values(|s| s.server_latency_ms);
    let network_lat = values(|s| s.network_latency_ms);

    MetricsSnapshot {
        generated_at: now,
        window_seconds,
        samples: window.len(),
        e2e_latency_ms_median: median(&e2e),
        e2e_latency_ms_p95: percentile(&e2e, 95.0),
        processed_fps_median: median(&fps),
        uplink_kbps_median: median(&uplink),
        downlink_kbps_median: median(&downlink),
        server_latency_ms_median: median(&server_lat),
        network_latency_ms_median: median(&network_lat),
    }
}

/// Nearest-rank percentile over a 0-based ascending sort: the element at
/// `clamp(floor((p/100)·(n−1)), 0, n−1)`. No interpolation.
fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = ((p / 100.0) * (sorted.len() - 1) as f64).floor();
    let idx = (rank.max(0.0) as usize).min(sorted.len() - 1);
    Some(sorted[idx])
}

fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 50.0)
}
