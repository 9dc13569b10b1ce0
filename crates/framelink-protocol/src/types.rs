use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role a connection occupies inside a room.
///
/// A room pairs one `phone` (frame producer) with one `viewer` (frame
/// consumer); an optional `infer` connection may attach for inference-only
/// traffic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Phone,
    Infer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Phone => "phone",
            Role::Infer => "infer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct RoleParseError(String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(Role::Viewer),
            "phone" => Ok(Role::Phone),
            "infer" => Ok(Role::Infer),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

/// Destination role for a relayed `signal` message. Only the two media
/// peers can be addressed; `infer` connections are not signaling targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SignalTarget {
    Phone,
    Viewer,
}

impl From<SignalTarget> for Role {
    fn from(target: SignalTarget) -> Self {
        match target {
            SignalTarget::Phone => Role::Phone,
            SignalTarget::Viewer => Role::Viewer,
        }
    }
}

/// A detected object, normalized to the unit square of the source image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub label: String,
    pub score: f64,
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

/// One telemetry report. Every field is optional: a sample contributes
/// only to the distributions of the metrics it actually carries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSample {
    #[serde(default)]
    pub e2e_ms: Option<f64>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub uplink_kbps: Option<f64>,
    #[serde(default)]
    pub downlink_kbps: Option<f64>,
    #[serde(default)]
    pub server_latency_ms: Option<f64>,
    #[serde(default)]
    pub network_latency_ms: Option<f64>,
}

/// Windowed summary computed by the aggregator. `None` means the window
/// held no samples for that metric, and serializes as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub generated_at: i64,
    pub window_seconds: u64,
    pub samples: usize,
    pub e2e_latency_ms_median: Option<f64>,
    pub e2e_latency_ms_p95: Option<f64>,
    pub processed_fps_median: Option<f64>,
    pub uplink_kbps_median: Option<f64>,
    pub downlink_kbps_median: Option<f64>,
    pub server_latency_ms_median: Option<f64>,
    pub network_latency_ms_median: Option<f64>,
}
