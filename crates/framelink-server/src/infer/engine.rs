use async_trait::async_trait;

/// A detected object in source-image pixel coordinates, as reported by an
/// engine. `x`/`y` is the top-left corner of the bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelDetection {
    pub label: String,
    pub score: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Server-side object detector, invoked with the raw encoded image.
/// Implementations own model loading and execution; the bridge handles
/// payload decoding, latency accounting, and coordinate normalization.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn detect(&self, bytes: &[u8], mime: &str) -> anyhow::Result<Vec<PixelDetection>>;
}

/// Engine wired in when no detector is configured. The default `wasm`
/// deployment mode runs inference on the viewer, so the server engine is
/// a plug-point; this one reports every frame as empty.
pub struct NoopEngine;

#[async_trait]
impl InferenceEngine for NoopEngine {
    async fn detect(&self, _bytes: &[u8], _mime: &str) -> anyhow::Result<Vec<PixelDetection>> {
        Ok(Vec::new())
    }
}
