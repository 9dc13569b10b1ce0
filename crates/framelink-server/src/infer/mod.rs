//! Frame-inference bridge: takes one submitted frame through the engine,
//! fans the result out to the room, and feeds the latency breakdown into
//! the metrics aggregator.

mod engine;

pub use engine::{InferenceEngine, NoopEngine, PixelDetection};

use crate::metrics::{MetricsAggregator, now_ms};
use crate::rooms::{ConnectionHandle, RoomRegistry};
use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use framelink_protocol::{Detection, MetricsSample, ServerMessage};
use std::io::Cursor;
use std::sync::Arc;

/// Payload of one `infer_frame` submission.
#[derive(Debug, Clone)]
pub struct FrameSubmission {
    pub frame_id: String,
    pub capture_ts: Option<i64>,
    pub recv_ts: Option<i64>,
    pub mime: Option<String>,
    /// Base64-encoded image bytes
    pub data: String,
}

#[derive(Clone)]
pub struct InferenceBridge {
    engine: Arc<dyn InferenceEngine>,
    rooms: Arc<RoomRegistry>,
    metrics: Arc<MetricsAggregator>,
}

impl InferenceBridge {
    pub fn new(
        engine: Arc<dyn InferenceEngine>,
        rooms: Arc<RoomRegistry>,
        metrics: Arc<MetricsAggregator>,
    ) -> Self {
        Self {
            engine,
            rooms,
            metrics,
        }
    }

    /// Run one frame through the engine. On success the result goes to
    /// both media slots of the room (the phone treats it as the ack that
    /// releases its in-flight gate, the viewer renders it) and one metrics
    /// sample is recorded. On failure only the submitter hears about it.
    ///
    /// The engine await is the sole suspension point on this path; a
    /// stalled engine call holds up this frame alone.
    pub async fn submit_frame(
        &self,
        room_id: &str,
        sender: &ConnectionHandle,
        frame: FrameSubmission,
    ) {
        let inference_start = now_ms();

        match self.run_inference(&frame).await {
            Ok(detections) => {
                let inference_ts = now_ms();
                tracing::debug!(
                    frame_id = %frame.frame_id,
                    detections = detections.len(),
                    "inference done"
                );

                let payload = ServerMessage::InferResult {
                    frame_id: frame.frame_id,
                    capture_ts: frame.capture_ts,
                    recv_ts: frame.recv_ts,
                    inference_ts,
                    detections,
                };

                let peers = self.rooms.peers(room_id).await;
                if let Some(phone) = &peers.phone {
                    phone.send(&payload);
                }
                if let Some(viewer) = &peers.viewer {
                    viewer.send(&payload);
                }

                self.metrics
                    .record(MetricsSample {
                        server_latency_ms: Some(
                            (inference_ts - frame.recv_ts.unwrap_or(inference_start)) as f64,
                        ),
                        network_latency_ms: Some(
                            (frame.recv_ts.unwrap_or(inference_ts)
                                - frame.capture_ts.unwrap_or(inference_ts))
                                as f64,
                        ),
                        ..MetricsSample::default()
                    })
                    .await;
            }
            Err(err) => {
                tracing::warn!(frame_id = %frame.frame_id, error = %err, "inference failed");
                sender.send(&ServerMessage::InferError {
                    error: err.to_string(),
                });
            }
        }
    }

    async fn run_inference(&self, frame: &FrameSubmission) -> anyhow::Result<Vec<Detection>> {
        let bytes = BASE64
            .decode(frame.data.as_bytes())
            .context("invalid base64 frame payload")?;
        let (width, height) = image_dimensions(&bytes)?;

        let mime = frame.mime.as_deref().unwrap_or("image/jpeg");
        let raw = self.engine.detect(&bytes, mime).await?;

        Ok(raw
            .into_iter()
            .map(|d| normalize(d, width, height))
            .collect())
    }
}

fn image_dimensions(bytes: &[u8]) -> anyhow::Result<(u32, u32)> {
    let reader = image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("unreadable image payload")?;
    reader.into_dimensions().context("undecodable image payload")
}

/// Map a pixel-space box onto the unit square of a `width`×`height` image,
/// clamped to [0,1].
fn normalize(det: PixelDetection, width: u32, height: u32) -> Detection {
    let w = width.max(1) as f64;
    let h = height.max(1) as f64;
    Detection {
        label: det.label,
        score: det.score,
        xmin: (det.x / w).clamp(0.0, 1.0),
        ymin: (det.y / h).clamp(0.0, 1.0),
        xmax: ((det.x + det.width) / w).clamp(0.0, 1.0),
        ymax: ((det.y + det.height) / h).clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f64, y: f64, width: f64, height: f64) -> PixelDetection {
        PixelDetection {
            label: "person".to_string(),
            score: 0.9,
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn normalize_divides_by_image_dimensions() {
        let d = normalize(det(32.0, 24.0, 64.0, 48.0), 320, 240);
        assert_eq!(d.xmin, 0.1);
        assert_eq!(d.ymin, 0.1);
        assert_eq!(d.xmax, 0.3);
        assert_eq!(d.ymax, 0.3);
    }

    #[test]
    fn normalize_clamps_overflowing_boxes() {
        let d = normalize(det(-10.0, -5.0, 400.0, 300.0), 320, 240);
        assert_eq!(d.xmin, 0.0);
        assert_eq!(d.ymin, 0.0);
        assert_eq!(d.xmax, 1.0);
        assert_eq!(d.ymax, 1.0);
        assert!(d.xmin <= d.xmax && d.ymin <= d.ymax);
    }

    #[test]
    fn dimensions_are_probed_from_the_bytes() {
        let mut png = Vec::new();
        image::RgbImage::new(320, 240)
            .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
            .unwrap();
        assert_eq!(image_dimensions(&png).unwrap(), (320, 240));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(image_dimensions(b"not an image").is_err());
    }
}
