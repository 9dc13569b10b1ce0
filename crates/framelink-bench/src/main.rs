//! Framelink Bench - Simulated Phone Peer
//!
//! Connects to a Framelink server as the `phone` role and submits
//! `infer_frame` messages at a fixed rate, tallying the results that come
//! back. Point `/bench/start` at the same window to collect a report.
//!
//! # Usage
//!
//! ```bash
//! # Grab a room id, then flood it with 30 frames at 5 fps
//! framelink-bench --room <roomId> --frames 30 --interval 200
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use framelink_protocol::{ClientMessage, Role, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use rand::{Rng, distributions::Alphanumeric};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Tiny placeholder JPEG submitted as every frame's payload.
const PLACEHOLDER_FRAME: &str = "/9j/4AAQSkZJRgABAQAAAQABAAD/2wCEAAkGBxISEhUSEhIVFRUVFRUVFRUVFRUVFRUWFhUVFRUYHSggGBolGxUVITEhJSkrLi4uFx8zODMtNygtLisBCgoKDg0OGxAQGy0lICYtLS0tLS0tLS0tLS0tLS0tLS0tLS0tLS0tLS0tLS0tLS0tLS0tLS0tLS0tLf/AABEIAKAAoAMBIgACEQEDEQH/xAAVAQEBAAAAAAAAAAAAAAAAAAAEBf/EABQBAQAAAAAAAAAAAAAAAAAAAAD/2gAMAwEAAhADEAAAAJf/xAAUEAEAAAAAAAAAAAAAAAAAAAAA/9oACAEBAAE/ANf/xAAUEQEAAAAAAAAAAAAAAAAAAAAA/9oACAEDAQE/ANf/xAAUEQEAAAAAAAAAAAAAAAAAAAAA/9oACAECAQE/ANf/2Q==";

/// Framelink Bench - flood a room with inference frames
#[derive(Parser)]
#[command(name = "framelink-bench")]
#[command(author, version)]
#[command(about = "Join a room as the phone role and submit frames at a fixed rate")]
struct Args {
    /// Room to join (get one from /api/new-room)
    #[arg(short, long)]
    room: String,

    /// WebSocket endpoint of the server
    #[arg(short, long, default_value = "ws://localhost:3000/ws")]
    url: String,

    /// Number of frames to submit
    #[arg(short, long, default_value_t = 30)]
    frames: u32,

    /// Delay between frames, in milliseconds
    #[arg(short, long, default_value_t = 200)]
    interval: u64,
}

fn frame_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "framelink_bench=info".into()),
        )
        .with(fmt::layer())
        .init();

    let (ws_stream, _) = connect_async(&args.url)
        .await
        .with_context(|| format!("connecting to {}", args.url))?;
    let (mut write, mut read) = ws_stream.split();

    tracing::info!(room = %args.room, "joining as phone");
    write
        .send(Message::Text(
            serde_json::to_string(&ClientMessage::Join {
                role: Role::Phone,
                room_id: args.room.clone(),
            })?
            .into(),
        ))
        .await?;

    let results = Arc::new(AtomicU32::new(0));
    let errors = Arc::new(AtomicU32::new(0));

    // Tally everything the server sends back while frames go out.
    let reader = {
        let results = results.clone();
        let errors = errors.clone();
        tokio::spawn(async move {
            while let Some(Ok(frame)) = read.next().await {
                let Message::Text(text) = frame else { continue };
                match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(ServerMessage::Joined { role, room_id }) => {
                        tracing::info!(%role, room = %room_id, "joined");
                    }
                    Ok(ServerMessage::InferResult {
                        frame_id,
                        detections,
                        ..
                    }) => {
                        results.fetch_add(1, Ordering::Relaxed);
                        tracing::info!(%frame_id, detections = detections.len(), "result");
                    }
                    Ok(ServerMessage::InferError { error }) => {
                        errors.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(%error, "inference error");
                    }
                    Ok(other) => tracing::debug!(?other, "message"),
                    Err(_) => tracing::debug!("received undecodable message"),
                }
            }
        })
    };

    for seq in 0..args.frames {
        let id = frame_id();
        let now = chrono::Utc::now().timestamp_millis();
        let msg = ClientMessage::InferFrame {
            frame_id: id.clone(),
            capture_ts: Some(now),
            recv_ts: Some(now),
            mime: Some("image/jpeg".to_string()),
            data: PLACEHOLDER_FRAME.to_string(),
        };
        write
            .send(Message::Text(serde_json::to_string(&msg)?.into()))
            .await
            .context("frame send failed")?;
        tracing::info!(frame_id = %id, seq, "frame sent");
        tokio::time::sleep(Duration::from_millis(args.interval)).await;
    }
    tracing::info!("done sending frames");

    // Grace period for trailing results before tearing down.
    tokio::time::sleep(Duration::from_secs(2)).await;
    write.send(Message::Close(None)).await.ok();
    reader.abort();

    tracing::info!(
        sent = args.frames,
        results = results.load(Ordering::Relaxed),
        errors = errors.load(Ordering::Relaxed),
        "bench finished"
    );

    Ok(())
}
