use crate::infer::{InferenceBridge, InferenceEngine, NoopEngine};
use crate::metrics::MetricsAggregator;
use crate::rooms::RoomRegistry;
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Deployment mode surfaced to peers via /config.json ("wasm" runs
    /// inference on the viewer, "server" routes frames through /ws).
    pub mode: String,
    pub public_base_url: Option<String>,
    pub turn: Option<TurnServer>,
    pub tunnel_requested: bool,
    pub bench_output_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TurnServer {
    pub url: String,
    pub username: String,
    pub credential: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().context("invalid PORT")?,
            Err(_) => 3000,
        };

        let mode = std::env::var("MODE")
            .unwrap_or_else(|_| "wasm".to_string())
            .to_lowercase();

        let public_base_url = std::env::var("PUBLIC_BASE_URL").ok();

        // TURN requires the full triple; a partial configuration is the
        // same as none.
        let turn = match (
            std::env::var("TURN_URL"),
            std::env::var("TURN_USERNAME"),
            std::env::var("TURN_CREDENTIAL"),
        ) {
            (Ok(url), Ok(username), Ok(credential)) => Some(TurnServer {
                url,
                username,
                credential,
            }),
            _ => None,
        };

        let tunnel_requested = env_flag("NGROK")
            || env_flag("LOCALTUNNEL")
            || std::env::args().any(|arg| arg == "--ngrok" || arg == "--localtunnel");

        let bench_output_dir = std::env::var("BENCH_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("output"));

        Ok(Config {
            port,
            mode,
            public_base_url,
            turn,
            tunnel_requested,
            bench_output_dir,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "1").unwrap_or(false)
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub rooms: Arc<RoomRegistry>,
    pub metrics: Arc<MetricsAggregator>,
    pub inference: InferenceBridge,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_engine(config, Arc::new(NoopEngine))
    }

    pub fn with_engine(config: Config, engine: Arc<dyn InferenceEngine>) -> Self {
        let rooms = Arc::new(RoomRegistry::new());
        let metrics = Arc::new(MetricsAggregator::new());
        let inference = InferenceBridge::new(engine, rooms.clone(), metrics.clone());

        Self {
            config,
            rooms,
            metrics,
            inference,
        }
    }
}
