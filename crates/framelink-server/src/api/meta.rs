use crate::state::AppState;
use axum::{Json, extract::State};
use serde::Serialize;
use serde_json::{Value, json};

pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Runtime configuration served to peers at startup.
#[derive(Debug, Serialize)]
pub struct RuntimeConfig {
    pub mode: String,
    #[serde(rename = "publicBaseUrl")]
    pub public_base_url: Option<String>,
    pub turn: Option<TurnConfig>,
}

#[derive(Debug, Serialize)]
pub struct TurnConfig {
    pub urls: Vec<String>,
    pub username: String,
    pub credential: String,
}

pub async fn config(State(state): State<AppState>) -> Json<RuntimeConfig> {
    let turn = state.config.turn.as_ref().map(|t| TurnConfig {
        urls: vec![t.url.clone()],
        username: t.username.clone(),
        credential: t.credential.clone(),
    });

    Json(RuntimeConfig {
        mode: state.config.mode.clone(),
        public_base_url: state.config.public_base_url.clone(),
        turn,
    })
}
