use anyhow::Result;
use framelink_server::state::{AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "framelink_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Framelink server...");

    // Load configuration
    let config = Config::load()?;
    if config.tunnel_requested {
        tracing::warn!(
            "tunnel flag set but no tunnel provider is bundled; set PUBLIC_BASE_URL to publish an external address"
        );
    }

    // Create application state
    let state = AppState::new(config.clone());

    // Build the router
    let app = framelink_server::create_app(state);

    // Start the server
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Listening on {}", config.bind_address());

    axum::serve(listener, app).await?;

    Ok(())
}
