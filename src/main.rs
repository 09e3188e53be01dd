use anyhow::{Context, Result};
use line_safety_bot::{app, config::Config, line_api::LineClient, provision_rich_menu, AppState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    let addr = config.bind_address();
    let client = Arc::new(LineClient::new(&config));
    let state = AppState::new(config, client);

    info!("Starting LINE safety bot on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    if state.config.richmenu_provision {
        tokio::spawn(provision_rich_menu(state.clone()));
    }

    axum::serve(listener, app(state))
        .await
        .context("server error")?;

    Ok(())
}
