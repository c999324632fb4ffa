use std::path::Path;

use anyhow::Context;
use tokio::net::TcpListener;

use ragchat_backend::config::AppConfig;
use ragchat_backend::server::router;
use ragchat_backend::state::AppState;
use ragchat_backend::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(Path::new("logs"));

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let state = AppState::initialize(&config)
        .await
        .context("Failed to initialize application state")?;

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let app = router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
