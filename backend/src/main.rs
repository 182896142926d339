// --- File: backend/src/main.rs ---

use quiz_backend::{
    config::AppConfig,
    db,
    web_server::{run_server, AppState},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- Setup ---
    // 1. Initialize structured logging (RUST_LOG overrides the default level)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Load configuration (Config.toml + APP_* environment)
    let app_config = AppConfig::from_env()?;

    // 3. Open the database and apply migrations
    let db_pool = db::connect(&app_config.database).await?;

    let app_state = AppState {
        db_pool,
        app_config,
    };

    // --- Run Server ---
    tracing::info!("Initializing server...");
    run_server(app_state).await
}
