use std::net::SocketAddr;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::config::AppConfig;
use server::database::init_db;
use server::seed::ensure_superuser;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    let db = init_db(&config.database)
        .await
        .context("failed to connect to the database")?;
    ensure_superuser(&db, &config.superuser)
        .await
        .context("failed to seed superuser")?;

    let store = config
        .storage
        .build_store()
        .await
        .context("failed to initialise object storage")?;
    info!(backend = ?config.storage.backend, "Object storage ready");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;

    let app = server::build_router(AppState::new(db, config, store));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
