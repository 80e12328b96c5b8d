use std::net::SocketAddr;

use anyhow::Context;
use learnhub::config::AppConfig;
use learnhub::{db, routes, AppState};
use mimalloc::MiMalloc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// M-MIMALLOC-APP: Use mimalloc as global allocator for improved performance.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "learnhub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to connect to database")?;
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let ip: std::net::IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid BACKEND_HOST '{}'", config.host))?;
    let addr = SocketAddr::new(ip, config.port);

    let state = AppState::new(pool, config);
    tracing::info!(
        host = %addr,
        dashboard_cache = state.cache.is_enabled(),
        "Starting LearnHub API server"
    );

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
