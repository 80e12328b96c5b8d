pub mod config;
pub mod db;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use sqlx::PgPool;

use crate::services::cache::DashboardCache;

/// Shared application state passed to all Axum handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: PgPool,
    pub cache: DashboardCache,
    pub config: config::AppConfig,
}

impl AppState {
    pub fn new(db: PgPool, config: config::AppConfig) -> Self {
        let cache = DashboardCache::new(&config.redis_url, config.dashboard_cache_ttl_secs);
        Self { db, cache, config }
    }
}
