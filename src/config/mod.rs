use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: String,
    pub dashboard_cache_ttl_secs: u64,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_access_token_expiry_secs: i64,
    pub frontend_url: String,
    pub affiliate_qualification_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            dashboard_cache_ttl_secs: parse_or("DASHBOARD_CACHE_TTL_SECS", 300),
            host: env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("BACKEND_PORT", 3000),
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_access_token_expiry_secs: parse_or("JWT_ACCESS_TOKEN_EXPIRY_SECS", 900),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "https://localhost:5173".to_string()),
            affiliate_qualification_days: parse_or("AFFILIATE_QUALIFICATION_DAYS", 30),
        })
    }
}

/// Read and parse an optional variable, falling back on absence or parse failure.
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
