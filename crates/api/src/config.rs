//! API server configuration

use anyhow::Context;

/// Server configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub jwt_secret: String,
    /// Comma-separated CORS origin allowlist
    pub allowed_origins: String,
    /// Whether to run embedded migrations on startup
    pub run_migrations: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());
        let run_migrations = std::env::var("RUN_MIGRATIONS")
            .map(|v| v != "false")
            .unwrap_or(true);

        Ok(Self {
            database_url,
            bind_address,
            jwt_secret,
            allowed_origins,
            run_migrations,
        })
    }
}
