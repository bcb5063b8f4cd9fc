use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::AppConfig;

pub fn connect_lazy(config: &AppConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_seconds))
        .connect_lazy(&config.database_url)
        .with_context(|| {
            format!(
                "Failed to create lazy database pool for {}",
                config.database_url
            )
        })
}
