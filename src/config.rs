use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env_optional_string("ANALYTICS_DATABASE_URL")
            .or_else(|| env_optional_string("DATABASE_URL"))
            .context("ANALYTICS_DATABASE_URL (or DATABASE_URL) must be set")?;
        let database_url = normalize_database_url(database_url);
        if database_url.trim().is_empty() {
            anyhow::bail!("ANALYTICS_DATABASE_URL resolved to an empty value");
        }

        let db_max_connections = env_u32("ANALYTICS_DB_MAX_CONNECTIONS", 10).max(1);
        let db_acquire_timeout_seconds =
            env_u64("ANALYTICS_DB_ACQUIRE_TIMEOUT_SECONDS", 8).clamp(1, 120);

        Ok(Self {
            database_url,
            db_max_connections,
            db_acquire_timeout_seconds,
        })
    }
}

fn env_optional_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn normalize_database_url(url: String) -> String {
    if let Some(stripped) = url.strip_prefix("postgresql+psycopg://") {
        return format!("postgresql://{stripped}");
    }
    if let Some(stripped) = url.strip_prefix("postgresql+asyncpg://") {
        return format!("postgresql://{stripped}");
    }
    url
}
