use std::sync::Arc;

use crate::config::AppConfig;
use crate::db;
use crate::routes::metrics::RequestMetrics;
use crate::state::AppState;

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgresql://postgres@localhost:5432/postgres".to_string(),
        db_max_connections: 2,
        db_acquire_timeout_seconds: 1,
    }
}

/// App state backed by a lazy pool that never connects; handler tests only
/// exercise paths that fail before touching the database.
pub fn test_state() -> AppState {
    let config = test_config();
    let db = db::connect_lazy(&config).expect("lazy test pool");
    AppState {
        config,
        db,
        metrics: Arc::new(RequestMetrics::default()),
    }
}
