use axum::extract::FromRef;
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::routes::metrics::RequestMetrics;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: PgPool,
    pub metrics: Arc<RequestMetrics>,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.db.clone()
    }
}
