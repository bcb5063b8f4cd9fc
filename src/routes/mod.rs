pub mod analytics;
pub mod health;
pub mod metrics;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest(
            "/api",
            Router::new()
                .merge(analytics::router())
                .merge(metrics::router())
                .merge(crate::openapi::router()),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            track_request,
        ))
        .with_state(state)
}

/// Counts every request by `METHOD path` and logs its outcome.
async fn track_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = std::time::Instant::now();

    let response = next.run(request).await;

    state.metrics.record(&format!("{method} {path}"));
    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request completed"
    );
    response
}
