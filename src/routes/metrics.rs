use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::state::AppState;

/// In-process request counters, shared across handlers through the app
/// state. Counters reset on restart.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    inner: Mutex<Counters>,
}

#[derive(Debug, Default, Clone)]
struct Counters {
    total_requests: u64,
    requests_by_endpoint: BTreeMap<String, u64>,
}

impl RequestMetrics {
    pub fn record(&self, endpoint: &str) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.total_requests += 1;
        *inner
            .requests_by_endpoint
            .entry(endpoint.to_string())
            .or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> MetricsResponse {
        let inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        MetricsResponse {
            total_requests: inner.total_requests,
            requests_by_endpoint: inner.requests_by_endpoint.clone(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct MetricsResponse {
    pub total_requests: u64,
    pub requests_by_endpoint: BTreeMap<String, u64>,
}

#[utoipa::path(
    get,
    path = "/api/metrics",
    tag = "metrics",
    responses((status = 200, description = "Request counters", body = MetricsResponse))
)]
pub(crate) async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(state.metrics.snapshot())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_per_endpoint_counts() {
        let metrics = RequestMetrics::default();
        metrics.record("GET /healthz");
        metrics.record("GET /healthz");
        metrics.record("GET /api/metrics");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.requests_by_endpoint["GET /healthz"], 2);
        assert_eq!(snapshot.requests_by_endpoint["GET /api/metrics"], 1);
    }

    #[test]
    fn empty_metrics_snapshot() {
        let snapshot = RequestMetrics::default().snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert!(snapshot.requests_by_endpoint.is_empty());
    }
}
