use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::routes;
use crate::services::analytics::types::{
    AggregatedDataPoint, AnalyticsResponse, AnalyticsSummary, PeriodComparison, PeriodInfo,
    PeriodMetrics, SectorBreakdown, YearComparison, YearOverYearComparison,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "irrigation-analytics-rs",
        description = "Irrigation analytics and year-over-year comparison API"
    ),
    paths(
        routes::health::healthz_handler,
        routes::metrics::metrics_handler,
        routes::analytics::irrigation_analytics_handler,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::metrics::MetricsResponse,
        AnalyticsResponse,
        PeriodInfo,
        AggregatedDataPoint,
        AnalyticsSummary,
        PeriodComparison,
        PeriodMetrics,
        SectorBreakdown,
        YearOverYearComparison,
        YearComparison,
    ))
)]
struct ApiDoc;

pub fn openapi_json() -> serde_json::Value {
    serde_json::to_value(ApiDoc::openapi()).unwrap_or_default()
}

pub(crate) async fn openapi_handler() -> Json<serde_json::Value> {
    Json(openapi_json())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_handler))
}
