use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};

use crate::error::map_db_error;
use crate::services::analytics;
use crate::services::analytics::store::{self, Granularity};
use crate::services::analytics::types::AnalyticsResponse;
use crate::state::AppState;
use crate::time;

#[derive(Debug, Clone, serde::Deserialize, utoipa::IntoParams)]
pub(crate) struct AnalyticsQuery {
    /// Restrict to a single irrigation sector.
    sector_id: Option<i64>,
    /// Window start, inclusive. RFC 3339 or YYYY-MM-DD.
    start_date: Option<String>,
    /// Window end, exclusive. RFC 3339 or YYYY-MM-DD.
    end_date: Option<String>,
    /// daily (default), weekly or monthly.
    aggregation: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/farms/{farm_id}/irrigation/analytics",
    tag = "analytics",
    params(
        ("farm_id" = i64, Path, description = "Farm id"),
        AnalyticsQuery
    ),
    responses(
        (status = 200, description = "Aggregated irrigation analytics", body = AnalyticsResponse),
        (status = 400, description = "Invalid parameters"),
        (status = 404, description = "Farm not found")
    )
)]
pub(crate) async fn irrigation_analytics_handler(
    State(state): State<AppState>,
    Path(farm_id): Path<i64>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsResponse>, (StatusCode, String)> {
    let started = std::time::Instant::now();

    if farm_id <= 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "farm_id must be a positive integer".to_string(),
        ));
    }
    if let Some(sector_id) = query.sector_id {
        if sector_id <= 0 {
            return Err((
                StatusCode::BAD_REQUEST,
                "sector_id must be a positive integer".to_string(),
            ));
        }
    }

    let start_date = parse_date_param(query.start_date.as_deref(), "start_date")?;
    let end_date = parse_date_param(query.end_date.as_deref(), "end_date")?;
    if end_date < start_date {
        return Err((
            StatusCode::BAD_REQUEST,
            "end_date must not be before start_date".to_string(),
        ));
    }

    let aggregation = query.aggregation.as_deref().unwrap_or("daily");
    if Granularity::parse(aggregation).is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            "aggregation must be one of: daily, weekly, monthly".to_string(),
        ));
    }

    if !store::farm_exists(&state.db, farm_id)
        .await
        .map_err(map_db_error)?
    {
        return Err((
            StatusCode::NOT_FOUND,
            format!("Farm with ID {farm_id} does not exist"),
        ));
    }

    tracing::info!(
        farm_id,
        sector_id = ?query.sector_id,
        start_date = %start_date.to_rfc3339(),
        end_date = %end_date.to_rfc3339(),
        aggregation,
        "processing analytics request"
    );

    let analytics = analytics::irrigation_analytics(
        &state.db,
        farm_id,
        query.sector_id,
        start_date,
        end_date,
        aggregation,
    )
    .await
    .map_err(map_db_error)?;

    tracing::info!(
        farm_id,
        data_points = analytics.data.len(),
        latency_ms = started.elapsed().as_millis() as u64,
        "analytics request completed"
    );

    Ok(Json(analytics))
}

fn parse_date_param(
    raw: Option<&str>,
    name: &str,
) -> Result<DateTime<Utc>, (StatusCode, String)> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("{name} is required")))?;
    time::parse_flexible(raw).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("{name} must be an ISO 8601 date or datetime"),
        )
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/farms/{farm_id}/irrigation/analytics",
        get(irrigation_analytics_handler),
    )
}
