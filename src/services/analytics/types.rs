use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Full analytics payload for one farm and request window.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalyticsResponse {
    pub farm_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector_id: Option<i64>,
    pub period: PeriodInfo,
    pub aggregation: String,
    pub data: Vec<AggregatedDataPoint>,
    pub summary: AnalyticsSummary,
    pub period_comparison: PeriodComparison,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector_breakdown: Option<Vec<SectorBreakdown>>,
    pub year_over_year: YearOverYearComparison,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PeriodInfo {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// One time bucket of the requested window.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AggregatedDataPoint {
    pub period: DateTime<Utc>,
    pub water_volume: f64,
    pub duration: i64,
    pub efficiency: f64,
    pub event_count: i64,
    pub real_amount: f64,
    pub nominal_amount: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalyticsSummary {
    pub total_water_volume: f64,
    pub total_duration: i64,
    pub average_efficiency: f64,
    pub total_events: i64,
    pub total_real_amount: f64,
    pub total_nominal_amount: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PeriodComparison {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_year_ago: Option<PeriodMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_years_ago: Option<PeriodMetrics>,
}

/// A historical window restated next to its deltas against the current one.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PeriodMetrics {
    pub period: PeriodInfo,
    pub total_water_volume: f64,
    pub total_events: i64,
    pub average_efficiency: f64,
    pub volume_change_percent: f64,
    pub events_change_percent: f64,
    pub efficiency_change_percent: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SectorBreakdown {
    pub sector_id: i64,
    pub total_water_volume: f64,
    pub total_events: i64,
    pub average_efficiency: f64,
    pub total_real_amount: f64,
    pub total_nominal_amount: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct YearOverYearComparison {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_year_ago: Option<YearComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_years_ago: Option<YearComparison>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct YearComparison {
    pub period: PeriodInfo,
    pub total_water_volume: f64,
    pub total_duration: i64,
    pub average_efficiency: f64,
    pub total_events: i64,
    pub change_percent: f64,
}
