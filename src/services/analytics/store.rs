use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Bucket width for the grouped event query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }

    /// Unrecognized input falls back to daily; the engine itself never
    /// rejects a granularity.
    pub fn normalize(raw: &str) -> Self {
        Self::parse(raw).unwrap_or(Self::Daily)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    fn truncate_unit(self) -> &'static str {
        match self {
            Self::Daily => "day",
            Self::Weekly => "week",
            Self::Monthly => "month",
        }
    }
}

/// One (bucket, farm, sector) group of irrigation events.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AggregatedBucket {
    pub bucket_start: DateTime<Utc>,
    pub water_volume: f64,
    pub duration_minutes: i64,
    pub event_count: i64,
    pub nominal_amount: f64,
    pub real_amount: f64,
    pub farm_id: i64,
    pub sector_id: i64,
}

/// Groups events in the half-open window `[start, end)` by truncated start
/// time. Weekly buckets start on ISO Monday; events with no sector land in
/// sector 0.
pub async fn fetch_aggregated_buckets(
    pool: &PgPool,
    farm_id: i64,
    sector_id: Option<i64>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    granularity: Granularity,
) -> Result<Vec<AggregatedBucket>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT
            date_trunc($4, start_time) AS bucket_start,
            sum(water_volume) AS water_volume,
            sum(duration_minutes)::bigint AS duration_minutes,
            count(*) AS event_count,
            sum(nominal_amount) AS nominal_amount,
            sum(real_amount) AS real_amount,
            farm_id,
            COALESCE(sector_id, 0) AS sector_id
        FROM irrigation_events
        WHERE farm_id = $1
          AND start_time >= $2
          AND start_time < $3
          AND ($5::bigint IS NULL OR sector_id = $5)
        GROUP BY date_trunc($4, start_time), farm_id, sector_id
        ORDER BY date_trunc($4, start_time) ASC
        "#,
    )
    .bind(farm_id)
    .bind(start)
    .bind(end)
    .bind(granularity.truncate_unit())
    .bind(sector_id)
    .fetch_all(pool)
    .await
}

pub async fn farm_exists(pool: &PgPool, farm_id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM farms WHERE id = $1)")
        .bind(farm_id)
        .fetch_one(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_granularities() {
        assert_eq!(Granularity::parse("daily"), Some(Granularity::Daily));
        assert_eq!(Granularity::parse("WEEKLY"), Some(Granularity::Weekly));
        assert_eq!(Granularity::parse(" monthly "), Some(Granularity::Monthly));
        assert_eq!(Granularity::parse("hourly"), None);
        assert_eq!(Granularity::parse(""), None);
    }

    #[test]
    fn normalize_defaults_to_daily() {
        assert_eq!(Granularity::normalize("weekly"), Granularity::Weekly);
        assert_eq!(Granularity::normalize("annual"), Granularity::Daily);
        assert_eq!(Granularity::normalize(""), Granularity::Daily);
    }

    #[test]
    fn truncate_unit_matches_date_trunc_vocabulary() {
        assert_eq!(Granularity::Daily.truncate_unit(), "day");
        assert_eq!(Granularity::Weekly.truncate_unit(), "week");
        assert_eq!(Granularity::Monthly.truncate_unit(), "month");
    }
}
