pub mod store;
pub mod types;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::BTreeMap;

use crate::time::years_back;
use store::{AggregatedBucket, Granularity};
use types::{
    AggregatedDataPoint, AnalyticsResponse, AnalyticsSummary, PeriodComparison, PeriodInfo,
    PeriodMetrics, SectorBreakdown, YearComparison, YearOverYearComparison,
};

/// Expected liters per minute of runtime, used when a bucket predates the
/// nominal/real split and only carries volume and duration.
const FALLBACK_NOMINAL_PER_MINUTE: f64 = 1.0;

/// Builds the full analytics payload for one farm and window. The current
/// window is authoritative; historical windows and the sector breakdown
/// degrade to absence when their fetches fail.
pub async fn irrigation_analytics(
    pool: &PgPool,
    farm_id: i64,
    sector_id: Option<i64>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    aggregation: &str,
) -> Result<AnalyticsResponse, sqlx::Error> {
    let granularity = Granularity::normalize(aggregation);

    let one_year = PeriodInfo {
        start_date: years_back(start, 1),
        end_date: years_back(end, 1),
    };
    let two_years = PeriodInfo {
        start_date: years_back(start, 2),
        end_date: years_back(end, 2),
    };

    let (current, one_year_rows, two_year_rows, breakdown_rows) = tokio::join!(
        store::fetch_aggregated_buckets(pool, farm_id, sector_id, start, end, granularity),
        store::fetch_aggregated_buckets(
            pool,
            farm_id,
            sector_id,
            one_year.start_date,
            one_year.end_date,
            granularity,
        ),
        store::fetch_aggregated_buckets(
            pool,
            farm_id,
            sector_id,
            two_years.start_date,
            two_years.end_date,
            granularity,
        ),
        async {
            // The breakdown always spans every sector, so it is redundant
            // when the request is already scoped to one.
            match sector_id {
                Some(_) => Ok(None),
                None => {
                    store::fetch_aggregated_buckets(pool, farm_id, None, start, end, granularity)
                        .await
                        .map(Some)
                }
            }
        },
    );

    let current = current?;
    let summary = summarize(&current);

    let one_year_ago = historical_window(one_year_rows, one_year, "one_year_ago");
    let two_years_ago = historical_window(two_year_rows, two_years, "two_years_ago");

    let sector_breakdown = match sector_id {
        Some(_) => None,
        None => Some(match breakdown_rows {
            Ok(rows) => breakdown_by_sector(&rows.unwrap_or_default()),
            Err(err) => {
                tracing::warn!(error = %err, farm_id, "sector breakdown fetch failed; returning empty breakdown");
                Vec::new()
            }
        }),
    };

    let period_comparison = PeriodComparison {
        one_year_ago: one_year_ago.as_ref().map(|w| period_metrics(&summary, w)),
        two_years_ago: two_years_ago.as_ref().map(|w| period_metrics(&summary, w)),
    };
    let year_over_year = YearOverYearComparison {
        one_year_ago: one_year_ago.as_ref().map(|w| year_comparison(&summary, w)),
        two_years_ago: two_years_ago.as_ref().map(|w| year_comparison(&summary, w)),
    };

    Ok(AnalyticsResponse {
        farm_id,
        sector_id,
        period: PeriodInfo {
            start_date: start,
            end_date: end,
        },
        aggregation: granularity.as_str().to_string(),
        data: build_data_points(&current),
        summary,
        period_comparison,
        sector_breakdown,
        year_over_year,
    })
}

/// A historical window that actually had events, paired with its summary.
struct HistoricalWindow {
    period: PeriodInfo,
    summary: AnalyticsSummary,
}

fn historical_window(
    rows: Result<Vec<AggregatedBucket>, sqlx::Error>,
    period: PeriodInfo,
    label: &str,
) -> Option<HistoricalWindow> {
    let rows = match rows {
        Ok(rows) => rows,
        Err(err) => {
            tracing::warn!(error = %err, window = label, "historical fetch failed; omitting comparison");
            return None;
        }
    };
    if rows.is_empty() {
        return None;
    }
    Some(HistoricalWindow {
        summary: summarize(&rows),
        period,
    })
}

/// Delivered-over-expected ratio, rounded to 4 decimal places. A zero
/// expectation yields 0.0 rather than a division error.
pub(crate) fn efficiency(real: f64, nominal: f64) -> f64 {
    if nominal == 0.0 {
        return 0.0;
    }
    round4(real / nominal)
}

fn bucket_efficiency(bucket: &AggregatedBucket) -> f64 {
    if bucket.real_amount == 0.0
        && bucket.nominal_amount == 0.0
        && bucket.water_volume > 0.0
        && bucket.duration_minutes > 0
    {
        let nominal = bucket.duration_minutes as f64 * FALLBACK_NOMINAL_PER_MINUTE;
        return efficiency(bucket.water_volume, nominal);
    }
    efficiency(bucket.real_amount, bucket.nominal_amount)
}

/// Relative change in percent, rounded to 2 decimal places. A zero baseline
/// reports 0.0 when the current value is also zero and a fixed +100.0
/// otherwise.
pub(crate) fn change_percent(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current == 0.0 {
            return 0.0;
        }
        return 100.0;
    }
    round2(((current - previous) / previous) * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn summarize(rows: &[AggregatedBucket]) -> AnalyticsSummary {
    let mut total_water_volume = 0.0;
    let mut total_duration = 0i64;
    let mut total_real = 0.0;
    let mut total_nominal = 0.0;
    let mut total_events = 0i64;
    let mut efficiency_sum = 0.0;
    let mut efficiency_count = 0usize;

    for row in rows {
        total_water_volume += row.water_volume;
        total_duration += row.duration_minutes;
        total_real += row.real_amount;
        total_nominal += row.nominal_amount;
        total_events += row.event_count;

        // Buckets with no usable efficiency stay out of the average.
        let eff = bucket_efficiency(row);
        if eff > 0.0 {
            efficiency_sum += eff;
            efficiency_count += 1;
        }
    }

    let average_efficiency = if efficiency_count > 0 {
        round4(efficiency_sum / efficiency_count as f64)
    } else {
        0.0
    };

    AnalyticsSummary {
        total_water_volume: round2(total_water_volume),
        total_duration,
        average_efficiency,
        total_events,
        total_real_amount: round2(total_real),
        total_nominal_amount: round2(total_nominal),
    }
}

fn build_data_points(rows: &[AggregatedBucket]) -> Vec<AggregatedDataPoint> {
    rows.iter()
        .map(|row| AggregatedDataPoint {
            period: row.bucket_start,
            water_volume: row.water_volume,
            duration: row.duration_minutes,
            efficiency: bucket_efficiency(row),
            event_count: row.event_count,
            real_amount: row.real_amount,
            nominal_amount: row.nominal_amount,
        })
        .collect()
}

fn period_metrics(current: &AnalyticsSummary, window: &HistoricalWindow) -> PeriodMetrics {
    let previous = &window.summary;
    PeriodMetrics {
        period: window.period.clone(),
        total_water_volume: previous.total_water_volume,
        total_events: previous.total_events,
        average_efficiency: previous.average_efficiency,
        volume_change_percent: change_percent(
            current.total_water_volume,
            previous.total_water_volume,
        ),
        events_change_percent: change_percent(
            current.total_events as f64,
            previous.total_events as f64,
        ),
        efficiency_change_percent: change_percent(
            current.average_efficiency,
            previous.average_efficiency,
        ),
    }
}

fn year_comparison(current: &AnalyticsSummary, window: &HistoricalWindow) -> YearComparison {
    let previous = &window.summary;
    YearComparison {
        period: window.period.clone(),
        total_water_volume: previous.total_water_volume,
        total_duration: previous.total_duration,
        average_efficiency: previous.average_efficiency,
        total_events: previous.total_events,
        change_percent: change_percent(current.total_water_volume, previous.total_water_volume),
    }
}

fn breakdown_by_sector(rows: &[AggregatedBucket]) -> Vec<SectorBreakdown> {
    #[derive(Default)]
    struct SectorTotals {
        water_volume: f64,
        events: i64,
        real: f64,
        nominal: f64,
    }

    // BTreeMap keeps the output ordered by sector id, so identical inputs
    // serialize identically.
    let mut totals: BTreeMap<i64, SectorTotals> = BTreeMap::new();
    for row in rows {
        let entry = totals.entry(row.sector_id).or_default();
        entry.water_volume += row.water_volume;
        entry.events += row.event_count;
        entry.real += row.real_amount;
        entry.nominal += row.nominal_amount;
    }

    totals
        .into_iter()
        .map(|(sector_id, totals)| SectorBreakdown {
            sector_id,
            total_water_volume: round2(totals.water_volume),
            total_events: totals.events,
            // Efficiency comes from the sector totals, not a mean of
            // per-bucket ratios.
            average_efficiency: efficiency(totals.real, totals.nominal),
            total_real_amount: round2(totals.real),
            total_nominal_amount: round2(totals.nominal),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bucket(volume: f64, duration: i64, events: i64, nominal: f64, real: f64) -> AggregatedBucket {
        AggregatedBucket {
            bucket_start: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            water_volume: volume,
            duration_minutes: duration,
            event_count: events,
            nominal_amount: nominal,
            real_amount: real,
            farm_id: 1,
            sector_id: 1,
        }
    }

    fn summary(volume: f64, duration: i64, eff: f64, events: i64) -> AnalyticsSummary {
        AnalyticsSummary {
            total_water_volume: volume,
            total_duration: duration,
            average_efficiency: eff,
            total_events: events,
            total_real_amount: volume,
            total_nominal_amount: volume,
        }
    }

    fn window(period_year: i32, summary: AnalyticsSummary) -> HistoricalWindow {
        HistoricalWindow {
            period: PeriodInfo {
                start_date: Utc.with_ymd_and_hms(period_year, 1, 1, 0, 0, 0).unwrap(),
                end_date: Utc.with_ymd_and_hms(period_year, 2, 1, 0, 0, 0).unwrap(),
            },
            summary,
        }
    }

    #[test]
    fn efficiency_guards_zero_nominal_and_rounds() {
        assert_eq!(efficiency(100.0, 0.0), 0.0);
        assert_eq!(efficiency(0.0, 0.0), 0.0);
        assert_eq!(efficiency(0.0, 100.0), 0.0);
        assert_eq!(efficiency(120.0, 100.0), 1.2);
        assert_eq!(efficiency(100.123456, 100.0), 1.0012);
        assert_eq!(efficiency(0.001, 0.01), 0.1);
    }

    #[test]
    fn change_percent_table() {
        assert_eq!(change_percent(0.0, 0.0), 0.0);
        assert_eq!(change_percent(100.0, 0.0), 100.0);
        assert_eq!(change_percent(0.0, 100.0), -100.0);
        assert_eq!(change_percent(110.0, 100.0), 10.0);
        assert_eq!(change_percent(90.0, 100.0), -10.0);
        assert_eq!(change_percent(111.111, 100.0), 11.11);
    }

    #[test]
    fn change_percent_keeps_sign_of_negative_baseline() {
        // A negative baseline is nonsensical for these metrics but the
        // formula is applied verbatim rather than special-cased.
        assert_eq!(change_percent(50.0, -100.0), -150.0);
    }

    #[test]
    fn bucket_efficiency_falls_back_to_runtime_nominal() {
        // Legacy bucket: volume and duration only.
        assert_eq!(bucket_efficiency(&bucket(120.0, 60, 2, 0.0, 0.0)), 2.0);
        // No duration means no derivable expectation.
        assert_eq!(bucket_efficiency(&bucket(120.0, 0, 2, 0.0, 0.0)), 0.0);
        // Populated nominal/real pair wins over the fallback.
        assert_eq!(bucket_efficiency(&bucket(120.0, 60, 2, 100.0, 90.0)), 0.9);
    }

    #[test]
    fn summarize_excludes_zero_efficiency_buckets_from_average() {
        let rows = vec![
            bucket(120.0, 60, 2, 100.0, 120.0),
            bucket(0.0, 0, 1, 0.0, 0.0),
        ];
        let summary = summarize(&rows);
        assert_eq!(summary.average_efficiency, 1.2);
        assert_eq!(summary.total_events, 3);
        assert_eq!(summary.total_water_volume, 120.0);
        assert_eq!(summary.total_duration, 60);
    }

    #[test]
    fn summarize_rounds_totals() {
        let rows = vec![
            bucket(1.111, 10, 1, 1.111, 1.111),
            bucket(2.222, 20, 1, 2.222, 2.222),
        ];
        let summary = summarize(&rows);
        assert_eq!(summary.total_water_volume, 3.33);
        assert_eq!(summary.total_real_amount, 3.33);
        assert_eq!(summary.total_nominal_amount, 3.33);
        assert_eq!(summary.average_efficiency, 1.0);
    }

    #[test]
    fn summarize_empty_rows_is_all_zeroes() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_water_volume, 0.0);
        assert_eq!(summary.total_duration, 0);
        assert_eq!(summary.average_efficiency, 0.0);
        assert_eq!(summary.total_events, 0);
    }

    #[test]
    fn empty_or_failed_historical_windows_are_omitted() {
        let period = PeriodInfo {
            start_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        };
        assert!(historical_window(Ok(Vec::new()), period.clone(), "one_year_ago").is_none());
        assert!(
            historical_window(Err(sqlx::Error::RowNotFound), period.clone(), "one_year_ago")
                .is_none()
        );
        assert!(historical_window(
            Ok(vec![bucket(10.0, 5, 1, 10.0, 10.0)]),
            period,
            "one_year_ago"
        )
        .is_some());
    }

    #[test]
    fn period_metrics_reports_reference_deltas() {
        let current = summary(4650.75, 1900, 1.2918, 31);
        let window = window(2024, summary(4200.0, 1800, 1.25, 28));

        let metrics = period_metrics(&current, &window);
        assert_eq!(metrics.volume_change_percent, 10.73);
        assert_eq!(metrics.events_change_percent, 10.71);
        assert_eq!(metrics.efficiency_change_percent, 3.34);
        assert_eq!(metrics.total_water_volume, 4200.0);
        assert_eq!(metrics.total_events, 28);
        assert_eq!(metrics.average_efficiency, 1.25);
    }

    #[test]
    fn year_comparison_tracks_volume_change() {
        let current = summary(4650.75, 1900, 1.2918, 31);
        let window = window(2024, summary(4200.0, 1800, 1.25, 28));

        let comparison = year_comparison(&current, &window);
        assert_eq!(comparison.change_percent, 10.73);
        assert_eq!(comparison.total_duration, 1800);
        assert_eq!(comparison.total_water_volume, 4200.0);
    }

    #[test]
    fn breakdown_sums_per_sector_and_sorts_by_id() {
        let mut high = bucket(30.0, 15, 1, 50.0, 60.0);
        high.sector_id = 2;
        let rows = vec![
            high,
            bucket(100.0, 60, 2, 100.0, 120.0),
            bucket(50.0, 30, 1, 50.0, 60.0),
        ];

        let breakdown = breakdown_by_sector(&rows);
        assert_eq!(breakdown.len(), 2);

        assert_eq!(breakdown[0].sector_id, 1);
        assert_eq!(breakdown[0].total_water_volume, 150.0);
        assert_eq!(breakdown[0].total_events, 3);
        assert_eq!(breakdown[0].total_real_amount, 180.0);
        assert_eq!(breakdown[0].total_nominal_amount, 150.0);
        assert_eq!(breakdown[0].average_efficiency, 1.2);

        assert_eq!(breakdown[1].sector_id, 2);
        assert_eq!(breakdown[1].total_events, 1);
        assert_eq!(breakdown[1].average_efficiency, 1.2);
    }

    #[test]
    fn breakdown_of_no_rows_is_empty() {
        assert!(breakdown_by_sector(&[]).is_empty());
    }

    #[test]
    fn data_points_carry_bucket_fields() {
        let rows = vec![bucket(120.0, 60, 2, 100.0, 90.0)];
        let points = build_data_points(&rows);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].water_volume, 120.0);
        assert_eq!(points[0].duration, 60);
        assert_eq!(points[0].event_count, 2);
        assert_eq!(points[0].efficiency, 0.9);
    }
}
