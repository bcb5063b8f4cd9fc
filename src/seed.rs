use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc};
use rand::Rng;
use sqlx::{PgPool, QueryBuilder};

const FARM_SEEDS: &[(&str, &str, f64)] = &[
    ("North Valley Farm", "North Valley", 120.0),
    ("Riverside Orchards", "East Riverside", 85.5),
];

const SECTOR_NAMES: &[&str] = &["Sector A", "Sector B", "Sector C"];

const EVENT_BATCH_SIZE: usize = 500;

struct EventSeed {
    farm_id: i64,
    sector_id: i64,
    start_time: chrono::DateTime<Utc>,
    end_time: chrono::DateTime<Utc>,
    water_volume: f64,
    duration_minutes: i64,
    nominal_amount: f64,
    real_amount: f64,
}

/// Rebuilds the demo dataset: two farms with three sectors each and one to
/// three irrigation events per farm per day over the last three calendar
/// years. Existing rows are dropped first.
pub async fn seed_database(pool: &PgPool) -> Result<()> {
    ensure_schema(pool).await.context("failed to create schema")?;
    clear_existing_data(pool)
        .await
        .context("failed to clear existing data")?;

    let farm_ids = create_farms(pool).await.context("failed to create farms")?;
    let sectors = create_sectors(pool, &farm_ids)
        .await
        .context("failed to create sectors")?;
    let events = create_irrigation_events(pool, &sectors)
        .await
        .context("failed to create irrigation events")?;

    tracing::info!(
        farms = farm_ids.len(),
        sectors = sectors.iter().map(|(_, s)| s.len()).sum::<usize>(),
        events,
        "database seeded"
    );
    Ok(())
}

async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS farms (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            location TEXT NOT NULL DEFAULT '',
            total_area DOUBLE PRECISION NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS irrigation_sectors (
            id BIGSERIAL PRIMARY KEY,
            farm_id BIGINT NOT NULL REFERENCES farms(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            area DOUBLE PRECISION NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS irrigation_events (
            id BIGSERIAL PRIMARY KEY,
            farm_id BIGINT NOT NULL REFERENCES farms(id) ON DELETE CASCADE,
            sector_id BIGINT REFERENCES irrigation_sectors(id) ON DELETE CASCADE,
            start_time TIMESTAMPTZ NOT NULL,
            end_time TIMESTAMPTZ NOT NULL,
            water_volume DOUBLE PRECISION NOT NULL,
            duration_minutes BIGINT NOT NULL,
            nominal_amount DOUBLE PRECISION NOT NULL DEFAULT 0,
            real_amount DOUBLE PRECISION NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_irrigation_events_farm_time \
         ON irrigation_events (farm_id, start_time)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_irrigation_events_farm_sector_time \
         ON irrigation_events (farm_id, sector_id, start_time)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn clear_existing_data(pool: &PgPool) -> Result<()> {
    sqlx::query("TRUNCATE irrigation_events, irrigation_sectors, farms RESTART IDENTITY CASCADE")
        .execute(pool)
        .await?;
    Ok(())
}

async fn create_farms(pool: &PgPool) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(FARM_SEEDS.len());
    for (name, location, total_area) in FARM_SEEDS {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO farms (name, location, total_area) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(name)
        .bind(location)
        .bind(total_area)
        .fetch_one(pool)
        .await?;
        ids.push(id);
    }
    Ok(ids)
}

async fn create_sectors(pool: &PgPool, farm_ids: &[i64]) -> Result<Vec<(i64, Vec<i64>)>> {
    let mut sectors = Vec::with_capacity(farm_ids.len());
    for &farm_id in farm_ids {
        let mut sector_ids = Vec::with_capacity(SECTOR_NAMES.len());
        for (index, name) in SECTOR_NAMES.iter().enumerate() {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO irrigation_sectors (farm_id, name, area) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(farm_id)
            .bind(name)
            .bind(10.0 + 5.0 * index as f64)
            .fetch_one(pool)
            .await?;
            sector_ids.push(id);
        }
        sectors.push((farm_id, sector_ids));
    }
    Ok(sectors)
}

async fn create_irrigation_events(pool: &PgPool, sectors: &[(i64, Vec<i64>)]) -> Result<u64> {
    let today = Utc::now().date_naive();
    let first_day = NaiveDate::from_ymd_opt(today.year() - 2, 1, 1)
        .context("invalid seed start date")?;

    let mut rng = rand::thread_rng();
    let mut batch: Vec<EventSeed> = Vec::with_capacity(EVENT_BATCH_SIZE);
    let mut inserted = 0u64;

    let mut day = first_day;
    while day <= today {
        for (farm_id, sector_ids) in sectors {
            let events_today = rng.gen_range(1..=3);
            for _ in 0..events_today {
                let sector_id = sector_ids[rng.gen_range(0..sector_ids.len())];
                let start = Utc
                    .from_utc_datetime(
                        &day.and_hms_opt(rng.gen_range(6..20), rng.gen_range(0..60), 0)
                            .context("invalid event time")?,
                    );
                let duration_minutes: i64 = rng.gen_range(30..=240);

                // One nominal liter per minute of scheduled runtime; delivery
                // varies 70-130% around it, 20% higher through the summer.
                let nominal_amount = duration_minutes as f64;
                let mut real_amount = nominal_amount * (0.7 + rng.gen::<f64>() * 0.6);
                if (6..=8).contains(&day.month()) {
                    real_amount *= 1.2;
                }

                batch.push(EventSeed {
                    farm_id: *farm_id,
                    sector_id,
                    start_time: start,
                    end_time: start + Duration::minutes(duration_minutes),
                    water_volume: real_amount,
                    duration_minutes,
                    nominal_amount,
                    real_amount,
                });

                if batch.len() >= EVENT_BATCH_SIZE {
                    inserted += insert_event_batch(pool, &batch).await?;
                    batch.clear();
                }
            }
        }
        day = day.succ_opt().context("date overflow while seeding")?;
    }

    if !batch.is_empty() {
        inserted += insert_event_batch(pool, &batch).await?;
    }
    Ok(inserted)
}

async fn insert_event_batch(pool: &PgPool, batch: &[EventSeed]) -> Result<u64> {
    let mut builder = QueryBuilder::new(
        "INSERT INTO irrigation_events \
         (farm_id, sector_id, start_time, end_time, water_volume, duration_minutes, nominal_amount, real_amount) ",
    );
    builder.push_values(batch, |mut row, event| {
        row.push_bind(event.farm_id)
            .push_bind(event.sector_id)
            .push_bind(event.start_time)
            .push_bind(event.end_time)
            .push_bind(event.water_volume)
            .push_bind(event.duration_minutes)
            .push_bind(event.nominal_amount)
            .push_bind(event.real_amount);
    });
    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}
