use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parses the timestamp shapes clients actually send: RFC 3339, a bare
/// `YYYY-MM-DD` date (midnight UTC), or a naive datetime assumed to be UTC.
pub fn parse_flexible(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    None
}

/// Shifts a timestamp back by whole calendar years. Feb 29 mapped into a
/// non-leap year normalizes forward to Mar 1.
pub fn years_back(ts: DateTime<Utc>, years: i32) -> DateTime<Utc> {
    let target = ts.year() - years;
    match ts.with_year(target) {
        Some(shifted) => shifted,
        None => (ts - Duration::days(1))
            .with_year(target)
            .map(|shifted| shifted + Duration::days(1))
            .unwrap_or(ts),
    }
}
