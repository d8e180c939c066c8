use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

/// Inclusive UTC window covering the whole calendar day, from midnight
/// through 23:59:59.999. Used with SQL BETWEEN, which is inclusive on both
/// ends, so an instant at the next midnight falls outside the window.
pub fn departure_day_window(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end = start + Duration::days(1) - Duration::milliseconds(1);
    (start, end)
}
