//! Calendar arithmetic for relative-time ranges
//!
//! Month and year steps are calendar-aware (variable month lengths), never
//! fixed 30-day blocks. Time-of-day arithmetic clamps at the day boundaries
//! instead of wrapping: stepping past midnight lands on `23:59:59.999999`,
//! stepping below it on `00:00:00`. Millisecond steps are performed as
//! microsecond steps of `n * 1000`.

use chrono::{Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};

use super::operator::{DateGranularity, DateTimeGranularity, TimeGranularity};

/// Largest representable time of day, used as the forward clamp bound.
fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or(NaiveTime::MIN)
}

fn add_months(d: NaiveDate, n: i64) -> NaiveDate {
    let months = Months::new(u32::try_from(n.unsigned_abs()).unwrap_or(u32::MAX));
    if n >= 0 {
        d.checked_add_months(months).unwrap_or(NaiveDate::MAX)
    } else {
        d.checked_sub_months(months).unwrap_or(NaiveDate::MIN)
    }
}

fn add_datetime_months(dt: NaiveDateTime, n: i64) -> NaiveDateTime {
    let months = Months::new(u32::try_from(n.unsigned_abs()).unwrap_or(u32::MAX));
    if n >= 0 {
        dt.checked_add_months(months).unwrap_or(NaiveDateTime::MAX)
    } else {
        dt.checked_sub_months(months).unwrap_or(NaiveDateTime::MIN)
    }
}

/// Add `n` units to a date. Negative `n` steps into the past.
pub fn add_date_duration(d: NaiveDate, n: i64, granularity: DateGranularity) -> NaiveDate {
    match granularity {
        DateGranularity::Years => add_months(d, n.saturating_mul(12)),
        DateGranularity::Months => add_months(d, n),
        DateGranularity::Weeks => d
            .checked_add_signed(Duration::days(7 * n))
            .unwrap_or(if n >= 0 { NaiveDate::MAX } else { NaiveDate::MIN }),
        DateGranularity::Days => d
            .checked_add_signed(Duration::days(n))
            .unwrap_or(if n >= 0 { NaiveDate::MAX } else { NaiveDate::MIN }),
    }
}

/// Add `n` units to a time of day, clamping at the day boundaries.
///
/// Crossing midnight forward clamps to `23:59:59.999999`; crossing it
/// backward clamps to `00:00:00`.
pub fn add_time_duration(t: NaiveTime, n: i64, granularity: TimeGranularity) -> NaiveTime {
    let delta = match granularity {
        TimeGranularity::Hours => Duration::hours(n),
        TimeGranularity::Minutes => Duration::minutes(n),
        TimeGranularity::Seconds => Duration::seconds(n),
        // No native millisecond unit is assumed; step in microseconds.
        TimeGranularity::Milliseconds => Duration::microseconds(n.saturating_mul(1000)),
    };

    let (result, wrap) = t.overflowing_add_signed(delta);
    if wrap > 0 {
        end_of_day()
    } else if wrap < 0 {
        NaiveTime::MIN
    } else {
        result
    }
}

/// Add `n` units to a datetime. Negative `n` steps into the past.
pub fn add_datetime_duration(
    dt: NaiveDateTime,
    n: i64,
    granularity: DateTimeGranularity,
) -> NaiveDateTime {
    let delta = match granularity {
        DateTimeGranularity::Years => return add_datetime_months(dt, n.saturating_mul(12)),
        DateTimeGranularity::Months => return add_datetime_months(dt, n),
        DateTimeGranularity::Weeks => Duration::days(7 * n),
        DateTimeGranularity::Days => Duration::days(n),
        DateTimeGranularity::Hours => Duration::hours(n),
        DateTimeGranularity::Minutes => Duration::minutes(n),
        DateTimeGranularity::Seconds => Duration::seconds(n),
        DateTimeGranularity::Milliseconds => Duration::microseconds(n.saturating_mul(1000)),
    };
    dt.checked_add_signed(delta)
        .unwrap_or(if n >= 0 { NaiveDateTime::MAX } else { NaiveDateTime::MIN })
}

/// Format a date as `YYYY-MM-DD` (RFC 3339 date).
pub fn to_iso_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Format a time of day as `HH:MM:SS.ffffff`.
pub fn to_iso_time(t: NaiveTime) -> String {
    t.format("%H:%M:%S%.6f").to_string()
}

/// Format a datetime as ISO 8601 in UTC without an offset suffix.
pub fn to_iso_datetime(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_add_days_across_month_boundary() {
        assert_eq!(
            add_date_duration(date(2023, 2, 15), 13, DateGranularity::Days),
            date(2023, 2, 28)
        );
    }

    #[test]
    fn test_subtract_year() {
        assert_eq!(
            add_date_duration(date(2023, 2, 15), -1, DateGranularity::Years),
            date(2022, 2, 15)
        );
    }

    #[test]
    fn test_month_end_clamps() {
        // Adding one month to Jan 31 must respect February's length.
        assert_eq!(
            add_date_duration(date(2023, 1, 31), 1, DateGranularity::Months),
            date(2023, 2, 28)
        );
        assert_eq!(
            add_date_duration(date(2024, 1, 31), 1, DateGranularity::Months),
            date(2024, 2, 29)
        );
    }

    #[test]
    fn test_weeks() {
        assert_eq!(
            add_date_duration(date(2023, 2, 15), -2, DateGranularity::Weeks),
            date(2023, 2, 1)
        );
    }

    #[test]
    fn test_time_clamps_below_midnight() {
        assert_eq!(
            add_time_duration(time(15, 2, 45), -16, TimeGranularity::Hours),
            NaiveTime::MIN
        );
    }

    #[test]
    fn test_time_clamps_past_midnight() {
        assert_eq!(
            add_time_duration(time(15, 2, 45), 9, TimeGranularity::Hours),
            NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap()
        );
    }

    #[test]
    fn test_time_without_wrap() {
        assert_eq!(
            add_time_duration(time(15, 2, 45), -30, TimeGranularity::Minutes),
            time(14, 32, 45)
        );
    }

    #[test]
    fn test_time_milliseconds_are_microsecond_steps() {
        let t = add_time_duration(time(12, 0, 0), 1500, TimeGranularity::Milliseconds);
        assert_eq!(t, NaiveTime::from_hms_micro_opt(12, 0, 1, 500_000).unwrap());
    }

    #[test]
    fn test_datetime_month_arithmetic() {
        let dt = date(2023, 3, 31).and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(
            add_datetime_duration(dt, -1, DateTimeGranularity::Months),
            date(2023, 2, 28).and_hms_opt(10, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_datetime_crosses_midnight_without_clamp() {
        // Datetimes carry the date, so no clamping applies.
        let dt = date(2023, 2, 15).and_hms_opt(1, 0, 0).unwrap();
        assert_eq!(
            add_datetime_duration(dt, -2, DateTimeGranularity::Hours),
            date(2023, 2, 14).and_hms_opt(23, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_iso_formats() {
        assert_eq!(to_iso_date(date(2017, 1, 1)), "2017-01-01");
        assert_eq!(to_iso_time(time(23, 59, 59)), "23:59:59.000000");
        assert_eq!(
            to_iso_datetime(date(2023, 2, 15).and_hms_opt(1, 2, 3).unwrap()),
            "2023-02-15T01:02:03.000Z"
        );
    }
}
