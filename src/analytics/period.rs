use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::models::AnalyticsPeriod;

/// Midnight UTC on the first day of `month` (1-based, may overflow into later years)
fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    let year = year + ((month - 1) / 12) as i32;
    let month = (month - 1) % 12 + 1;
    let date = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN);
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// `[start, next_start)` expressed as an inclusive window
fn closed(start: DateTime<Utc>, next_start: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (start, next_start - Duration::microseconds(1))
}

impl AnalyticsPeriod {
    /// Window containing `now`.
    ///
    /// A week is the trailing seven days; the other periods are the calendar
    /// month, quarter or year, ending one microsecond before the next begins.
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let year = now.year();
        match self {
            AnalyticsPeriod::Week => (now - Duration::days(7), now),
            AnalyticsPeriod::Month => {
                closed(month_start(year, now.month()), month_start(year, now.month() + 1))
            }
            AnalyticsPeriod::Quarter => {
                let first = (now.month() - 1) / 3 * 3 + 1;
                closed(month_start(year, first), month_start(year, first + 3))
            }
            AnalyticsPeriod::Year => closed(month_start(year, 1), month_start(year, 13)),
        }
    }
}
