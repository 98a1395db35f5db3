//! Business-day calendar math
//!
//! A business day is a calendar day excluding Saturday and Sunday. No
//! holiday calendars at this layer.

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Whether the date falls on a weekend
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Advance `days` business days from `start`, skipping weekends.
///
/// Zero days returns `start` unchanged. For `days >= 1` the result always
/// lands on a business day. Returns `None` when the target falls outside
/// chrono's representable range, so callers can reject absurd effort inputs
/// instead of panicking.
pub fn add_business_days(start: NaiveDate, days: i64) -> Option<NaiveDate> {
    let days = days.max(0);
    if days == 0 {
        return Some(start);
    }

    // The first step lands on a business day even from a weekend start.
    // From a weekday, whole weeks are a constant-time 7-day jump that keeps
    // the weekday; only the sub-week remainder is stepped.
    let mut cursor = next_business_day(start)?;
    let remaining = days - 1;
    cursor = cursor.checked_add_days(Days::new(7 * (remaining / 5) as u64))?;
    for _ in 0..(remaining % 5) {
        cursor = next_business_day(cursor)?;
    }
    Some(cursor)
}

fn next_business_day(date: NaiveDate) -> Option<NaiveDate> {
    let mut cursor = date.checked_add_days(Days::new(1))?;
    while is_weekend(cursor) {
        cursor = cursor.checked_add_days(Days::new(1))?;
    }
    Some(cursor)
}
