//! Trading-day resolution and date-suffixed artifact naming.
//!
//! "Last trading day" only rolls weekends back to Friday. Public holidays are
//! not handled; the KRX download simply returns the prior session's data on a
//! holiday, which is accepted as-is.

use chrono::{Datelike, Local, NaiveDate, Weekday};

pub const DATE_FMT: &str = "%Y%m%d";

/// Today's local date as YYYYMMDD.
pub fn today_str() -> String {
    Local::now().date_naive().format(DATE_FMT).to_string()
}

/// The most recent weekday at or before `date`.
pub fn last_trading_day(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - chrono::Duration::days(1),
        Weekday::Sun => date - chrono::Duration::days(2),
        _ => date,
    }
}

/// `last_trading_day` of today, as YYYYMMDD.
pub fn last_trading_day_str() -> String {
    last_trading_day(Local::now().date_naive())
        .format(DATE_FMT)
        .to_string()
}

/// Parse a YYYYMMDD string back into a date. Used to validate `--date`
/// overrides from the CLI.
pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_weekday_is_its_own_trading_day() {
        // 2025-06-04 is a Wednesday
        assert_eq!(last_trading_day(d(2025, 6, 4)), d(2025, 6, 4));
        // Friday stays Friday
        assert_eq!(last_trading_day(d(2025, 6, 6)), d(2025, 6, 6));
    }

    #[test]
    fn test_weekend_rolls_back_to_friday() {
        // 2025-06-07 Sat, 2025-06-08 Sun → 2025-06-06 Fri
        assert_eq!(last_trading_day(d(2025, 6, 7)), d(2025, 6, 6));
        assert_eq!(last_trading_day(d(2025, 6, 8)), d(2025, 6, 6));
    }

    #[test]
    fn test_monday_holiday_not_rolled_back() {
        // No holiday calendar: a Monday is always a trading day here.
        assert_eq!(last_trading_day(d(2025, 1, 1)), d(2025, 1, 1));
    }

    #[test]
    fn test_parse_date_str() {
        assert_eq!(parse_date_str("20250606"), Some(d(2025, 6, 6)));
        assert_eq!(parse_date_str("2025-06-06"), None);
        assert_eq!(parse_date_str("junk"), None);
    }
}
