use chrono::{Days, NaiveDate};

/// This is the standard way of converting a date to a string in apptime. Also the key format of
/// the `date` columns.
pub fn date_to_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn date_from_key(key: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d")
}

/// First day of a window of `days` days ending at `end` (inclusive). A window of 0 days is treated
/// as a window of 1 day.
pub fn window_start(end: NaiveDate, days: u32) -> NaiveDate {
    end.checked_sub_days(Days::new(u64::from(days.max(1) - 1)))
        .unwrap_or(NaiveDate::MIN)
}

/// Returns dates between start (inclusive) and end (inclusive).
pub fn date_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}
