use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Row of `app_usage`. Unique per (date, app_name); duration only grows within a day.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct UsageRecord {
    pub date: NaiveDate,
    pub app_name: String,
    pub duration_seconds: u64,
    pub last_updated: DateTime<Utc>,
}

/// Row of `day_summary`. `total_seconds` is always the sum of the day's [UsageRecord] durations
/// and `app_count` the number of those records.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total_seconds: u64,
    pub app_count: u32,
    pub last_updated: DateTime<Utc>,
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct AppUsage {
    pub app_name: String,
    pub duration_seconds: u64,
}

impl AppUsage {
    pub fn new(app_name: impl Into<String>, duration_seconds: u64) -> Self {
        Self {
            app_name: app_name.into(),
            duration_seconds,
        }
    }
}

/// Usage attributed to a single day. Used both for day totals and for per app series.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy)]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub seconds: u64,
}

/// Everything known about a single day, top apps sorted by duration descending.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct DayUsage {
    pub date: NaiveDate,
    pub total_seconds: u64,
    pub app_count: u32,
    pub top_apps: Vec<AppUsage>,
}

impl DayUsage {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_seconds: 0,
            app_count: 0,
            top_apps: vec![],
        }
    }
}
