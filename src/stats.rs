//! Read only views over the usage store, relative to the current day.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    daemon::storage::{
        entities::{AppUsage, DailyUsage, DayUsage},
        usage_storage::UsageStorage,
        StoreError,
    },
    utils::{
        clock::Clock,
        time::window_start,
    },
};

pub const DEFAULT_TOP_APPS: usize = 10;

pub const WEEK_DAYS: u32 = 7;

pub const DEFAULT_HISTORY_DAYS: u32 = 30;

/// Longest history window, roughly ten years. Larger requests are clamped.
pub const MAX_HISTORY_DAYS: u32 = 3660;

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct WeeklyUsage {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_seconds: u64,
    /// One entry per day of the window, oldest first.
    pub days: Vec<DailyUsage>,
    pub top_apps: Vec<AppUsage>,
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct AppHistory {
    pub app_name: String,
    pub total_seconds: u64,
    /// One entry per day of the window, oldest first.
    pub days: Vec<DailyUsage>,
}

pub struct UsageQueries<S> {
    storage: S,
    clock: Box<dyn Clock>,
    top_apps: usize,
}

impl<S: UsageStorage> UsageQueries<S> {
    pub fn new(storage: S, clock: Box<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            top_apps: DEFAULT_TOP_APPS,
        }
    }

    pub fn with_top_apps(self, top_apps: usize) -> Self {
        Self { top_apps, ..self }
    }

    pub fn today(&self) -> Result<DayUsage, StoreError> {
        self.date(self.clock.today())
    }

    pub fn yesterday(&self) -> Result<DayUsage, StoreError> {
        let today = self.clock.today();
        match today.checked_sub_days(Days::new(1)) {
            Some(yesterday) => self.date(yesterday),
            None => Ok(DayUsage::empty(today)),
        }
    }

    pub fn date(&self, date: NaiveDate) -> Result<DayUsage, StoreError> {
        self.storage.date_stats(date, self.top_apps)
    }

    /// The last 7 days including today.
    pub fn weekly(&self) -> Result<WeeklyUsage, StoreError> {
        let to = self.clock.today();
        let from = window_start(to, WEEK_DAYS);
        let days = self.storage.daily_totals(from, to)?;
        let top_apps = self.storage.top_apps_between(from, to, self.top_apps)?;
        Ok(WeeklyUsage {
            from,
            to,
            total_seconds: days.iter().map(|v| v.seconds).sum(),
            days,
            top_apps,
        })
    }

    /// Usage of `app_name` (a canonical name) over the last `days` days including today, at most
    /// [MAX_HISTORY_DAYS].
    pub fn app_history(&self, app_name: &str, days: u32) -> Result<AppHistory, StoreError> {
        let to = self.clock.today();
        let from = window_start(to, days.min(MAX_HISTORY_DAYS));
        let series = self.storage.app_history(app_name, from, to)?;
        Ok(AppHistory {
            app_name: app_name.to_string(),
            total_seconds: series.iter().map(|v| v.seconds).sum(),
            days: series,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use chrono::{Days, TimeZone, Utc};

    use super::{UsageQueries, MAX_HISTORY_DAYS};
    use crate::{
        daemon::storage::{
            entities::AppUsage,
            usage_storage::{SqliteUsageStorage, UsageStorage},
        },
        utils::clock::FixedClock,
    };

    fn queries() -> Result<(UsageQueries<Arc<SqliteUsageStorage>>, Arc<SqliteUsageStorage>)> {
        let storage = Arc::new(SqliteUsageStorage::open_in_memory()?);
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap());
        Ok((UsageQueries::new(storage.clone(), Box::new(clock)), storage))
    }

    #[test]
    fn today_and_yesterday() -> Result<()> {
        let (queries, storage) = queries()?;
        let today = Utc.with_ymd_and_hms(2018, 7, 4, 0, 0, 0).unwrap().date_naive();
        let yesterday = today.pred_opt().unwrap();
        storage.increment(today, "Google Chrome", 4)?;
        storage.increment(today, "Visual Studio Code", 2)?;
        storage.increment(yesterday, "Steam", 100)?;

        let stats = queries.today()?;
        assert_eq!(stats.date, today);
        assert_eq!(stats.total_seconds, 6);
        assert_eq!(stats.app_count, 2);
        assert_eq!(stats.top_apps[0], AppUsage::new("Google Chrome", 4));

        let stats = queries.yesterday()?;
        assert_eq!(stats.top_apps, vec![AppUsage::new("Steam", 100)]);

        assert_eq!(queries.today()?, queries.today()?);
        Ok(())
    }

    #[test]
    fn top_apps_are_limited() -> Result<()> {
        let (queries, storage) = queries()?;
        let queries = queries.with_top_apps(1);
        let today = Utc.with_ymd_and_hms(2018, 7, 4, 0, 0, 0).unwrap().date_naive();
        storage.increment(today, "Google Chrome", 4)?;
        storage.increment(today, "Discord", 8)?;

        let stats = queries.today()?;
        assert_eq!(stats.top_apps, vec![AppUsage::new("Discord", 8)]);
        assert_eq!(stats.total_seconds, 12);
        Ok(())
    }

    #[test]
    fn weekly_covers_seven_days() -> Result<()> {
        let (queries, storage) = queries()?;
        let today = Utc.with_ymd_and_hms(2018, 7, 4, 0, 0, 0).unwrap().date_naive();
        let first = today.checked_sub_days(Days::new(6)).unwrap();
        storage.increment(today, "Discord", 10)?;
        storage.increment(first, "Discord", 5)?;
        storage.increment(first, "Spotify", 20)?;
        // One day too old for the window.
        storage.increment(first.pred_opt().unwrap(), "Steam", 500)?;

        let weekly = queries.weekly()?;
        assert_eq!(weekly.from, first);
        assert_eq!(weekly.to, today);
        assert_eq!(weekly.days.len(), 7);
        assert_eq!(weekly.days[0].seconds, 25);
        assert!(weekly.days[1..6].iter().all(|v| v.seconds == 0));
        assert_eq!(weekly.days[6].seconds, 10);
        assert_eq!(weekly.total_seconds, 35);
        assert_eq!(
            weekly.top_apps,
            vec![AppUsage::new("Spotify", 20), AppUsage::new("Discord", 15)]
        );
        Ok(())
    }

    #[test]
    fn app_history_is_a_daily_series() -> Result<()> {
        let (queries, storage) = queries()?;
        let today = Utc.with_ymd_and_hms(2018, 7, 4, 0, 0, 0).unwrap().date_naive();
        storage.increment(today, "Discord", 10)?;
        storage.increment(today.pred_opt().unwrap(), "Discord", 7)?;
        storage.increment(today, "Steam", 1)?;

        let history = queries.app_history("Discord", 3)?;
        assert_eq!(
            history.days.iter().map(|v| v.seconds).collect::<Vec<_>>(),
            vec![0, 7, 10]
        );
        assert_eq!(history.total_seconds, 17);
        Ok(())
    }

    #[test]
    fn app_history_window_is_bounded() -> Result<()> {
        let (queries, storage) = queries()?;
        let today = Utc.with_ymd_and_hms(2018, 7, 4, 0, 0, 0).unwrap().date_naive();
        storage.increment(today, "Steam", 10)?;

        let history = queries.app_history("Steam", u32::MAX)?;
        assert_eq!(history.days.len(), MAX_HISTORY_DAYS as usize);
        assert_eq!(history.days.last().map(|v| v.date), Some(today));
        assert_eq!(history.total_seconds, 10);
        Ok(())
    }
}
