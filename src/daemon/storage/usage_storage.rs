use std::{
    collections::HashMap,
    ops::Deref,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, instrument, warn};

use crate::utils::time::{date_from_key, date_range, date_to_key};

use super::{
    entities::{AppUsage, DailyUsage, DaySummary, DayUsage, UsageRecord},
    schema::run_migrations,
    StoreError,
};

/// Interface for abstracting storage of usage counters.
pub trait UsageStorage: Send + Sync {
    /// Adds `seconds` to the (date, app) counter and to the date's total as one atomic step.
    /// Creates both rows on first use. Zero seconds is a no-op.
    fn increment(&self, date: NaiveDate, app_name: &str, seconds: u64) -> Result<(), StoreError>;

    /// Day total, distinct app count and the `limit` longest used apps of the day.
    fn date_stats(&self, date: NaiveDate, limit: usize) -> Result<DayUsage, StoreError>;

    /// Totals for every day in `[from, to]`. Days without usage are reported as 0.
    fn daily_totals(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyUsage>, StoreError>;

    /// Apps aggregated over `[from, to]`, longest first.
    fn top_apps_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        limit: usize,
    ) -> Result<Vec<AppUsage>, StoreError>;

    /// Usage of one app for every day in `[from, to]`. Days without usage are reported as 0.
    fn app_history(
        &self,
        app_name: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyUsage>, StoreError>;

    fn day_summary(&self, date: NaiveDate) -> Result<Option<DaySummary>, StoreError>;

    /// All counters of a day ordered by app name.
    fn records_for(&self, date: NaiveDate) -> Result<Vec<UsageRecord>, StoreError>;
}

impl<T: Deref + Send + Sync> UsageStorage for T
where
    T::Target: UsageStorage,
{
    fn increment(&self, date: NaiveDate, app_name: &str, seconds: u64) -> Result<(), StoreError> {
        self.deref().increment(date, app_name, seconds)
    }

    fn date_stats(&self, date: NaiveDate, limit: usize) -> Result<DayUsage, StoreError> {
        self.deref().date_stats(date, limit)
    }

    fn daily_totals(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyUsage>, StoreError> {
        self.deref().daily_totals(from, to)
    }

    fn top_apps_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        limit: usize,
    ) -> Result<Vec<AppUsage>, StoreError> {
        self.deref().top_apps_between(from, to, limit)
    }

    fn app_history(
        &self,
        app_name: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyUsage>, StoreError> {
        self.deref().app_history(app_name, from, to)
    }

    fn day_summary(&self, date: NaiveDate) -> Result<Option<DaySummary>, StoreError> {
        self.deref().day_summary(date)
    }

    fn records_for(&self, date: NaiveDate) -> Result<Vec<UsageRecord>, StoreError> {
        self.deref().records_for(date)
    }
}

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// The main realization of [UsageStorage], backed by SQLite.
///
/// The connection is kept behind a mutex so the storage can be shared between the tracking loop
/// and readers in the same process. Other processes (the cli) open their own connection, WAL
/// keeps them from blocking the writer.
pub struct SqliteUsageStorage {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteUsageStorage {
    /// Opens a database at the given path, creating it and its directory if necessary.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("Opened {path:?} with journal mode {mode}");
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Opens an in-memory database. The data is gone once the storage is dropped.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(mut conn: Connection, path: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        run_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock can't leave a transaction half applied, sqlite rolls it
        // back when the Transaction is dropped.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn to_sql_int(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Overflow(value))
}

fn to_seconds(column: &'static str, value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Negative { column, value })
}

fn parse_date(column: &'static str, value: String) -> Result<NaiveDate, StoreError> {
    date_from_key(&value).map_err(|source| StoreError::InvalidDate {
        column,
        value,
        source,
    })
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(v) => v.with_timezone(&Utc),
        Err(e) => {
            // Only informative, a broken value must not make the whole day unreadable.
            warn!("Invalid last_updated value {value}: {e}");
            DateTime::<Utc>::UNIX_EPOCH
        }
    }
}

fn zero_filled(
    from: NaiveDate,
    to: NaiveDate,
    mut by_day: HashMap<NaiveDate, u64>,
) -> Vec<DailyUsage> {
    date_range(from, to)
        .map(|date| DailyUsage {
            date,
            seconds: by_day.remove(&date).unwrap_or(0),
        })
        .collect()
}

impl UsageStorage for SqliteUsageStorage {
    #[instrument(skip(self))]
    fn increment(&self, date: NaiveDate, app_name: &str, seconds: u64) -> Result<(), StoreError> {
        if app_name.is_empty() {
            return Err(StoreError::EmptyAppName);
        }
        if seconds == 0 {
            return Ok(());
        }
        let seconds = to_sql_int(seconds)?;
        let date = date_to_key(date);
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut conn = self.connection();
        // Takes the write lock up front so another process writing the same file makes this wait
        // in busy_timeout instead of failing the read to write upgrade.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let is_new_app = tx
            .query_row(
                "SELECT 1 FROM app_usage WHERE date = ?1 AND app_name = ?2",
                params![date, app_name],
                |_| Ok(()),
            )
            .optional()?
            .is_none();

        tx.execute(
            "INSERT INTO app_usage (date, app_name, duration_seconds, last_updated)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(date, app_name) DO UPDATE SET
                 duration_seconds = duration_seconds + excluded.duration_seconds,
                 last_updated = excluded.last_updated",
            params![date, app_name, seconds, now],
        )?;

        tx.execute(
            "INSERT INTO day_summary (date, total_seconds, app_count, last_updated)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(date) DO UPDATE SET
                 total_seconds = total_seconds + excluded.total_seconds,
                 app_count = app_count + excluded.app_count,
                 last_updated = excluded.last_updated",
            params![date, seconds, i64::from(is_new_app), now],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn date_stats(&self, date: NaiveDate, limit: usize) -> Result<DayUsage, StoreError> {
        let key = date_to_key(date);
        let mut conn = self.connection();
        // Both reads come from one snapshot.
        let tx = conn.transaction()?;

        let summary = tx
            .query_row(
                "SELECT total_seconds, app_count FROM day_summary WHERE date = ?1",
                params![key],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        let rows = {
            let mut stmt = tx.prepare(
                "SELECT app_name, duration_seconds FROM app_usage
                 WHERE date = ?1
                 ORDER BY duration_seconds DESC, app_name ASC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![key, to_sql_int(limit as u64)?], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        tx.commit()?;

        let Some((total_seconds, app_count)) = summary else {
            return Ok(DayUsage::empty(date));
        };

        let top_apps = rows
            .into_iter()
            .map(|(app_name, duration)| {
                Ok(AppUsage::new(
                    app_name,
                    to_seconds("app_usage.duration_seconds", duration)?,
                ))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(DayUsage {
            date,
            total_seconds: to_seconds("day_summary.total_seconds", total_seconds)?,
            app_count: u32::try_from(app_count).map_err(|_| StoreError::Negative {
                column: "day_summary.app_count",
                value: app_count,
            })?,
            top_apps,
        })
    }

    fn daily_totals(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyUsage>, StoreError> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT date, total_seconds FROM day_summary
             WHERE date BETWEEN ?1 AND ?2",
        )?;
        let rows = stmt
            .query_map(params![date_to_key(from), date_to_key(to)], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let by_day = rows
            .into_iter()
            .map(|(date, total)| {
                Ok((
                    parse_date("day_summary.date", date)?,
                    to_seconds("day_summary.total_seconds", total)?,
                ))
            })
            .collect::<Result<HashMap<_, _>, StoreError>>()?;

        Ok(zero_filled(from, to, by_day))
    }

    fn top_apps_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        limit: usize,
    ) -> Result<Vec<AppUsage>, StoreError> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT app_name, SUM(duration_seconds) AS total_duration
             FROM app_usage
             WHERE date BETWEEN ?1 AND ?2
             GROUP BY app_name
             ORDER BY total_duration DESC, app_name ASC
             LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(
                params![date_to_key(from), date_to_key(to), to_sql_int(limit as u64)?],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(app_name, total)| {
                Ok(AppUsage::new(
                    app_name,
                    to_seconds("app_usage.duration_seconds", total)?,
                ))
            })
            .collect()
    }

    fn app_history(
        &self,
        app_name: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyUsage>, StoreError> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT date, duration_seconds FROM app_usage
             WHERE app_name = ?1 AND date BETWEEN ?2 AND ?3",
        )?;
        let rows = stmt
            .query_map(
                params![app_name, date_to_key(from), date_to_key(to)],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let by_day = rows
            .into_iter()
            .map(|(date, duration)| {
                Ok((
                    parse_date("app_usage.date", date)?,
                    to_seconds("app_usage.duration_seconds", duration)?,
                ))
            })
            .collect::<Result<HashMap<_, _>, StoreError>>()?;

        Ok(zero_filled(from, to, by_day))
    }

    fn day_summary(&self, date: NaiveDate) -> Result<Option<DaySummary>, StoreError> {
        let conn = self.connection();
        let row = conn
            .query_row(
                "SELECT total_seconds, app_count, last_updated FROM day_summary WHERE date = ?1",
                params![date_to_key(date)],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(total, app_count, last_updated)| {
            Ok(DaySummary {
                date,
                total_seconds: to_seconds("day_summary.total_seconds", total)?,
                app_count: u32::try_from(app_count).map_err(|_| StoreError::Negative {
                    column: "day_summary.app_count",
                    value: app_count,
                })?,
                last_updated: parse_timestamp(&last_updated),
            })
        })
        .transpose()
    }

    fn records_for(&self, date: NaiveDate) -> Result<Vec<UsageRecord>, StoreError> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT app_name, duration_seconds, last_updated FROM app_usage
             WHERE date = ?1
             ORDER BY app_name ASC",
        )?;
        let rows = stmt
            .query_map(params![date_to_key(date)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(app_name, duration, last_updated)| {
                Ok(UsageRecord {
                    date,
                    app_name,
                    duration_seconds: to_seconds("app_usage.duration_seconds", duration)?,
                    last_updated: parse_timestamp(&last_updated),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use anyhow::Result;
    use chrono::{Days, NaiveDate};
    use tempfile::tempdir;

    use super::{SqliteUsageStorage, UsageStorage};
    use crate::daemon::storage::{
        entities::{AppUsage, DailyUsage},
        StoreError,
    };

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();

    fn assert_day_total_invariant(storage: &impl UsageStorage, date: NaiveDate) {
        let records = storage.records_for(date).unwrap();
        let summary = storage.day_summary(date).unwrap();
        let sum: u64 = records.iter().map(|v| v.duration_seconds).sum();
        match summary {
            Some(summary) => {
                assert_eq!(summary.total_seconds, sum);
                assert_eq!(summary.app_count as usize, records.len());
            }
            None => assert!(records.is_empty()),
        }
    }

    #[test]
    fn increment_creates_then_adds() -> Result<()> {
        let storage = SqliteUsageStorage::open_in_memory()?;
        storage.increment(TEST_DATE, "Google Chrome", 4)?;
        storage.increment(TEST_DATE, "Google Chrome", 6)?;
        storage.increment(TEST_DATE, "Visual Studio Code", 2)?;

        let records = storage.records_for(TEST_DATE)?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].app_name, "Google Chrome");
        assert_eq!(records[0].duration_seconds, 10);
        assert_eq!(records[1].duration_seconds, 2);

        let summary = storage.day_summary(TEST_DATE)?.unwrap();
        assert_eq!(summary.total_seconds, 12);
        assert_eq!(summary.app_count, 2);
        assert_day_total_invariant(&storage, TEST_DATE);
        Ok(())
    }

    #[test]
    fn zero_seconds_creates_nothing() -> Result<()> {
        let storage = SqliteUsageStorage::open_in_memory()?;
        storage.increment(TEST_DATE, "Steam", 0)?;
        assert!(storage.day_summary(TEST_DATE)?.is_none());
        assert!(storage.records_for(TEST_DATE)?.is_empty());
        Ok(())
    }

    #[test]
    fn empty_app_is_rejected() -> Result<()> {
        let storage = SqliteUsageStorage::open_in_memory()?;
        assert!(matches!(
            storage.increment(TEST_DATE, "", 3),
            Err(StoreError::EmptyAppName)
        ));
        Ok(())
    }

    #[test]
    fn days_are_kept_apart() -> Result<()> {
        let storage = SqliteUsageStorage::open_in_memory()?;
        let next = TEST_DATE.succ_opt().unwrap();
        storage.increment(TEST_DATE, "Discord", 30)?;
        storage.increment(next, "Discord", 5)?;

        assert_eq!(storage.date_stats(TEST_DATE, 10)?.total_seconds, 30);
        assert_eq!(storage.date_stats(next, 10)?.total_seconds, 5);
        assert_day_total_invariant(&storage, TEST_DATE);
        assert_day_total_invariant(&storage, next);
        Ok(())
    }

    #[test]
    fn date_stats_sorts_and_limits() -> Result<()> {
        let storage = SqliteUsageStorage::open_in_memory()?;
        storage.increment(TEST_DATE, "Spotify", 10)?;
        storage.increment(TEST_DATE, "Discord", 30)?;
        storage.increment(TEST_DATE, "Steam", 20)?;
        storage.increment(TEST_DATE, "Alacritty", 20)?;

        let stats = storage.date_stats(TEST_DATE, 3)?;
        assert_eq!(stats.total_seconds, 80);
        assert_eq!(stats.app_count, 4);
        assert_eq!(
            stats.top_apps,
            vec![
                AppUsage::new("Discord", 30),
                AppUsage::new("Alacritty", 20),
                AppUsage::new("Steam", 20),
            ]
        );

        let empty = storage.date_stats(TEST_DATE.succ_opt().unwrap(), 3)?;
        assert_eq!(empty.total_seconds, 0);
        assert!(empty.top_apps.is_empty());
        Ok(())
    }

    #[test]
    fn range_queries_fill_missing_days() -> Result<()> {
        let storage = SqliteUsageStorage::open_in_memory()?;
        let start = TEST_DATE;
        let end = TEST_DATE.checked_add_days(Days::new(2)).unwrap();
        storage.increment(start, "Steam", 60)?;
        storage.increment(start, "Discord", 10)?;
        storage.increment(end, "Discord", 15)?;
        // Outside of the window.
        storage.increment(end.succ_opt().unwrap(), "Discord", 1000)?;

        let totals = storage.daily_totals(start, end)?;
        assert_eq!(
            totals,
            vec![
                DailyUsage { date: start, seconds: 70 },
                DailyUsage { date: start.succ_opt().unwrap(), seconds: 0 },
                DailyUsage { date: end, seconds: 15 },
            ]
        );

        let top = storage.top_apps_between(start, end, 10)?;
        assert_eq!(top, vec![AppUsage::new("Steam", 60), AppUsage::new("Discord", 25)]);

        let history = storage.app_history("Discord", start, end)?;
        assert_eq!(
            history.iter().map(|v| v.seconds).collect::<Vec<_>>(),
            vec![10, 0, 15]
        );
        Ok(())
    }

    #[test]
    fn queries_are_idempotent() -> Result<()> {
        let storage = SqliteUsageStorage::open_in_memory()?;
        storage.increment(TEST_DATE, "Steam", 60)?;
        assert_eq!(storage.date_stats(TEST_DATE, 10)?, storage.date_stats(TEST_DATE, 10)?);
        Ok(())
    }

    #[test]
    fn concurrent_increments_keep_total_consistent() -> Result<()> {
        let storage = Arc::new(SqliteUsageStorage::open_in_memory()?);
        let handles = (0..4)
            .map(|i| {
                let storage = storage.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        storage
                            .increment(TEST_DATE, &format!("App {i}"), 2)
                            .unwrap();
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = storage.day_summary(TEST_DATE)?.unwrap();
        assert_eq!(summary.total_seconds, 200);
        assert_eq!(summary.app_count, 4);
        assert_day_total_invariant(&storage, TEST_DATE);
        Ok(())
    }

    #[test]
    fn data_survives_reopening() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("usage.db");
        {
            let storage = SqliteUsageStorage::open(&path)?;
            storage.increment(TEST_DATE, "Google Chrome", 4)?;
        }
        let storage = SqliteUsageStorage::open(&path)?;
        assert_eq!(storage.path(), Some(path.as_path()));
        storage.increment(TEST_DATE, "Google Chrome", 1)?;
        assert_eq!(storage.date_stats(TEST_DATE, 10)?.top_apps, vec![AppUsage::new("Google Chrome", 5)]);
        Ok(())
    }

    #[test]
    fn separate_connections_write_the_same_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("usage.db");
        let writers = (0..2)
            .map(|_| SqliteUsageStorage::open(&path).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        let handles = writers
            .iter()
            .enumerate()
            .map(|(i, storage)| {
                let storage = storage.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        storage
                            .increment(TEST_DATE, &format!("App {i}"), 1)
                            .unwrap();
                        storage.date_stats(TEST_DATE, 10).unwrap();
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = writers[0].day_summary(TEST_DATE)?.unwrap();
        assert_eq!(summary.total_seconds, 100);
        assert_eq!(summary.app_count, 2);
        assert_day_total_invariant(&writers[1], TEST_DATE);
        Ok(())
    }
}
