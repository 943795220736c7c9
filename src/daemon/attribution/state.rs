use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Time that has to be credited to `app`. Produced whenever attribution of an app ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub app: Arc<str>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    /// Whole seconds between start and end. A clock that went backwards gives 0.
    pub fn seconds(&self) -> u64 {
        u64::try_from((self.end - self.start).num_seconds()).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase<'a> {
    Idle,
    Attributing {
        app: &'a str,
        start: DateTime<Utc>,
    },
    Paused,
}

/// Who currently owns elapsed time. Every transition that ends an attribution hands back the
/// finished [Interval] and leaves the state without an app, so an interval can't be produced twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributionState {
    current_app: Option<Arc<str>>,
    attribution_start: Option<DateTime<Utc>>,
    paused: bool,
}

impl AttributionState {
    pub fn phase(&self) -> Phase<'_> {
        if self.paused {
            return Phase::Paused;
        }
        match (&self.current_app, self.attribution_start) {
            (Some(app), Some(start)) => Phase::Attributing { app, start },
            _ => Phase::Idle,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Applies one probe result. `app` is `None` when nothing trackable is focused.
    pub fn observe(&mut self, app: Option<&str>, now: DateTime<Utc>) -> Option<Interval> {
        if self.paused {
            return None;
        }
        match app {
            Some(app) if self.current_app.as_deref() == Some(app) => None,
            Some(app) => {
                let finished = self.take_interval(now);
                self.current_app = Some(app.into());
                self.attribution_start = Some(now);
                finished
            }
            None => self.take_interval(now),
        }
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<Interval> {
        let finished = self.take_interval(now);
        self.paused = true;
        finished
    }

    /// Leaves the paused state. The next observation starts a fresh attribution; the paused gap
    /// is never credited. Returns whether the state was paused.
    pub fn resume(&mut self) -> bool {
        std::mem::replace(&mut self.paused, false)
    }

    /// Ends attribution for good, used on shutdown.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Option<Interval> {
        self.take_interval(now)
    }

    fn take_interval(&mut self, now: DateTime<Utc>) -> Option<Interval> {
        let app = self.current_app.take();
        let start = self.attribution_start.take();
        match (app, start) {
            (Some(app), Some(start)) => Some(Interval {
                app,
                start,
                end: now,
            }),
            _ => None,
        }
    }
}
