use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    daemon::{naming::normalize_app_name, storage::usage_storage::UsageStorage},
    utils::clock::Clock,
    window_api::{ActiveWindowData, WindowProbe},
};

use super::{
    filter::SystemWindowFilter,
    state::{AttributionState, Interval},
};

/// State shared between the tracking loop and [TrackerHandle]s. Every state change and the flush
/// it causes happen under `state`'s lock.
struct Attribution<S> {
    state: Mutex<AttributionState>,
    storage: S,
    clock: Box<dyn Clock>,
    filter: SystemWindowFilter,
}

impl<S: UsageStorage> Attribution<S> {
    fn lock(&self) -> MutexGuard<'_, AttributionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Credits a finished interval to the day it ended on. Failures are logged and the interval
    /// is dropped.
    fn flush(&self, interval: Interval) {
        let seconds = interval.seconds();
        if seconds == 0 || interval.app.is_empty() {
            debug!("Skipping empty interval {interval:?}");
            return;
        }
        let app_name = normalize_app_name(&interval.app);
        let date = self.clock.date_of(interval.end);
        match self.storage.increment(date, &app_name, seconds) {
            Ok(()) => info!("Credited {seconds}s to {app_name} on {date}"),
            Err(e) => error!("Failed to credit {seconds}s to {app_name} on {date}: {e:?}"),
        }
    }

    fn observe(&self, sample: Option<ActiveWindowData>) {
        let sample = self.filter.accept(sample);
        let mut state = self.lock();
        let now = self.clock.time();
        if let Some(interval) = state.observe(sample.as_ref().map(|v| v.app_identity()), now) {
            self.flush(interval);
        }
    }

    fn finish(&self) {
        let mut state = self.lock();
        let now = self.clock.time();
        if let Some(interval) = state.finish(now) {
            self.flush(interval);
        }
    }
}

/// Operations available from outside of the tracking loop.
trait Control: Send + Sync {
    fn pause(&self);
    fn resume(&self);
    fn is_paused(&self) -> bool;
}

impl<S: UsageStorage> Control for Attribution<S> {
    fn pause(&self) {
        let mut state = self.lock();
        let now = self.clock.time();
        if let Some(interval) = state.pause(now) {
            self.flush(interval);
        }
        info!("Tracking paused");
    }

    fn resume(&self) {
        if self.lock().resume() {
            info!("Tracking resumed");
        }
    }

    fn is_paused(&self) -> bool {
        self.lock().is_paused()
    }
}

/// Cloneable control surface of a running engine. Safe to use from any thread at any time.
#[derive(Clone)]
pub struct TrackerHandle {
    control: Arc<dyn Control>,
    shutdown: CancellationToken,
}

impl TrackerHandle {
    /// Credits the running interval and stops attributing time until [TrackerHandle::resume].
    pub fn pause(&self) {
        self.control.pause()
    }

    /// Leaves the paused state. Time spent paused is never credited.
    pub fn resume(&self) {
        self.control.resume()
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Asks the loop to finish. It credits the running interval and exits at the next tick
    /// boundary.
    pub fn stop(&self) {
        self.shutdown.cancel()
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Completes once [TrackerHandle::stop] was called.
    pub async fn stopped(&self) {
        self.shutdown.cancelled().await
    }
}

/// Polls the [WindowProbe] at a fixed interval and turns samples into per app durations.
pub struct AttributionEngine<S> {
    attribution: Arc<Attribution<S>>,
    probe: Box<dyn WindowProbe + Send>,
    shutdown: CancellationToken,
    poll_interval: Duration,
}

impl<S: UsageStorage + 'static> AttributionEngine<S> {
    pub fn new(
        storage: S,
        probe: Box<dyn WindowProbe + Send>,
        clock: Box<dyn Clock>,
        filter: SystemWindowFilter,
        poll_interval: Duration,
    ) -> Self {
        Self {
            attribution: Arc::new(Attribution {
                state: Mutex::new(AttributionState::default()),
                storage,
                clock,
                filter,
            }),
            probe,
            shutdown: CancellationToken::new(),
            poll_interval,
        }
    }

    pub fn handle(&self) -> TrackerHandle {
        TrackerHandle {
            control: self.attribution.clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    fn sample(&mut self) -> Option<ActiveWindowData> {
        match self.probe.sample() {
            Ok(sample) => {
                debug!("Sampled {sample:?}");
                sample
            }
            Err(e) => {
                // Fail closed, the next tick tries again.
                warn!("Window probe failed, treating as no window {e:?}");
                None
            }
        }
    }

    /// Executes the tracking loop until [TrackerHandle::stop] is called.
    pub async fn run(mut self) -> Result<()> {
        info!("Tracking started with poll interval {:?}", self.poll_interval);
        let mut tick_point = self.attribution.clock.instant();
        while !self.shutdown.is_cancelled() {
            tick_point += self.poll_interval;

            // The probe may be slow, so it runs outside of the state lock. A pause that lands
            // in between is seen by `observe`, which then ignores the sample.
            if !self.attribution.is_paused() {
                let sample = self.sample();
                self.attribution.observe(sample);
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = self.attribution.clock.sleep_until(tick_point) => ()
            }
        }

        self.attribution.finish();
        info!("Tracking stopped");
        Ok(())
    }
}
