use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use tokio::time::Instant;

/// Represents an entity responsible for providing dates across application. This can allow it to
/// be used for testing
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    /// Calendar day usage is attributed to. Local time by default.
    fn date_of(&self, time: DateTime<Utc>) -> NaiveDate {
        time.with_timezone(&Local).date_naive()
    }

    fn today(&self) -> NaiveDate {
        self.date_of(self.time())
    }

    fn instant(&self) -> Instant;

    async fn sleep_until(&self, instant: tokio::time::Instant);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

/// Clock that follows tokio's (possibly paused) time starting from a fixed moment. Days are
/// counted in UTC so tests don't depend on the machine timezone.
#[cfg(test)]
#[derive(Clone)]
pub struct TestClock {
    pub start_time: DateTime<Utc>,
    pub reference: Instant,
}

#[cfg(test)]
impl TestClock {
    pub fn starting_at(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            reference: Instant::now(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl Clock for TestClock {
    fn time(&self) -> DateTime<Utc> {
        self.start_time + self.reference.elapsed()
    }

    fn date_of(&self, time: DateTime<Utc>) -> NaiveDate {
        time.date_naive()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

/// Clock frozen at a manually advanced moment.
#[cfg(test)]
pub struct FixedClock(pub std::sync::Mutex<DateTime<Utc>>);

#[cfg(test)]
impl FixedClock {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self(std::sync::Mutex::new(time))
    }

    pub fn advance(&self, duration: chrono::Duration) {
        *self.0.lock().unwrap() += duration;
    }
}

#[cfg(test)]
#[async_trait]
impl Clock for FixedClock {
    fn time(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }

    fn date_of(&self, time: DateTime<Utc>) -> NaiveDate {
        time.date_naive()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

#[async_trait]
impl<C: Clock> Clock for std::sync::Arc<C> {
    fn time(&self) -> DateTime<Utc> {
        (**self).time()
    }

    fn date_of(&self, time: DateTime<Utc>) -> NaiveDate {
        (**self).date_of(time)
    }

    fn instant(&self) -> Instant {
        (**self).instant()
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        (**self).sleep_until(instant).await;
    }
}
