use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use attribution::{engine::AttributionEngine, filter::SystemWindowFilter};
use storage::usage_storage::{SqliteUsageStorage, UsageStorage};
use tracing::{error, info};

use crate::{
    utils::{
        clock::{Clock, DefaultClock},
        dir::database_path,
    },
    window_api::{GenericWindowProbe, WindowProbe},
};

pub mod args;
pub mod attribution;
pub mod naming;
pub mod shutdown;
pub mod storage;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub poll_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Represents the starting point for the daemon
pub async fn start_daemon(dir: PathBuf, config: TrackerConfig) -> Result<()> {
    let db_path = database_path(&dir);
    let storage = SqliteUsageStorage::open(&db_path)
        .with_context(|| format!("Failed to open usage database {db_path:?}"))?;
    let probe = GenericWindowProbe::new()?;

    info!("Tracking into {db_path:?}");
    let engine = create_engine(storage, probe, DefaultClock, &config);
    let handle = engine.handle();

    let (_, tracking_result) = tokio::join!(shutdown::detect_signals(handle), engine.run());

    if let Err(tracking_result) = tracking_result {
        error!("Tracking got an error {:?}", tracking_result);
    }

    Ok(())
}

fn create_engine<S: UsageStorage + 'static>(
    storage: S,
    probe: impl WindowProbe + Send + 'static,
    clock: impl Clock,
    config: &TrackerConfig,
) -> AttributionEngine<S> {
    AttributionEngine::new(
        storage,
        Box::new(probe),
        Box::new(clock),
        SystemWindowFilter::default(),
        config.poll_interval,
    )
}
