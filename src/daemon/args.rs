use std::{path::PathBuf, time::Duration};

use clap::Parser;
use tracing::level_filters::LevelFilter;

use super::{TrackerConfig, DEFAULT_POLL_INTERVAL};

#[derive(Parser, Debug)]
#[command(name = "apptime-daemon", version, about = "Tracks time spent in foreground applications")]
pub struct DaemonArgs {
    /// Run in the current process instead of detaching.
    #[arg(long)]
    pub force: bool,
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
    /// Seconds between two samples of the foreground window.
    #[arg(
        long = "poll-interval",
        default_value_t = DEFAULT_POLL_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval: u64,
}

impl DaemonArgs {
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            poll_interval: Duration::from_secs(self.poll_interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;

    use super::DaemonArgs;

    #[test]
    fn defaults_to_two_second_polling() {
        let args = DaemonArgs::parse_from(["apptime-daemon"]);
        assert_eq!(args.tracker_config().poll_interval, Duration::from_secs(2));
        assert!(!args.force);
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(DaemonArgs::try_parse_from(["apptime-daemon", "--poll-interval", "0"]).is_err());
        let args =
            DaemonArgs::try_parse_from(["apptime-daemon", "--poll-interval", "5", "--force"])
                .unwrap();
        assert_eq!(args.tracker_config().poll_interval, Duration::from_secs(5));
    }
}
