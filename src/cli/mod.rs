pub mod daemon_path;
pub mod output;
pub mod process;
pub mod stats;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use process::{restart_daemon, signal_daemons, DaemonSignal};
use stats::{process_stats_command, StatsCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::{start_daemon, TrackerConfig, DEFAULT_POLL_INTERVAL},
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "apptime", version)]
#[command(about = "Tracks how long each application stays in the foreground", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default $XDG_STATE_HOME/apptime or $HOME/.local/state/apptime"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon for the application, replacing a running one")]
    Init {
        #[arg(long = "poll-interval", default_value_t = DEFAULT_POLL_INTERVAL.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
        poll_interval: u64,
    },
    #[command(
        about = "Run the tracker directly in current console. Used for debugging and for running under a service manager"
    )]
    Serve {
        #[arg(long = "poll-interval", default_value_t = DEFAULT_POLL_INTERVAL.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
        poll_interval: u64,
    },
    #[command(about = "Stop currently running daemon")]
    Stop {},
    #[command(about = "Pause tracking. Time while paused is not counted")]
    Pause {},
    #[command(about = "Resume paused tracking")]
    Resume {},
    #[command(flatten)]
    Stats(StatsCommand),
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args.dir.map_or_else(create_application_default_path, Ok)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        Some(LevelFilter::WARN)
    };
    enable_logging(CLI_PREFIX, &app_dir.join("logs"), logging_level, args.log)?;

    match args.commands {
        Commands::Init { poll_interval } => restart_daemon(&app_dir, poll_interval),
        Commands::Serve { poll_interval } => {
            let config = TrackerConfig {
                poll_interval: std::time::Duration::from_secs(poll_interval),
            };
            start_daemon(app_dir, config).await
        }
        Commands::Stop {} => {
            let stopped = signal_daemons(DaemonSignal::Stop)?;
            println!("Stopped {stopped} daemon(s)");
            Ok(())
        }
        Commands::Pause {} => {
            let count = signal_daemons(DaemonSignal::Pause)?;
            println!("Paused {count} daemon(s)");
            Ok(())
        }
        Commands::Resume {} => {
            let count = signal_daemons(DaemonSignal::Resume)?;
            println!("Resumed {count} daemon(s)");
            Ok(())
        }
        Commands::Stats(command) => process_stats_command(&app_dir, command),
    }
}
