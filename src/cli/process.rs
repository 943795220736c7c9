use std::{
    env,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{anyhow, bail, Context, Result};
use sysinfo::{get_current_pid, Pid, Process, Signal, System};
use tracing::{info, warn};

use super::daemon_path::to_daemon_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonSignal {
    Stop,
    Pause,
    Resume,
}

/// A freshly spawned daemon installs its signal handlers shortly after start. Until then SIGUSR1
/// and SIGUSR2 would terminate it, so pause and resume skip daemons younger than this.
const SIGNAL_READY_SECONDS: u64 = 2;

impl DaemonSignal {
    /// Whether a daemon that has been running for `run_time` seconds can take this signal.
    fn is_ready(self, run_time: u64) -> bool {
        self == DaemonSignal::Stop || run_time >= SIGNAL_READY_SECONDS
    }

    fn as_signal(self) -> Signal {
        match self {
            DaemonSignal::Stop => Signal::Term,
            DaemonSignal::Pause => Signal::User1,
            DaemonSignal::Resume => Signal::User2,
        }
    }
}

fn daemon_executable() -> Result<PathBuf> {
    let cli = env::current_exe().context("Can't locate the current executable")?;
    Ok(to_daemon_path(cli))
}

fn find_daemons<'a>(system: &'a System, daemon: &Path, current_id: Pid) -> Vec<&'a Process> {
    system
        .processes()
        .iter()
        .filter(|(pid, _)| **pid != current_id)
        .filter(|(_, process)| !matches!(process.parent(), Some(p) if p == current_id))
        .filter(|(_, process)| process.exe().filter(|v| *v == daemon).is_some())
        .map(|(_, process)| process)
        .collect()
}

/// Sends `signal` to every running daemon. Returns how many daemons received it. Daemons that
/// just started are skipped for pause and resume.
pub fn signal_daemons(signal: DaemonSignal) -> Result<usize> {
    signal_daemons_of(&daemon_executable()?, signal)
}

fn signal_daemons_of(daemon: &Path, signal: DaemonSignal) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get current pid {e}"))?;
    let daemons = find_daemons(&system, daemon, current_id);

    let mut signalled = 0;
    for process in daemons {
        if !signal.is_ready(process.run_time()) {
            warn!(
                "Daemon {} is still starting, not sending {signal:?}",
                process.pid()
            );
            println!("Daemon {} is still starting, try again in a moment", process.pid());
            continue;
        }
        match (signal, process.kill_with(signal.as_signal())) {
            (_, Some(true)) => signalled += 1,
            (_, Some(false)) => warn!("Failed to send {signal:?} to {}", process.pid()),
            // This will forcefully terminate the process on Windows. Anything better will require
            // a lot more work.
            (DaemonSignal::Stop, None) => {
                if process.kill() {
                    signalled += 1;
                }
            }
            (_, None) => bail!("{signal:?} is not supported on this platform"),
        }
        if signal == DaemonSignal::Stop {
            process.wait();
        }
    }
    info!("Sent {signal:?} to {signalled} daemon(s)");
    Ok(signalled)
}

/// Stops running daemons and starts a new one. The daemon binary detaches itself, so this only
/// waits for the launcher to return.
pub fn restart_daemon(app_dir: &Path, poll_interval: u64) -> Result<()> {
    let daemon = daemon_executable()?;
    let stopped = signal_daemons_of(&daemon, DaemonSignal::Stop)?;
    if stopped > 0 {
        println!("Stopped {stopped} previous daemon(s)");
    }

    let mut command = std::process::Command::new(&daemon);
    command
        .arg("--dir")
        .arg(app_dir)
        .arg("--poll-interval")
        .arg(poll_interval.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null());

    println!("Spawning");
    let status = command
        .status()
        .with_context(|| format!("Failed to start {daemon:?}"))?;
    if !status.success() {
        bail!("Daemon launcher exited with {status}");
    }
    println!("Success");
    Ok(())
}
