use tokio::select;
use tracing::{error, info};

use super::attribution::engine::TrackerHandle;

/// Translates signals sent to the process into tracker commands: Ctrl-C and SIGTERM stop the
/// tracker, SIGUSR1 pauses it and SIGUSR2 resumes it. Returns once the tracker is stopped.
///
/// On Windows detached processes can't detect signals sent to them, so only Ctrl-C is handled
/// there.
pub async fn detect_signals(handle: TrackerHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::user_defined1()),
            signal(SignalKind::user_defined2()),
        ) {
            (Ok(mut terminate), Ok(mut pause), Ok(mut resume)) => loop {
                select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = terminate.recv() => break,
                    _ = handle.stopped() => return,
                    _ = pause.recv() => {
                        info!("Received pause signal");
                        handle.pause();
                    }
                    _ = resume.recv() => {
                        info!("Received resume signal");
                        handle.resume();
                    }
                }
            },
            (terminate, pause, resume) => {
                error!(
                    "Failed to install signal handlers {:?} {:?} {:?}",
                    terminate.err(),
                    pause.err(),
                    resume.err()
                );
                wait_for_ctrl_c(&handle).await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        wait_for_ctrl_c(&handle).await;
    }

    info!("Shutdown requested");
    handle.stop();
}

async fn wait_for_ctrl_c(handle: &TrackerHandle) {
    select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for Ctrl-C {e:?}");
                handle.stopped().await;
            }
        }
        _ = handle.stopped() => (),
    }
}
