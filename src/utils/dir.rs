use std::{env, io, path::PathBuf};

use anyhow::{Context, Result};

pub const APPLICATION_DIR_NAME: &str = "apptime";

pub const DATABASE_FILE_NAME: &str = "usage.db";

/// Resolves `%APPDATA%\apptime` on Windows and `$XDG_STATE_HOME/apptime` (or
/// `$HOME/.local/state/apptime`) elsewhere, creating it when missing.
pub fn create_application_default_path() -> Result<PathBuf> {
    let mut path = {
        #[cfg(windows)]
        {
            env::var("APPDATA")
                .map(PathBuf::from)
                .context("APPDATA should be present on Windows")?
        }
        #[cfg(not(windows))]
        {
            env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .or_else(|_| {
                    env::var("HOME").map(|home| {
                        let mut path = PathBuf::from(home);
                        path.push(".local/state");
                        path
                    })
                })
                .context("Couldn't find neither XDG_STATE_HOME nor HOME")?
        }
    };
    path.push(APPLICATION_DIR_NAME);

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

pub fn database_path(application_dir: &std::path::Path) -> PathBuf {
    application_dir.join(DATABASE_FILE_NAME)
}
