use std::path::PathBuf;

/// Daemon binary is expected to sit next to the cli binary.
pub fn to_daemon_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name("apptime-daemon");
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::to_daemon_path;

    #[test]
    fn daemon_sits_next_to_cli() {
        let path = to_daemon_path(PathBuf::from("/usr/local/bin/apptime"));
        assert_eq!(path.parent(), Some(PathBuf::from("/usr/local/bin").as_path()));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("apptime-daemon"));
    }
}
