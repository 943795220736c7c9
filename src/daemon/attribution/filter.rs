use crate::{daemon::naming::strip_executable, window_api::ActiveWindowData};

/// Shell, window manager and session processes. Focus on them means the user isn't in any
/// application.
pub const SYSTEM_PROCESSES: &[&str] = &[
    "dwm",
    "explorer",
    "winlogon",
    "csrss",
    "lsass",
    "logonui",
    "gnome-shell",
    "plasmashell",
    "kwin_x11",
    "kwin_wayland",
    "xfdesktop",
    "loginwindow",
];

pub struct SystemWindowFilter {
    denied: Vec<String>,
}

impl Default for SystemWindowFilter {
    fn default() -> Self {
        Self::new(SYSTEM_PROCESSES.iter().copied())
    }
}

impl SystemWindowFilter {
    pub fn new<'a>(denied: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            denied: denied.into_iter().map(|v| v.to_lowercase()).collect(),
        }
    }

    pub fn is_system(&self, app_identity: &str) -> bool {
        let key = strip_executable(app_identity).to_lowercase();
        key.is_empty() || self.denied.iter().any(|v| *v == key)
    }

    /// Drops samples that don't represent a real foreground application.
    pub fn accept(&self, sample: Option<ActiveWindowData>) -> Option<ActiveWindowData> {
        sample.filter(|v| !self.is_system(v.app_identity()))
    }
}

#[cfg(test)]
mod tests {
    use crate::window_api::ActiveWindowData;

    use super::SystemWindowFilter;

    fn sample(process_name: &str) -> Option<ActiveWindowData> {
        Some(ActiveWindowData {
            window_title: "title".into(),
            process_name: process_name.into(),
            process_id: 1,
        })
    }

    #[test]
    fn shell_processes_are_rejected() {
        let filter = SystemWindowFilter::default();
        assert!(filter.accept(sample("Explorer.EXE")).is_none());
        assert!(filter.accept(sample(r"C:\Windows\System32\dwm.exe")).is_none());
        assert!(filter.accept(sample("/usr/bin/gnome-shell")).is_none());
    }

    #[test]
    fn titles_are_not_mistaken_for_system_paths() {
        let filter = SystemWindowFilter::default();
        let files = Some(ActiveWindowData {
            window_title: "Files - /home/me/explorer".into(),
            process_name: "".into(),
            process_id: 1,
        });
        assert!(filter.accept(files).is_some());
    }

    #[test]
    fn applications_pass() {
        let filter = SystemWindowFilter::default();
        assert!(filter.accept(sample("chrome.exe")).is_some());
        // Exact match only, "explorer" inside a longer name is an application.
        assert!(filter.accept(sample("iexplorer.exe")).is_some());
        assert!(filter.accept(None).is_none());
    }

    #[test]
    fn empty_identity_is_rejected() {
        let filter = SystemWindowFilter::default();
        let blank = Some(ActiveWindowData {
            window_title: "".into(),
            process_name: "".into(),
            process_id: 0,
        });
        assert!(filter.accept(blank).is_none());
    }
}
