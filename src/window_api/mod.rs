//! Contains logic for sampling the foreground window in different environments.
//! [GenericWindowProbe] is the main artifact of this module that abstracts
//! the operations.

#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use std::sync::Arc;

use anyhow::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWindowData {
    /// Name of the window. For example 'bash in hello' or 'Document 1' or 'Vibing in YouTube -
    /// Chrome'
    pub window_title: Arc<str>,
    /// Process name or full path to an executable. For example /home/etc/nvim or chrome.exe
    pub process_name: Arc<str>,
    pub process_id: u32,
}

impl ActiveWindowData {
    /// Identity used for attribution: the executable's file name, or the window title when the
    /// process couldn't be resolved. Titles are kept as is.
    pub fn app_identity(&self) -> &str {
        let process = executable_file_name(self.process_name.trim());
        if process.is_empty() {
            self.window_title.trim()
        } else {
            process
        }
    }
}

/// Probes may report a full path. Both separators are handled so Windows paths reduce on any
/// host.
fn executable_file_name(process: &str) -> &str {
    process.rsplit(['/', '\\']).next().unwrap_or(process).trim()
}

/// Intended to serve as a contract windows and linux systems must implement.
#[cfg_attr(test, mockall::automock)]
pub trait WindowProbe {
    /// Returns the focused window or `None` if nothing trackable is focused.
    fn sample(&mut self) -> Result<Option<ActiveWindowData>>;
}

/// Serves as a cross-compatible WindowProbe implementation.
pub struct GenericWindowProbe {
    inner: Box<dyn WindowProbe + Send>,
}

impl GenericWindowProbe {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win::WindowsWindowProbe;
                Ok(Self {
                    inner: Box::new(WindowsWindowProbe::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::LinuxWindowProbe;
                Ok(Self {
                    inner: Box::new(LinuxWindowProbe::new()?),
                })
            }
            else {
                anyhow::bail!("No window probe was compiled in. Enable the `win` or `x11` feature")
            }
        }
    }
}

impl WindowProbe for GenericWindowProbe {
    fn sample(&mut self) -> Result<Option<ActiveWindowData>> {
        self.inner.sample()
    }
}
