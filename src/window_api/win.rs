use anyhow::{Result, anyhow};
use tracing::error;
use windows::{
    Win32::{
        Foundation::{BOOL, CloseHandle, GetLastError, HANDLE, HWND},
        System::{
            Diagnostics::Debug::{
                FORMAT_MESSAGE_FROM_SYSTEM, FORMAT_MESSAGE_IGNORE_INSERTS, FormatMessageW,
            },
            SystemServices::{LANG_ENGLISH, SUBLANG_ENGLISH_US},
            Threading::{
                OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
                QueryFullProcessImageNameW,
            },
        },
        UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowTextW, GetWindowThreadProcessId},
    },
    core::PWSTR,
};

use super::{ActiveWindowData, WindowProbe};

fn last_error_message() -> String {
    let err = unsafe { GetLastError() };
    let mut message_buffer = [0u16; 2048];
    let size = unsafe {
        FormatMessageW(
            FORMAT_MESSAGE_FROM_SYSTEM | FORMAT_MESSAGE_IGNORE_INSERTS,
            None,
            err.0,
            LANG_ENGLISH | (SUBLANG_ENGLISH_US << 10),
            PWSTR::from_raw(message_buffer.as_mut_ptr()),
            2048,
            None,
        )
    };
    String::from_utf16_lossy(&message_buffer[0..size as usize])
}

/// Returns the foreground window. A missing foreground window (locked screen, focus in
/// transition) is reported as `None`.
#[tracing::instrument]
pub fn get_active() -> Result<Option<ActiveWindowData>> {
    let window = unsafe { GetForegroundWindow() };

    if window.is_invalid() {
        return Ok(None);
    }

    let mut id = 0u32;
    unsafe { GetWindowThreadProcessId(window, Some(&mut id)) };
    if id == 0 {
        return Err(anyhow!("Failed to get active window {}", last_error_message()));
    }

    let mut text: [u16; 4096] = [0; 4096];
    let title = unsafe { get_window_title(window, &mut text) };

    let process_name = match unsafe {
        OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, BOOL::from(false), id)
    } {
        Ok(process_handle) => {
            let name = unsafe { get_window_process_path(process_handle, &mut text) }
                .inspect_err(|e| error!("Failed to get window process path {e:?}"))
                .unwrap_or_default();
            unsafe { CloseHandle(process_handle) }
                .inspect_err(|e| error!("Failed to close handle {e:?}"))?;
            name
        }
        // Elevated processes refuse the query. The title is still usable as identity.
        Err(e) => {
            error!("Failed to open process {id}: {e:?}");
            String::new()
        }
    };

    Ok(Some(ActiveWindowData {
        process_name: process_name.into(),
        window_title: title.into(),
        process_id: id,
    }))
}

unsafe fn get_window_process_path(process_handle: HANDLE, text: &mut [u16]) -> Result<String> {
    unsafe {
        let mut length = text.len() as u32;
        QueryFullProcessImageNameW(
            process_handle,
            PROCESS_NAME_WIN32,
            windows::core::PWSTR(text.as_mut_ptr()),
            &mut length,
        )?;
        Ok(String::from_utf16_lossy(&text[..length as usize]))
    }
}

unsafe fn get_window_title(window_handle: HWND, text: &mut [u16]) -> String {
    let len = unsafe { GetWindowTextW(window_handle, text) };
    String::from_utf16_lossy(&text[..len as usize])
}

pub struct WindowsWindowProbe {}

impl WindowsWindowProbe {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for WindowsWindowProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowProbe for WindowsWindowProbe {
    fn sample(&mut self) -> Result<Option<ActiveWindowData>> {
        get_active().inspect_err(|e| error!("Failed to get active window {e:?}"))
    }
}
