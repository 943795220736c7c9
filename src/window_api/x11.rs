use anyhow::{Context, Result};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::{instrument, warn};
use xcb::{
    Connection, Xid,
    x::{self, ATOM_ANY, Atom, GetProperty, InternAtom, Window},
};

use super::{ActiveWindowData, WindowProbe};

fn intern_atom(conn: &Connection, name: &[u8]) -> Result<Atom> {
    let reply = conn.wait_for_reply(conn.send_request(&InternAtom {
        only_if_exists: false,
        name,
    }))?;
    Ok(reply.atom())
}

fn get_pid(conn: &Connection, window: Window, pid_atom: Atom) -> Result<Option<u32>> {
    let result = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window,
        property: pid_atom,
        r#type: ATOM_ANY,
        long_offset: 0,
        long_length: 1,
    }))?;
    Ok(result.value::<u32>().first().copied())
}

/// Returns the active window or `None` when the root has no `_NET_ACTIVE_WINDOW` set, which is
/// what most window managers report while the desktop itself is focused.
fn get_active_window(
    conn: &Connection,
    root: Window,
    active_window_atom: Atom,
) -> Result<Option<Window>> {
    let result = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window: root,
        property: active_window_atom,
        r#type: ATOM_ANY,
        long_offset: 0,
        long_length: 1,
    }))?;
    Ok(result
        .value::<Window>()
        .first()
        .copied()
        .filter(|w| !w.is_none()))
}

fn get_name(conn: &Connection, window: Window, wm_name_atom: Atom) -> Result<String> {
    let wm_name = conn.wait_for_reply(conn.send_request(&x::GetProperty {
        delete: false,
        window,
        property: wm_name_atom,
        r#type: x::ATOM_ANY,
        long_offset: 0,
        long_length: 1024,
    }))?;
    Ok(String::from_utf8_lossy(wm_name.value::<u8>()).into_owned())
}

pub struct LinuxWindowProbe {
    connection: Connection,
    preferred_screen: usize,
    active_window_atom: Atom,
    window_name_atom: Atom,
    pid_atom: Atom,
    system: System,
}

impl LinuxWindowProbe {
    pub fn new() -> Result<Self> {
        let (connection, preferred_screen) = xcb::Connection::connect(None)?;
        let active_window_atom = intern_atom(&connection, b"_NET_ACTIVE_WINDOW")?;
        let window_name_atom = intern_atom(&connection, b"_NET_WM_NAME")?;
        let pid_atom = intern_atom(&connection, b"_NET_WM_PID")?;
        Ok(Self {
            connection,
            preferred_screen: preferred_screen.max(0) as usize,
            active_window_atom,
            window_name_atom,
            pid_atom,
            system: System::new(),
        })
    }

    fn process_name(&mut self, pid: u32) -> Option<String> {
        let pid = Pid::from_u32(pid);
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_exe(sysinfo::UpdateKind::OnlyIfNotSet),
        );
        let process = self.system.process(pid)?;
        process
            .exe()
            .and_then(|v| v.to_str())
            .map(|v| v.to_string())
            .or_else(|| process.name().to_str().map(|v| v.to_string()))
    }
}

impl WindowProbe for LinuxWindowProbe {
    #[instrument(skip(self))]
    fn sample(&mut self) -> Result<Option<ActiveWindowData>> {
        let setup = self.connection.get_setup();

        // Currently the application only supports 1 x11 screen.
        let root = setup
            .roots()
            .nth(self.preferred_screen)
            .context("X11 screen is missing")?
            .root();

        let Some(active_window) =
            get_active_window(&self.connection, root, self.active_window_atom)?
        else {
            return Ok(None);
        };
        let window_title = get_name(&self.connection, active_window, self.window_name_atom)?;
        let Some(process_id) = get_pid(&self.connection, active_window, self.pid_atom)? else {
            warn!("Active window {active_window:?} has no _NET_WM_PID");
            return Ok(Some(ActiveWindowData {
                window_title: window_title.into(),
                process_name: "".into(),
                process_id: 0,
            }));
        };
        let process_name = self.process_name(process_id).unwrap_or_default();
        Ok(Some(ActiveWindowData {
            window_title: window_title.into(),
            process_name: process_name.into(),
            process_id,
        }))
    }
}
