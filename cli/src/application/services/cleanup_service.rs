//! Application service: stale-state cleanup use-case.
//!
//! Brings the process table and the session list to a known-empty baseline
//! before anything is (re)started. Every termination is best-effort: a missing
//! target is success and a failing command is only logged.

use std::path::Path;
use std::time::Duration;

use crate::application::ports::{Clock, ProcessTable, SessionManager, SystemFs};
use crate::domain::display::{DESKTOP_PROCESS, DISPLAY_LOCK_FILE, DISPLAY_SERVER_PATTERN};
use crate::domain::session::{STREAMING_SESSION, TUNNEL_SESSION};

/// Processes force-killed before every run.
pub const STALE_PROCESSES: &[&str] = &[
    "sunshine",
    "cloudflared",
    DESKTOP_PROCESS,
    "xfce4-panel",
    "xfwm4",
];

/// Sessions terminated before every run.
pub const STALE_SESSIONS: &[&str] = &[STREAMING_SESSION, TUNNEL_SESSION];

/// What cleanup actually found and terminated.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub killed: Vec<String>,
    pub sessions_closed: Vec<String>,
    pub display_server_killed: bool,
}

impl CleanupReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.killed.is_empty() && self.sessions_closed.is_empty() && !self.display_server_killed
    }
}

/// Kill leftover processes, sessions and the display server, then wait
/// `settle` for the kernel to release them.
///
/// Never fails.
pub async fn cleanup_stale_state(
    sys: &(impl ProcessTable + SessionManager + SystemFs + Clock),
    settle: Duration,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    for name in STALE_PROCESSES {
        match sys.kill_by_name(name).await {
            Ok(true) => report.killed.push((*name).to_string()),
            Ok(false) => {}
            Err(e) => tracing::warn!(process = name, error = %format!("{e:#}"), "kill failed"),
        }
    }

    for name in STALE_SESSIONS {
        match sys.terminate(name).await {
            Ok(true) => report.sessions_closed.push((*name).to_string()),
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(session = name, error = %format!("{e:#}"), "session kill failed");
            }
        }
    }

    match sys.kill_by_pattern(DISPLAY_SERVER_PATTERN).await {
        Ok(killed) => report.display_server_killed = killed,
        Err(e) => tracing::warn!(error = %format!("{e:#}"), "display server kill failed"),
    }
    if let Err(e) = sys.remove_root_file(Path::new(DISPLAY_LOCK_FILE)).await {
        tracing::warn!(error = %format!("{e:#}"), "removing stale X lock failed");
    }

    sys.sleep(settle).await;
    tracing::debug!(?report, "stale state cleaned");
    report
}
