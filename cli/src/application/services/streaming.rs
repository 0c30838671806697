//! Application service: streaming server launch with one direct fallback.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{
    Clock, ProcessTable, ProgressReporter, SearchPath, SessionManager, SystemFs,
};
use crate::domain::display::DISPLAY;
use crate::domain::session::STREAMING_SESSION;
use crate::domain::{
    CommandLine, DetachedSpec, LaunchMode, LaunchPlan, ProvisionError, SessionSpec,
};

/// Lines of a log included in failure diagnostics.
pub const LOG_TAIL_LINES: usize = 20;

/// Where the streaming server ended up running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamingLaunch {
    pub pid: u32,
    pub mode: LaunchMode,
}

/// Inputs to [`start_streaming_server`].
#[derive(Debug, Clone, Copy)]
pub struct StreamingOptions<'a> {
    /// Executable name, looked up on `PATH`.
    pub binary: &'a str,
    /// Log written by the session launch.
    pub session_log: &'a Path,
    /// Log written by the direct launch.
    pub direct_log: &'a Path,
    /// Wait after terminating the old session and after starting the new one.
    pub session_settle: Duration,
    /// Wait before checking that the process is alive.
    pub app_settle: Duration,
}

/// Start the streaming server in its managed session; if the session is up
/// but the process is not, launch it once directly in the background.
///
/// # Errors
///
/// - [`ProvisionError::NotOnPath`] when the binary is not installed.
/// - [`ProvisionError::SessionNotCreated`] when the session does not exist
///   after launch.
/// - [`ProvisionError::ProcessNotAlive`] when every attempt in `plan` left no
///   running process.
pub async fn start_streaming_server(
    sys: &(impl SearchPath + SessionManager + ProcessTable + SystemFs + Clock),
    reporter: &impl ProgressReporter,
    opts: StreamingOptions<'_>,
    plan: LaunchPlan,
) -> Result<StreamingLaunch> {
    if let Err(e) = sys.terminate(STREAMING_SESSION).await {
        tracing::warn!(error = %format!("{e:#}"), "terminating old streaming session failed");
    }
    sys.sleep(opts.session_settle).await;

    if sys.which(opts.binary).is_none() {
        return Err(ProvisionError::NotOnPath {
            binary: opts.binary.to_string(),
        }
        .into());
    }

    let command = CommandLine::new(opts.binary).env("DISPLAY", DISPLAY);
    let mut last_log = opts.session_log;
    for (attempt, mode) in plan.iter() {
        tracing::debug!(attempt, ?mode, "launching streaming server");
        match mode {
            LaunchMode::Session => {
                launch_in_session(sys, &command, opts).await?;
                last_log = opts.session_log;
            }
            LaunchMode::Direct => {
                reporter.warn(&format!(
                    "{} did not stay up in its session; launching it directly",
                    opts.binary
                ));
                sys.spawn_detached(&DetachedSpec {
                    command: command.clone(),
                    log: opts.direct_log.to_path_buf(),
                    privileged: false,
                })
                .await
                .context("direct launch of streaming server")?;
                last_log = opts.direct_log;
            }
        }

        sys.sleep(opts.app_settle).await;
        if let Some(pid) = sys.pid_of(opts.binary).await? {
            return Ok(StreamingLaunch { pid, mode });
        }
    }

    Err(ProvisionError::ProcessNotAlive {
        process: opts.binary.to_string(),
        attempts: plan.attempts(),
        log_tail: log_tail(sys, last_log, LOG_TAIL_LINES),
    }
    .into())
}

async fn launch_in_session(
    sys: &(impl SessionManager + SystemFs + Clock),
    command: &CommandLine,
    opts: StreamingOptions<'_>,
) -> Result<()> {
    let spec = SessionSpec {
        name: STREAMING_SESSION.to_string(),
        command: command.clone(),
        log: Some(opts.session_log.to_path_buf()),
    };
    if let Err(e) = sys.start(&spec).await {
        tracing::warn!(error = %format!("{e:#}"), "session start reported an error");
    }
    sys.sleep(opts.session_settle).await;

    if sys.exists(STREAMING_SESSION).await? {
        return Ok(());
    }
    let sessions = sys
        .list()
        .await
        .unwrap_or_else(|e| format!("(session listing failed: {e:#})"));
    Err(ProvisionError::SessionNotCreated {
        session: STREAMING_SESSION.to_string(),
        sessions,
        log_tail: log_tail(sys, opts.session_log, LOG_TAIL_LINES),
    }
    .into())
}

/// Last `lines` lines of `path`, or a placeholder when it cannot be read.
pub fn log_tail(fs: &impl SystemFs, path: &Path, lines: usize) -> String {
    match fs.read_to_string(path) {
        Ok(Some(content)) => {
            let all: Vec<&str> = content.lines().collect();
            all[all.len().saturating_sub(lines)..].join("\n")
        }
        Ok(None) => format!("({} does not exist)", path.display()),
        Err(e) => format!("({} unreadable: {e:#})", path.display()),
    }
}
