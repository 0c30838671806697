//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::stage::StageId;

// ── Provisioning errors ───────────────────────────────────────────────────────

/// Fatal causes that abort a provisioning run.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(
        "deskcast must not be run as root.\n\nRun it as a regular user with sudo rights: deskcast"
    )]
    RunningAsRoot,

    #[error("another deskcast run is in progress (pid {pid}).\n\nLock file: {}", .lock.display())]
    AlreadyRunning { pid: u32, lock: PathBuf },

    #[error("package installation failed for: {packages}\n{stderr}")]
    DependencyInstall { packages: String, stderr: String },

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("installing {package} from {} failed\n{stderr}", .path.display())]
    PackageInstall {
        package: String,
        path: PathBuf,
        stderr: String,
    },

    #[error("firewall rule '{rule}' could not be applied\n{stderr}")]
    FirewallRule { rule: String, stderr: String },

    #[error("display {display} did not become ready within {waited_secs}s.\n\nCheck the log: {}", .log.display())]
    DisplayNotReady {
        display: String,
        waited_secs: u64,
        log: PathBuf,
    },

    #[error("desktop session '{process}' is not running on display {display}")]
    DesktopNotAlive { process: String, display: String },

    #[error("'{binary}' was not found on PATH")]
    NotOnPath { binary: String },

    #[error("tmux session '{session}' was not created.\n\nSessions:\n{sessions}\nLog:\n{log_tail}")]
    SessionNotCreated {
        session: String,
        sessions: String,
        log_tail: String,
    },

    #[error("'{process}' is not running after {attempts} launch attempts.\n\nLog:\n{log_tail}")]
    ProcessNotAlive {
        process: String,
        attempts: usize,
        log_tail: String,
    },

    #[error("tunnel log {} was never created", .log.display())]
    TunnelLogMissing { log: PathBuf },

    #[error("no tunnel URL appeared in {} within {waited_secs}s", .log.display())]
    TunnelTimeout { log: PathBuf, waited_secs: u64 },

    #[error("tunnel log {} mentions the tunnel host but holds no well-formed URL", .log.display())]
    TunnelUrlMissing { log: PathBuf },
}

impl ProvisionError {
    /// Stable machine-readable code used in `--json` error objects.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::RunningAsRoot => "running_as_root",
            Self::AlreadyRunning { .. } => "already_running",
            Self::DependencyInstall { .. } => "dependency_install",
            Self::Download { .. } => "download",
            Self::PackageInstall { .. } => "package_install",
            Self::FirewallRule { .. } => "firewall_rule",
            Self::DisplayNotReady { .. } => "display_not_ready",
            Self::DesktopNotAlive { .. } => "desktop_not_alive",
            Self::NotOnPath { .. } => "not_on_path",
            Self::SessionNotCreated { .. } => "session_not_created",
            Self::ProcessNotAlive { .. } => "process_not_alive",
            Self::TunnelLogMissing { .. } => "tunnel_log_missing",
            Self::TunnelTimeout { .. } => "tunnel_timeout",
            Self::TunnelUrlMissing { .. } => "tunnel_url_missing",
        }
    }
}

/// A fatal error attributed to the stage that raised it.
#[derive(Debug, Error)]
#[error("stage '{stage}' failed: {cause:#}")]
pub struct StageFailure {
    pub stage: StageId,
    pub cause: anyhow::Error,
}

impl StageFailure {
    /// The typed cause, when the stage failed with a [`ProvisionError`].
    #[must_use]
    pub fn provision_error(&self) -> Option<&ProvisionError> {
        self.cause.downcast_ref::<ProvisionError>()
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors raised while validating a loaded configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid firewall rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}
