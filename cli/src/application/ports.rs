//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::{DeskcastConfig, DetachedSpec, PortRule, SessionSpec};

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Run a program with stdin piped from `stdin`.
    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output>;
    /// Start a program in its own process group with stdout and stderr
    /// appended to `log`, and return its PID without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be opened or the process cannot be spawned.
    fn spawn_detached(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
        log: &Path,
    ) -> Result<u32>;
}

// ── System Facade Ports ───────────────────────────────────────────────────────

/// Who the orchestrator runs as.
#[allow(async_fn_in_trait)]
pub trait Identity {
    /// Effective user id of the current process.
    async fn effective_uid(&self) -> Result<u32>;
}

/// Executable lookup on the search path.
pub trait SearchPath {
    /// Full path of `binary` when it is reachable on `PATH`.
    fn which(&self, binary: &str) -> Option<PathBuf>;
}

/// System package manager (elevated).
#[allow(async_fn_in_trait)]
pub trait PackageManager {
    /// Install named packages from the configured repositories.
    async fn install_packages(&self, packages: &[String]) -> Result<Output>;
    /// Install a downloaded package file.
    async fn install_local(&self, package: &Path) -> Result<Output>;
}

/// Artifact download.
#[allow(async_fn_in_trait)]
pub trait Downloader {
    /// Fetch `url` into `dest`, replacing any existing file.
    async fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Host firewall (elevated).
#[allow(async_fn_in_trait)]
pub trait Firewall {
    /// Allow inbound traffic matching `rule`.
    async fn allow(&self, rule: &PortRule) -> Result<Output>;
    /// Turn enforcement on.
    async fn enable(&self) -> Result<Output>;
}

/// The OS process table.
#[allow(async_fn_in_trait)]
pub trait ProcessTable {
    /// PID of the oldest process whose name is exactly `name`.
    async fn pid_of(&self, name: &str) -> Result<Option<u32>>;
    /// Force-kill every process named exactly `name`. `Ok(false)` when none matched.
    async fn kill_by_name(&self, name: &str) -> Result<bool>;
    /// Force-kill every process whose full command line matches `pattern`.
    async fn kill_by_pattern(&self, pattern: &str) -> Result<bool>;
    /// Start a background process outside any managed session.
    async fn spawn_detached(&self, spec: &DetachedSpec) -> Result<u32>;
    /// Human-readable process listing for diagnostics.
    async fn snapshot(&self) -> Result<String>;
}

/// Detachable named sessions (tmux).
#[allow(async_fn_in_trait)]
pub trait SessionManager {
    /// Start a detached session running `spec`.
    async fn start(&self, spec: &SessionSpec) -> Result<()>;
    /// Whether a session called `name` is alive.
    async fn exists(&self, name: &str) -> Result<bool>;
    /// Terminate the session called `name`. `Ok(false)` when there was none.
    async fn terminate(&self, name: &str) -> Result<bool>;
    /// Listing of all sessions for diagnostics.
    async fn list(&self) -> Result<String>;
}

/// Display-info query against an X display.
#[allow(async_fn_in_trait)]
pub trait DisplayProbe {
    /// `true` when the display answers.
    async fn is_ready(&self, display: &str) -> Result<bool>;
}

/// Filesystem access, including writes to root-owned locations.
#[allow(async_fn_in_trait)]
pub trait SystemFs {
    /// Write `content` to a root-owned `path`, creating parent directories.
    async fn write_root_file(&self, path: &Path, content: &[u8]) -> Result<()>;
    /// Remove a root-owned file. A missing file is not an error.
    async fn remove_root_file(&self, path: &Path) -> Result<()>;
    /// Create a user-owned directory and its parents.
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    /// Remove a user-owned file. A missing file is not an error.
    fn remove_file(&self, path: &Path) -> Result<()>;
    /// Read a file, `Ok(None)` when it does not exist.
    fn read_to_string(&self, path: &Path) -> Result<Option<String>>;
}

/// Suspension between polls and settle waits.
#[allow(async_fn_in_trait)]
pub trait Clock {
    async fn sleep(&self, duration: Duration);
}

/// Composite trait: everything the provisioner needs from the host.
pub trait SystemFacade:
    Identity
    + SearchPath
    + PackageManager
    + Downloader
    + Firewall
    + ProcessTable
    + SessionManager
    + DisplayProbe
    + SystemFs
    + Clock
{
}

/// Blanket implementation: any type implementing every sub-trait is a `SystemFacade`.
impl<T> SystemFacade for T where
    T: Identity
        + SearchPath
        + PackageManager
        + Downloader
        + Firewall
        + ProcessTable
        + SessionManager
        + DisplayProbe
        + SystemFs
        + Clock
{
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts loading of the orchestrator configuration.
pub trait ConfigStore {
    /// Load and validate the configuration; defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    fn load(&self) -> Result<DeskcastConfig>;
    /// Path of the configuration file.
    fn path(&self) -> Result<PathBuf>;
}

// ── Asset Port ────────────────────────────────────────────────────────────────

/// Abstracts access to the static configuration files compiled into the binary.
pub trait AssetSource {
    /// Get the raw bytes of a single embedded asset.
    fn get_asset(&self, name: &str) -> Result<&'static [u8]>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Synchronous.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Emit a line that another indicator (a download bar) draws below.
    /// A running step indicator is settled first.
    fn detail(&self, message: &str);
}
