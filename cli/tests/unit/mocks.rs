//! Shared fake host for unit tests.
//!
//! `FakeHost` implements every system port in memory: a process table, a
//! session list, a filesystem map and a clock that only records sleeps. Its
//! behaviour switches let each test script one failure mode.

#![allow(clippy::expect_used, dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::time::Duration;

use anyhow::Result;
use deskcast_cli::application::ports::{
    AssetSource, Clock, DisplayProbe, Downloader, Firewall, Identity, PackageManager,
    ProcessTable, ProgressReporter, SearchPath, SessionManager, SystemFs,
};
use deskcast_cli::domain::{DetachedSpec, PortRule, SessionSpec};

// ── Output helpers ────────────────────────────────────────────────────────────

pub fn ok_output() -> Output {
    Output {
        status: ExitStatus::from_raw(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

pub fn err_output(stderr: &str) -> Output {
    Output {
        status: ExitStatus::from_raw(1 << 8),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Quick-tunnel banner as cloudflared prints it.
pub fn tunnel_banner(url: &str) -> String {
    format!(
        "2024-05-01T10:00:00Z INF Requesting new quick Tunnel on trycloudflare.com...\n\
         2024-05-01T10:00:01Z INF +----------------------------------------------------+\n\
         2024-05-01T10:00:01Z INF |  Your quick Tunnel has been created! Visit it at:  |\n\
         2024-05-01T10:00:01Z INF |  {url}                  |\n\
         2024-05-01T10:00:01Z INF +----------------------------------------------------+\n"
    )
}

// ── Behaviour switches ───────────────────────────────────────────────────────

/// What the tunnel client writes once its session starts.
#[derive(Clone)]
pub enum TunnelBehaviour {
    /// The log file is never created.
    NoLog,
    /// `content` appears in the log after `sleeps` clock sleeps.
    WritesAfter { sleeps: u32, content: String },
}

#[derive(Clone)]
pub struct Behaviour {
    pub uid: u32,
    pub apt_fails: bool,
    /// Download URLs containing any of these substrings fail.
    pub failing_downloads: Vec<String>,
    pub install_local_fails: bool,
    pub rejected_rule: Option<String>,
    /// Display answers after this many failed queries; `None` never.
    pub display_ready_after: Option<u32>,
    pub desktop_survives: bool,
    pub streaming_session_created: bool,
    pub streaming_survives_in_session: bool,
    pub streaming_survives_direct: bool,
    pub tunnel: TunnelBehaviour,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            uid: 1000,
            apt_fails: false,
            failing_downloads: Vec::new(),
            install_local_fails: false,
            rejected_rule: None,
            display_ready_after: Some(0),
            desktop_survives: true,
            streaming_session_created: true,
            streaming_survives_in_session: true,
            streaming_survives_direct: true,
            tunnel: TunnelBehaviour::WritesAfter {
                sleeps: 3,
                content: tunnel_banner("https://abc123.trycloudflare.com"),
            },
        }
    }
}

// ── FakeHost ─────────────────────────────────────────────────────────────────

pub struct FakeHost {
    pub behaviour: Behaviour,
    /// Every port call, in order.
    pub calls: RefCell<Vec<String>>,
    pub sleeps: RefCell<Vec<Duration>>,
    /// Binaries on `PATH`.
    pub installed: RefCell<BTreeSet<String>>,
    /// Live processes by name.
    pub processes: RefCell<BTreeMap<String, u32>>,
    pub sessions: RefCell<BTreeSet<String>>,
    pub files: RefCell<BTreeMap<PathBuf, String>>,
    next_pid: Cell<u32>,
    display_queries: Cell<u32>,
    pending_tunnel: RefCell<Option<(PathBuf, u32, String)>>,
}

impl FakeHost {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            calls: RefCell::new(Vec::new()),
            sleeps: RefCell::new(Vec::new()),
            installed: RefCell::new(BTreeSet::new()),
            processes: RefCell::new(BTreeMap::new()),
            sessions: RefCell::new(BTreeSet::new()),
            files: RefCell::new(BTreeMap::new()),
            next_pid: Cell::new(1000),
            display_queries: Cell::new(0),
            pending_tunnel: RefCell::new(None),
        }
    }

    pub fn healthy() -> Self {
        Self::new(Behaviour::default())
    }

    /// Mark binaries as already installed.
    pub fn with_installed(self, binaries: &[&str]) -> Self {
        self.installed
            .borrow_mut()
            .extend(binaries.iter().map(ToString::to_string));
        self
    }

    /// Leave processes running as if from an earlier run.
    pub fn with_running(self, names: &[&str]) -> Self {
        for name in names {
            self.start_process(name);
        }
        self
    }

    pub fn with_session(self, name: &str) -> Self {
        self.sessions.borrow_mut().insert(name.to_string());
        self
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.files
            .borrow_mut()
            .insert(PathBuf::from(path), content.to_string());
        self
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.borrow_mut().push(call.into());
    }

    fn start_process(&self, name: &str) -> u32 {
        let pid = self.next_pid.get() + 1;
        self.next_pid.set(pid);
        self.processes.borrow_mut().insert(name.to_string(), pid);
        pid
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn has_call(&self, prefix: &str) -> bool {
        self.count_calls(prefix) > 0
    }

    /// Calls recorded after the first one starting with `prefix`.
    pub fn calls_after(&self, prefix: &str) -> Vec<String> {
        let calls = self.calls.borrow();
        calls
            .iter()
            .position(|c| c.starts_with(prefix))
            .map(|i| calls[i + 1..].to_vec())
            .unwrap_or_default()
    }

    /// Index of the first call starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls.borrow().iter().position(|c| c.starts_with(prefix))
    }
}

impl Identity for FakeHost {
    async fn effective_uid(&self) -> Result<u32> {
        self.record("id -u");
        Ok(self.behaviour.uid)
    }
}

impl SearchPath for FakeHost {
    fn which(&self, binary: &str) -> Option<PathBuf> {
        self.record(format!("which {binary}"));
        self.installed
            .borrow()
            .contains(binary)
            .then(|| PathBuf::from("/usr/bin").join(binary))
    }
}

impl PackageManager for FakeHost {
    async fn install_packages(&self, packages: &[String]) -> Result<Output> {
        self.record(format!("apt-get install {}", packages.join(" ")));
        if self.behaviour.apt_fails {
            return Ok(err_output("E: Unable to locate package"));
        }
        Ok(ok_output())
    }

    async fn install_local(&self, package: &Path) -> Result<Output> {
        self.record(format!("apt-get install {}", package.display()));
        if self.behaviour.install_local_fails {
            return Ok(err_output("dpkg: dependency problems"));
        }
        let name = package.to_string_lossy();
        for binary in ["sunshine", "cloudflared"] {
            if name.contains(binary) {
                self.installed.borrow_mut().insert(binary.to_string());
            }
        }
        Ok(ok_output())
    }
}

impl Downloader for FakeHost {
    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        self.record(format!("download {url}"));
        if self
            .behaviour
            .failing_downloads
            .iter()
            .any(|f| url.contains(f.as_str()))
        {
            anyhow::bail!("HTTP 404");
        }
        self.files
            .borrow_mut()
            .insert(dest.to_path_buf(), "deb".to_string());
        Ok(())
    }
}

impl Firewall for FakeHost {
    async fn allow(&self, rule: &PortRule) -> Result<Output> {
        let rule = rule.to_string();
        self.record(format!("ufw allow {rule}"));
        if self.behaviour.rejected_rule.as_deref() == Some(rule.as_str()) {
            return Ok(err_output("ERROR: Bad port"));
        }
        Ok(ok_output())
    }

    async fn enable(&self) -> Result<Output> {
        self.record("ufw enable");
        Ok(ok_output())
    }
}

impl ProcessTable for FakeHost {
    async fn pid_of(&self, name: &str) -> Result<Option<u32>> {
        self.record(format!("pgrep {name}"));
        Ok(self.processes.borrow().get(name).copied())
    }

    async fn kill_by_name(&self, name: &str) -> Result<bool> {
        self.record(format!("pkill {name}"));
        Ok(self.processes.borrow_mut().remove(name).is_some())
    }

    async fn kill_by_pattern(&self, pattern: &str) -> Result<bool> {
        self.record(format!("pkill -f {pattern}"));
        Ok(self.processes.borrow_mut().remove("Xorg").is_some())
    }

    async fn spawn_detached(&self, spec: &DetachedSpec) -> Result<u32> {
        let program = spec.command.program.as_str();
        self.record(format!("spawn {program}"));
        let pid = match program {
            "Xorg" => self.start_process("Xorg"),
            "startxfce4" if self.behaviour.desktop_survives => {
                self.start_process("xfce4-session")
            }
            "sunshine" if self.behaviour.streaming_survives_direct => {
                self.start_process("sunshine")
            }
            _ => self.next_pid.get() + 500,
        };
        Ok(pid)
    }

    async fn snapshot(&self) -> Result<String> {
        Ok(self
            .processes
            .borrow()
            .iter()
            .map(|(name, pid)| format!("{pid} {name}"))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

impl SessionManager for FakeHost {
    async fn start(&self, spec: &SessionSpec) -> Result<()> {
        self.record(format!("tmux new-session {}", spec.name));
        match spec.name.as_str() {
            "sunshine" => {
                if !self.behaviour.streaming_session_created {
                    return Ok(());
                }
                if self.behaviour.streaming_survives_in_session {
                    self.start_process("sunshine");
                }
            }
            "tunnel" => {
                self.start_process("cloudflared");
                if let (TunnelBehaviour::WritesAfter { sleeps, content }, Some(log)) =
                    (&self.behaviour.tunnel, &spec.log)
                {
                    if *sleeps == 0 {
                        self.files.borrow_mut().insert(log.clone(), content.clone());
                    } else {
                        *self.pending_tunnel.borrow_mut() =
                            Some((log.clone(), *sleeps, content.clone()));
                    }
                }
            }
            _ => {}
        }
        self.sessions.borrow_mut().insert(spec.name.clone());
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        self.record(format!("tmux has-session {name}"));
        Ok(self.sessions.borrow().contains(name))
    }

    async fn terminate(&self, name: &str) -> Result<bool> {
        self.record(format!("tmux kill-session {name}"));
        Ok(self.sessions.borrow_mut().remove(name))
    }

    async fn list(&self) -> Result<String> {
        let sessions = self.sessions.borrow();
        if sessions.is_empty() {
            return Ok("no server running on /tmp/tmux-1000/default".to_string());
        }
        Ok(sessions
            .iter()
            .map(|s| format!("{s}: 1 windows"))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

impl DisplayProbe for FakeHost {
    async fn is_ready(&self, display: &str) -> Result<bool> {
        self.record(format!("xdpyinfo {display}"));
        let n = self.display_queries.get() + 1;
        self.display_queries.set(n);
        let up = self.processes.borrow().contains_key("Xorg");
        Ok(up && self.behaviour.display_ready_after.is_some_and(|after| n > after))
    }
}

impl SystemFs for FakeHost {
    async fn write_root_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        self.record(format!("write {}", path.display()));
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), String::from_utf8_lossy(content).into_owned());
        Ok(())
    }

    async fn remove_root_file(&self, path: &Path) -> Result<()> {
        self.record(format!("rm {}", path.display()));
        self.files.borrow_mut().remove(path);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.record(format!("mkdir {}", path.display()));
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.record(format!("rm {}", path.display()));
        self.files.borrow_mut().remove(path);
        Ok(())
    }

    fn read_to_string(&self, path: &Path) -> Result<Option<String>> {
        Ok(self.files.borrow().get(path).cloned())
    }
}

impl Clock for FakeHost {
    async fn sleep(&self, duration: Duration) {
        self.record(format!("sleep {}ms", duration.as_millis()));
        self.sleeps.borrow_mut().push(duration);
        let mut pending = self.pending_tunnel.borrow_mut();
        let due = match pending.as_mut() {
            Some((_, remaining, _)) => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            None => false,
        };
        if due && let Some((log, _, content)) = pending.take() {
            self.files.borrow_mut().insert(log, content);
        }
    }
}

// ── Assets and reporter ──────────────────────────────────────────────────────

pub struct FakeAssets;

impl AssetSource for FakeAssets {
    fn get_asset(&self, name: &str) -> Result<&'static [u8]> {
        match name {
            "xorg-dummy.conf" => Ok(b"Section \"Device\"\n    Driver \"dummy\"\nEndSection\n"),
            "input-devices.conf" => Ok(b"Section \"InputClass\"\nEndSection\n"),
            other => anyhow::bail!("embedded asset not found: {other}"),
        }
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub lines: RefCell<Vec<String>>,
}

impl RecordingReporter {
    pub fn warnings(&self) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .filter_map(|l| l.strip_prefix("warn ").map(str::to_string))
            .collect()
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.lines.borrow_mut().push(format!("step {message}"));
    }
    fn success(&self, message: &str) {
        self.lines.borrow_mut().push(format!("ok {message}"));
    }
    fn warn(&self, message: &str) {
        self.lines.borrow_mut().push(format!("warn {message}"));
    }
    fn detail(&self, message: &str) {
        self.lines.borrow_mut().push(format!("detail {message}"));
    }
}
