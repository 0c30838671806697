//! Domain types and validators for deskcast configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::firewall::{PortRule, default_rules};

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.deskcast/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DeskcastConfig {
    /// Settle durations and readiness budgets.
    pub timing: TimingConfig,
    /// Failure policies.
    pub policy: PolicyConfig,
    /// Packages installed from the system repositories.
    pub packages: PackagesConfig,
    /// Ports opened in the firewall.
    pub firewall: FirewallConfig,
    /// Downloaded `.deb` artifacts.
    pub artifacts: ArtifactsConfig,
    /// Fixed filesystem locations.
    pub paths: PathsConfig,
}

/// Every wait the provisioner performs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Pause after stale-state cleanup issues its terminations.
    pub cleanup_settle_ms: u64,
    /// Pause after terminating a session before starting its replacement.
    pub session_settle_ms: u64,
    /// Interval between readiness probes.
    pub poll_interval_ms: u64,
    /// Budget for the display server to answer a display-info query.
    pub display_timeout_secs: u64,
    /// Wait before checking the desktop session is alive.
    pub desktop_settle_secs: u64,
    /// Wait after each streaming-server launch before checking it.
    pub app_settle_secs: u64,
    /// Budget for the tunnel URL to appear in the tunnel log.
    pub tunnel_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            cleanup_settle_ms: 2000,
            session_settle_ms: 1000,
            poll_interval_ms: 1000,
            display_timeout_secs: 5,
            desktop_settle_secs: 3,
            app_settle_secs: 3,
            tunnel_timeout_secs: 15,
        }
    }
}

impl TimingConfig {
    #[must_use]
    pub fn cleanup_settle(&self) -> Duration {
        Duration::from_millis(self.cleanup_settle_ms)
    }

    #[must_use]
    pub fn session_settle(&self) -> Duration {
        Duration::from_millis(self.session_settle_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn display_timeout(&self) -> Duration {
        Duration::from_secs(self.display_timeout_secs)
    }

    #[must_use]
    pub fn desktop_settle(&self) -> Duration {
        Duration::from_secs(self.desktop_settle_secs)
    }

    #[must_use]
    pub fn app_settle(&self) -> Duration {
        Duration::from_secs(self.app_settle_secs)
    }

    #[must_use]
    pub fn tunnel_timeout(&self) -> Duration {
        Duration::from_secs(self.tunnel_timeout_secs)
    }
}

/// Failure policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Abort when the desktop session is not alive after start (default).
    /// When `false` the run only warns and continues.
    pub strict_desktop: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            strict_desktop: true,
        }
    }
}

/// Repository packages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    pub install: Vec<String>,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        let install = [
            "tmux",
            "ufw",
            "xserver-xorg-core",
            "xserver-xorg-video-dummy",
            "xserver-xorg-input-libinput",
            "x11-utils",
            "xfce4",
            "xfce4-terminal",
            "dbus-x11",
            "pulseaudio",
        ];
        Self {
            install: install.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Firewall port table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallConfig {
    pub rules: Vec<PortRule>,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

/// A versioned `.deb` artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artifact {
    /// Executable looked up on `PATH` to decide whether to skip the install.
    pub binary: String,
    /// Package name reported in messages.
    pub package: String,
    pub version: String,
    /// Download URL with a `{version}` placeholder.
    pub url_template: String,
}

impl Artifact {
    /// The download URL with the version substituted.
    #[must_use]
    pub fn url(&self) -> String {
        self.url_template.replace("{version}", &self.version)
    }

    /// Last path segment of [`Artifact::url`], used as the temp file name.
    #[must_use]
    pub fn file_name(&self) -> String {
        let url = self.url();
        url.rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .map_or_else(|| format!("{}.deb", self.package), str::to_string)
    }
}

/// The two third-party artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub sunshine: Artifact,
    pub cloudflared: Artifact,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            sunshine: Artifact {
                binary: "sunshine".into(),
                package: "sunshine".into(),
                version: "0.23.1".into(),
                url_template: "https://github.com/LizardByte/Sunshine/releases/download/v{version}/sunshine-ubuntu-22.04-amd64.deb".into(),
            },
            cloudflared: Artifact {
                binary: "cloudflared".into(),
                package: "cloudflared".into(),
                version: "2024.6.1".into(),
                url_template: "https://github.com/cloudflare/cloudflared/releases/download/{version}/cloudflared-linux-amd64.deb".into(),
            },
        }
    }
}

/// Fixed filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Scratch directory for downloads, the tunnel log and the fallback log.
    pub tmp_dir: PathBuf,
    /// Log directory; `~/.deskcast/logs` when unset.
    pub log_dir: Option<PathBuf>,
    /// Dummy monitor/device/screen definition passed to `Xorg -config`.
    pub xorg_config: PathBuf,
    /// Virtual input devices, picked up from `xorg.conf.d`.
    pub input_config: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            tmp_dir: PathBuf::from("/tmp"),
            log_dir: None,
            xorg_config: PathBuf::from("/etc/X11/deskcast-xorg.conf"),
            input_config: PathBuf::from("/etc/X11/xorg.conf.d/10-deskcast-input.conf"),
        }
    }
}

impl PathsConfig {
    #[must_use]
    pub fn tunnel_log(&self) -> PathBuf {
        self.tmp_dir.join("cloudflared.log")
    }

    #[must_use]
    pub fn direct_launch_log(&self) -> PathBuf {
        self.tmp_dir.join("sunshine-direct.log")
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

impl DeskcastConfig {
    /// Validate cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        let t = &self.timing;
        if t.poll_interval_ms == 0 {
            return Err(invalid("timing.poll_interval_ms", "must be greater than zero"));
        }
        for (key, budget) in [
            ("timing.display_timeout_secs", t.display_timeout()),
            ("timing.tunnel_timeout_secs", t.tunnel_timeout()),
        ] {
            if budget < t.poll_interval() {
                return Err(invalid(key, "must not be shorter than timing.poll_interval_ms"));
            }
        }
        if self.packages.install.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid("packages.install", "package names must not be empty"));
        }
        for (key, artifact) in [
            ("artifacts.sunshine", &self.artifacts.sunshine),
            ("artifacts.cloudflared", &self.artifacts.cloudflared),
        ] {
            if !artifact.url_template.starts_with("https://") {
                return Err(invalid(key, "url_template must be an https:// URL"));
            }
            if !artifact.url_template.contains("{version}") {
                return Err(invalid(key, "url_template must contain {version}"));
            }
            if artifact.binary.is_empty() || artifact.version.is_empty() {
                return Err(invalid(key, "binary and version are required"));
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> anyhow::Error {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

// ── Unit tests ───────────────────────────────────────────────────────────────
