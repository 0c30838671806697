//! The ten provisioning stages, in execution order.
//!
//! Pure data. The actions bound to each stage live in
//! `crate::application::services::provision`.

use std::fmt;

use serde::Serialize;

/// Identifier of a provisioning stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageId {
    Dependencies,
    Cleanup,
    StreamingInstall,
    Firewall,
    TunnelInstall,
    DisplayConfig,
    DisplayServer,
    DesktopSession,
    StreamingServer,
    Tunnel,
}

impl StageId {
    /// Every stage, in the fixed order the provisioner runs them.
    pub const ALL: [StageId; 10] = [
        StageId::Dependencies,
        StageId::Cleanup,
        StageId::StreamingInstall,
        StageId::Firewall,
        StageId::TunnelInstall,
        StageId::DisplayConfig,
        StageId::DisplayServer,
        StageId::DesktopSession,
        StageId::StreamingServer,
        StageId::Tunnel,
    ];

    /// Stable machine-readable name (also used in JSON output).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Dependencies => "dependencies",
            Self::Cleanup => "cleanup",
            Self::StreamingInstall => "streaming-install",
            Self::Firewall => "firewall",
            Self::TunnelInstall => "tunnel-install",
            Self::DisplayConfig => "display-config",
            Self::DisplayServer => "display-server",
            Self::DesktopSession => "desktop-session",
            Self::StreamingServer => "streaming-server",
            Self::Tunnel => "tunnel",
        }
    }

    /// Human-readable progress line shown when the stage starts.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::Dependencies => "installing system dependencies...",
            Self::Cleanup => "cleaning up stale processes and sessions...",
            Self::StreamingInstall => "installing Sunshine...",
            Self::Firewall => "configuring firewall...",
            Self::TunnelInstall => "installing cloudflared...",
            Self::DisplayConfig => "writing virtual display configuration...",
            Self::DisplayServer => "starting virtual display server...",
            Self::DesktopSession => "starting desktop session...",
            Self::StreamingServer => "starting Sunshine...",
            Self::Tunnel => "opening tunnel...",
        }
    }

    /// 1-based position in [`StageId::ALL`].
    #[must_use]
    pub fn position(self) -> usize {
        Self::ALL
            .iter()
            .position(|s| *s == self)
            .map_or(0, |i| i + 1)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
