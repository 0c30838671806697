//! Outcome of a successful provisioning run.

use std::path::PathBuf;

use serde::Serialize;

use crate::domain::launch::LaunchMode;

/// Local Sunshine web UI, also the tunnel's origin.
pub const WEB_UI_URL: &str = "https://localhost:47990";

/// Everything the operator needs after the last stage.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProvisionSummary {
    /// Public quick-tunnel URL scraped from the tunnel log.
    pub tunnel_url: String,
    /// Local web UI of the streaming server.
    pub web_ui_url: String,
    /// PID of the running streaming server.
    pub streaming_pid: u32,
    /// Whether the streaming server needed the direct fallback.
    pub launch_mode: LaunchMode,
    pub log_dir: PathBuf,
    pub tunnel_log: PathBuf,
}

impl ProvisionSummary {
    /// Follow-up steps printed after the summary.
    #[must_use]
    pub fn next_steps(&self) -> Vec<String> {
        vec![
            format!("Open {} and set the Sunshine admin credentials", self.tunnel_url),
            "Add this host in Moonlight and enter the PIN under the web UI's PIN tab".to_string(),
            "Inspect the services with: tmux attach -t sunshine (or -t tunnel)".to_string(),
        ]
    }
}
