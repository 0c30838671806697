//! Application service: quick tunnel launch and URL discovery.

use std::cell::Cell;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{Clock, SessionManager, SystemFs};
use crate::application::services::readiness::{Readiness, poll_until};
use crate::domain::session::TUNNEL_SESSION;
use crate::domain::tunnel::{TunnelScan, scan_log};
use crate::domain::{CommandLine, PollPolicy, ProvisionError, SessionSpec};

/// Inputs to [`start_tunnel`].
#[derive(Debug, Clone, Copy)]
pub struct TunnelOptions<'a> {
    pub binary: &'a str,
    /// Local service the tunnel exposes.
    pub origin: &'a str,
    /// Log the tunnel client writes and the URL is scraped from.
    pub log: &'a Path,
    pub session_settle: Duration,
    pub policy: PollPolicy,
}

/// Start the tunnel client in its managed session and wait for the public
/// URL to show up in its log.
///
/// Any previous log is removed first, so a URL from an earlier run can never
/// be reported.
///
/// # Errors
///
/// At the deadline:
/// - [`ProvisionError::TunnelLogMissing`] when the log never appeared.
/// - [`ProvisionError::TunnelTimeout`] when the log exists but never
///   mentioned the tunnel host.
/// - [`ProvisionError::TunnelUrlMissing`] when the log mentions the tunnel
///   host but holds no well-formed URL. cloudflared names the host a moment
///   before printing the URL, so this state is polled through, not fatal.
pub async fn start_tunnel(
    sys: &(impl SessionManager + SystemFs + Clock),
    opts: TunnelOptions<'_>,
) -> Result<String> {
    if sys.terminate(TUNNEL_SESSION).await.unwrap_or(false) {
        sys.sleep(opts.session_settle).await;
    }
    sys.remove_file(opts.log)
        .with_context(|| format!("removing stale tunnel log {}", opts.log.display()))?;

    let spec = SessionSpec {
        name: TUNNEL_SESSION.to_string(),
        command: CommandLine::new(opts.binary).args([
            "tunnel",
            "--no-autoupdate",
            "--url",
            opts.origin,
            "--no-tls-verify",
        ]),
        log: Some(opts.log.to_path_buf()),
    };
    sys.start(&spec).await.context("starting tunnel session")?;

    let log_seen = Cell::new(false);
    let marker_seen = Cell::new(false);
    let outcome = poll_until(sys, opts.policy, || {
        let probe = sys.read_to_string(opts.log).map(|content| {
            let scan = scan_log(&content?);
            log_seen.set(true);
            match scan {
                TunnelScan::Found(url) => Some(url),
                TunnelScan::MarkerWithoutUrl => {
                    marker_seen.set(true);
                    None
                }
                TunnelScan::Pending => None,
            }
        });
        async move { probe }
    })
    .await?;

    let log = opts.log.to_path_buf();
    match outcome {
        Readiness::Ready(url) => Ok(url),
        Readiness::TimedOut { .. } if marker_seen.get() => {
            Err(ProvisionError::TunnelUrlMissing { log }.into())
        }
        Readiness::TimedOut { waited } if log_seen.get() => Err(ProvisionError::TunnelTimeout {
            log,
            waited_secs: waited.as_secs(),
        }
        .into()),
        Readiness::TimedOut { .. } => Err(ProvisionError::TunnelLogMissing { log }.into()),
    }
}
