//! Quick-tunnel URL extraction from the tunnel client's log.
//!
//! Pure functions only. `cloudflared` prints the public hostname of a quick
//! tunnel inside a boxed banner; the log is scraped rather than parsed because
//! the client exposes no structured channel for it.

use regex::Regex;
use std::sync::LazyLock;

/// Hostname suffix that signals the tunnel client has printed its URL.
pub const TUNNEL_MARKER: &str = "trycloudflare.com";

/// A quick-tunnel URL: `https://` followed by one DNS label of lowercase
/// letters, digits and hyphens, then `.trycloudflare.com`. Anything after the
/// hostname (path, padding, banner border) is not part of the match.
pub static TUNNEL_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"https://[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.trycloudflare\.com\b")
        .expect("valid regex")
});

/// Result of scanning the current log contents once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelScan {
    /// The marker has not appeared yet.
    Pending,
    /// The marker appeared and the first URL was extracted.
    Found(String),
    /// The marker appeared but no well-formed URL could be extracted.
    MarkerWithoutUrl,
}

/// Scan log contents for the tunnel URL. First match wins.
#[must_use]
pub fn scan_log(content: &str) -> TunnelScan {
    if !content.contains(TUNNEL_MARKER) {
        return TunnelScan::Pending;
    }
    extract_tunnel_url(content).map_or(TunnelScan::MarkerWithoutUrl, TunnelScan::Found)
}

/// Return the first quick-tunnel URL in `content`, verbatim.
#[must_use]
pub fn extract_tunnel_url(content: &str) -> Option<String> {
    TUNNEL_URL_RE
        .find(content)
        .map(|m| m.as_str().to_string())
}
