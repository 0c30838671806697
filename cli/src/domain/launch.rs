//! Launch policy for the streaming server.
//!
//! The server is first started inside its managed session. If the session
//! comes up but the process does not, it gets exactly one direct background
//! launch. `LaunchPlan` holds both modes in a fixed-size array, so its
//! iterator cannot produce a third attempt.

use serde::Serialize;

/// How the streaming server was (or will be) launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LaunchMode {
    /// Inside the managed tmux session.
    Session,
    /// Directly in the background, outside any session.
    Direct,
}

/// Ordered, bounded set of launch attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchPlan {
    modes: [LaunchMode; 2],
}

impl LaunchPlan {
    /// Session launch first, then one direct fallback.
    #[must_use]
    pub const fn session_then_direct() -> Self {
        Self {
            modes: [LaunchMode::Session, LaunchMode::Direct],
        }
    }

    /// Total number of attempts the plan allows.
    #[must_use]
    pub const fn attempts(&self) -> usize {
        self.modes.len()
    }

    /// Attempts in order, numbered from 1.
    pub fn iter(&self) -> impl Iterator<Item = (usize, LaunchMode)> + '_ {
        self.modes.iter().copied().enumerate().map(|(i, m)| (i + 1, m))
    }
}

impl Default for LaunchPlan {
    fn default() -> Self {
        Self::session_then_direct()
    }
}
