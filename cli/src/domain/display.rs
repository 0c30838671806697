//! Virtual display constants and bring-up state machine.

/// X display every service binds to.
pub const DISPLAY: &str = ":0";

/// Embedded asset holding the dummy monitor/device/screen definition.
pub const XORG_CONF_ASSET: &str = "xorg-dummy.conf";

/// Embedded asset holding the virtual input device definitions.
pub const INPUT_CONF_ASSET: &str = "input-devices.conf";

/// Process name of the desktop session manager checked for liveness.
pub const DESKTOP_PROCESS: &str = "xfce4-session";

/// Command that starts the desktop session.
pub const DESKTOP_COMMAND: &str = "startxfce4";

/// X lock file left behind by a display server that was killed on `:0`.
pub const DISPLAY_LOCK_FILE: &str = "/tmp/.X0-lock";

/// `pkill -f` pattern for a display server bound to [`DISPLAY`].
///
/// Matches the binary by basename: Ubuntu's `/usr/bin/Xorg` wrapper execs
/// `/usr/lib/xorg/Xorg`, which keeps the display arguments.
pub const DISPLAY_SERVER_PATTERN: &str = "(^|/)Xorg :0( |$)";

/// Lifecycle of the virtual display server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    NotStarted,
    Starting,
    Ready,
    Failed,
}

/// Observations that drive [`DisplayState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    /// The server process was launched in the background.
    Launched,
    /// A display-info query against [`DISPLAY`] succeeded.
    QuerySucceeded,
    /// The readiness budget ran out.
    TimedOut,
}

impl DisplayState {
    /// Apply `event`. `Ready` and `Failed` are terminal.
    #[must_use]
    pub fn on(self, event: DisplayEvent) -> Self {
        match (self, event) {
            (Self::NotStarted, DisplayEvent::Launched) => Self::Starting,
            (Self::Starting, DisplayEvent::QuerySucceeded) => Self::Ready,
            (Self::Starting, DisplayEvent::TimedOut) => Self::Failed,
            (state, _) => state,
        }
    }
}
