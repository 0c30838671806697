//! Application service: desktop session bring-up.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{Clock, ProcessTable, ProgressReporter};
use crate::domain::display::{DESKTOP_COMMAND, DESKTOP_PROCESS, DISPLAY};
use crate::domain::{CommandLine, DetachedSpec, ProvisionError};

/// Start the desktop against the virtual display and confirm its session
/// process is alive after `settle`.
///
/// With `strict` unset a missing session process is reported as a warning
/// and `Ok(None)` is returned.
///
/// # Errors
///
/// Returns [`ProvisionError::DesktopNotAlive`] in strict mode, or the launch
/// error when the desktop cannot be spawned.
pub async fn start_desktop(
    sys: &(impl ProcessTable + Clock),
    reporter: &impl ProgressReporter,
    log_dir: &Path,
    settle: Duration,
    strict: bool,
) -> Result<Option<u32>> {
    let spec = DetachedSpec {
        command: CommandLine::new(DESKTOP_COMMAND).env("DISPLAY", DISPLAY),
        log: log_dir.join("desktop.log"),
        privileged: false,
    };
    sys.spawn_detached(&spec)
        .await
        .context("launching desktop session")?;
    sys.sleep(settle).await;

    match sys.pid_of(DESKTOP_PROCESS).await? {
        Some(pid) => Ok(Some(pid)),
        None if strict => Err(ProvisionError::DesktopNotAlive {
            process: DESKTOP_PROCESS.to_string(),
            display: DISPLAY.to_string(),
        }
        .into()),
        None => {
            reporter.warn(&format!(
                "{DESKTOP_PROCESS} is not running; streaming may show an empty screen"
            ));
            Ok(None)
        }
    }
}
