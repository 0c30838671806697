//! Application services: virtual display configuration and bring-up.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::{AssetSource, Clock, DisplayProbe, ProcessTable, SystemFs};
use crate::application::services::readiness::{Readiness, poll_until};
use crate::domain::config::PathsConfig;
use crate::domain::display::{
    DISPLAY, DisplayEvent, DisplayState, INPUT_CONF_ASSET, XORG_CONF_ASSET,
};
use crate::domain::{CommandLine, DetachedSpec, PollPolicy, ProvisionError};

/// Create the log directory and write the two static X11 configuration files.
///
/// # Errors
///
/// Returns an error if an asset is missing or a file cannot be written.
pub async fn write_display_config(
    fs: &impl SystemFs,
    assets: &impl AssetSource,
    paths: &PathsConfig,
    log_dir: &Path,
) -> Result<()> {
    fs.create_dir_all(log_dir)?;
    for (asset, dest) in [
        (XORG_CONF_ASSET, &paths.xorg_config),
        (INPUT_CONF_ASSET, &paths.input_config),
    ] {
        let content = assets.get_asset(asset)?;
        fs.write_root_file(dest, content)
            .await
            .with_context(|| format!("writing {}", dest.display()))?;
    }
    Ok(())
}

/// Launch Xorg on [`DISPLAY`] with `xorg_config` and wait until the display
/// answers a display-info query.
///
/// # Errors
///
/// Returns [`ProvisionError::DisplayNotReady`] when the display does not
/// answer within `policy.timeout`, or the launch error itself.
pub async fn start_display_server(
    sys: &(impl ProcessTable + DisplayProbe + Clock),
    xorg_config: &Path,
    log_dir: &Path,
    policy: PollPolicy,
) -> Result<DisplayState> {
    let log = log_dir.join("xorg.log");
    let spec = DetachedSpec {
        command: CommandLine::new("Xorg").args([
            DISPLAY.to_string(),
            "-config".to_string(),
            xorg_config.to_string_lossy().into_owned(),
            "-noreset".to_string(),
            "-nolisten".to_string(),
            "tcp".to_string(),
        ]),
        log: log.clone(),
        privileged: true,
    };

    let mut state = DisplayState::NotStarted;
    let pid = sys
        .spawn_detached(&spec)
        .await
        .context("launching display server")?;
    state = state.on(DisplayEvent::Launched);
    tracing::debug!(pid, ?state, "display server launched");

    let ready = poll_until(sys, policy, || async move {
        Ok(sys.is_ready(DISPLAY).await?.then_some(()))
    })
    .await?;

    match ready {
        Readiness::Ready(()) => {
            state = state.on(DisplayEvent::QuerySucceeded);
            Ok(state)
        }
        Readiness::TimedOut { waited } => {
            state = state.on(DisplayEvent::TimedOut);
            tracing::debug!(?state, "display server not ready");
            Err(ProvisionError::DisplayNotReady {
                display: DISPLAY.to_string(),
                waited_secs: waited.as_secs(),
                log,
            }
            .into())
        }
    }
}
