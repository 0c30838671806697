//! `deskcast`: provision the streaming host.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::application::services::provision::{ensure_not_root, provision};
use crate::domain::DeskcastConfig;
use crate::infra::lock::RunLock;
use crate::output::json;

/// Run the full provisioning sequence and print the summary.
///
/// The configuration is loaded and validated before anything touches the
/// host; the root check and the run lock come next.
///
/// # Errors
///
/// Returns an error for an invalid configuration, a root invocation, a
/// concurrent run, or the first failing stage.
pub async fn run(app: &AppContext) -> Result<()> {
    let config = app.config_store.load()?;
    ensure_not_root(&app.system).await?;

    let log_dir = resolve_log_dir(&config)?;
    let _lock = RunLock::acquire(&RunLock::default_path()?)?;
    tracing::info!(log_dir = %log_dir.display(), "provisioning started");

    let reporter = app.terminal_reporter();
    let summary = match provision(&app.system, &app.assets, &reporter, &config, &log_dir).await {
        Ok(summary) => summary,
        Err(failure) => {
            reporter.fail(&format!("{} failed", failure.stage));
            return Err(failure.into());
        }
    };
    tracing::info!(url = %summary.tunnel_url, "provisioning finished");

    if app.is_json() {
        println!("{}", json::format_summary(&summary)?);
    } else {
        app.renderer().render_summary(&summary);
    }
    Ok(())
}

fn resolve_log_dir(config: &DeskcastConfig) -> Result<PathBuf> {
    if let Some(dir) = &config.paths.log_dir {
        return Ok(dir.clone());
    }
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".deskcast").join("logs"))
}
