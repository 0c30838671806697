//! Application service: the provisioning use-case.
//!
//! Binds an action to each [`StageId`] and runs them strictly in order. An
//! action is a lazy future: a stage that is never reached is never polled,
//! so nothing after the first failure runs.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::cell::OnceCell;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use anyhow::Result;

use crate::application::ports::{AssetSource, Identity, ProgressReporter, SystemFacade};
use crate::application::services::cleanup_service::cleanup_stale_state;
use crate::application::services::desktop::start_desktop;
use crate::application::services::display::{start_display_server, write_display_config};
use crate::application::services::firewall::configure_firewall;
use crate::application::services::install::{install_artifact, install_dependencies};
use crate::application::services::streaming::{StreamingOptions, start_streaming_server};
use crate::application::services::tunnel::{TunnelOptions, start_tunnel};
use crate::domain::summary::WEB_UI_URL;
use crate::domain::{
    DeskcastConfig, LaunchPlan, PollPolicy, ProvisionError, ProvisionSummary, StageFailure,
    StageId,
};

/// A stage's deferred action.
pub type StageFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a>>;

/// One step of a run: its identity and the action that has not started yet.
pub struct Stage<'a> {
    pub id: StageId,
    pub action: StageFuture<'a>,
}

impl<'a> Stage<'a> {
    pub fn new(id: StageId, action: impl Future<Output = Result<()>> + 'a) -> Self {
        Self {
            id,
            action: Box::pin(action),
        }
    }
}

/// Run `stages` in order, stopping at the first failure.
///
/// # Errors
///
/// Returns the failing stage together with its cause. Later stages are
/// dropped without being polled.
pub async fn run_stages(
    reporter: &impl ProgressReporter,
    stages: Vec<Stage<'_>>,
) -> Result<(), StageFailure> {
    let total = stages.len();
    for (i, stage) in stages.into_iter().enumerate() {
        let n = i + 1;
        reporter.step(&format!("[{n}/{total}] {}", stage.id.describe()));
        tracing::debug!(stage = %stage.id, "stage started");
        stage
            .action
            .await
            .map_err(|cause| StageFailure { stage: stage.id, cause })?;
        reporter.success(&format!("[{n}/{total}] {}", stage.id));
    }
    Ok(())
}

/// Refuse to run with root privileges. Checked before any side effect.
///
/// # Errors
///
/// Returns [`ProvisionError::RunningAsRoot`] when the effective uid is 0.
pub async fn ensure_not_root(identity: &impl Identity) -> Result<()> {
    if identity.effective_uid().await? == 0 {
        return Err(ProvisionError::RunningAsRoot.into());
    }
    Ok(())
}

/// Provision the streaming host end to end.
///
/// # Errors
///
/// Returns the first failing stage and its cause.
pub async fn provision(
    sys: &impl SystemFacade,
    assets: &impl AssetSource,
    reporter: &impl ProgressReporter,
    config: &DeskcastConfig,
    log_dir: &Path,
) -> Result<ProvisionSummary, StageFailure> {
    let timing = &config.timing;
    let paths = &config.paths;
    let artifacts = &config.artifacts;
    let poll = |timeout| PollPolicy::new(timing.poll_interval(), timeout);

    let session_log = log_dir.join("sunshine.log");
    let direct_log = paths.direct_launch_log();
    let tunnel_log = paths.tunnel_log();

    let streaming = OnceCell::new();
    let tunnel_url = OnceCell::new();

    let stages = vec![
        Stage::new(
            StageId::Dependencies,
            install_dependencies(sys, &config.packages.install),
        ),
        Stage::new(StageId::Cleanup, async {
            let report = cleanup_stale_state(sys, timing.cleanup_settle()).await;
            if !report.is_empty() {
                tracing::info!(
                    killed = ?report.killed,
                    sessions = ?report.sessions_closed,
                    display_server = report.display_server_killed,
                    "terminated leftovers from a previous run"
                );
            }
            Ok(())
        }),
        Stage::new(StageId::StreamingInstall, async {
            install_artifact(sys, reporter, &artifacts.sunshine, &paths.tmp_dir).await?;
            Ok(())
        }),
        Stage::new(
            StageId::Firewall,
            configure_firewall(sys, &config.firewall.rules),
        ),
        Stage::new(StageId::TunnelInstall, async {
            install_artifact(sys, reporter, &artifacts.cloudflared, &paths.tmp_dir).await?;
            Ok(())
        }),
        Stage::new(
            StageId::DisplayConfig,
            write_display_config(sys, assets, paths, log_dir),
        ),
        Stage::new(StageId::DisplayServer, async {
            start_display_server(sys, &paths.xorg_config, log_dir, poll(timing.display_timeout()))
                .await?;
            Ok(())
        }),
        Stage::new(StageId::DesktopSession, async {
            start_desktop(
                sys,
                reporter,
                log_dir,
                timing.desktop_settle(),
                config.policy.strict_desktop,
            )
            .await?;
            Ok(())
        }),
        Stage::new(StageId::StreamingServer, async {
            let opts = StreamingOptions {
                binary: &artifacts.sunshine.binary,
                session_log: &session_log,
                direct_log: &direct_log,
                session_settle: timing.session_settle(),
                app_settle: timing.app_settle(),
            };
            let launch = start_streaming_server(sys, reporter, opts, LaunchPlan::default()).await?;
            let _ = streaming.set(launch);
            Ok(())
        }),
        Stage::new(StageId::Tunnel, async {
            let opts = TunnelOptions {
                binary: &artifacts.cloudflared.binary,
                origin: WEB_UI_URL,
                log: &tunnel_log,
                session_settle: timing.session_settle(),
                policy: poll(timing.tunnel_timeout()),
            };
            let url = start_tunnel(sys, opts).await?;
            let _ = tunnel_url.set(url);
            Ok(())
        }),
    ];
    run_stages(reporter, stages).await?;

    let (Some(launch), Some(url)) = (streaming.into_inner(), tunnel_url.into_inner()) else {
        return Err(StageFailure {
            stage: StageId::Tunnel,
            cause: anyhow::anyhow!("run finished without a streaming server or tunnel URL"),
        });
    };
    Ok(ProvisionSummary {
        tunnel_url: url,
        web_ui_url: WEB_UI_URL.to_string(),
        streaming_pid: launch.pid,
        launch_mode: launch.mode,
        log_dir: log_dir.to_path_buf(),
        tunnel_log,
    })
}
