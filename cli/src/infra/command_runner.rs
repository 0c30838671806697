//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` is the production implementation that uses tokio
//! for async process execution with a guaranteed timeout and kill.

use std::fs::OpenOptions;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;

use crate::application::ports::CommandRunner;

/// Default timeout for short host commands (pgrep, tmux, ufw, ...).
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for package manager runs, which download from the network.
pub const PACKAGE_CMD_TIMEOUT: Duration = Duration::from_secs(900);

/// A command killed for outliving its timeout.
#[derive(Debug, thiserror::Error)]
#[error("{program} timed out after {}s", .after.as_secs())]
pub struct CommandTimeout {
    pub program: String,
    pub after: Duration,
}

/// Production `CommandRunner`.
///
/// `tokio::time::timeout` around `.output().await` would only drop the
/// future; this implementation races the child against a sleep with
/// `tokio::select!` and kills it explicitly.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        tracing::debug!(program, ?args, "running command");
        let child = tokio::process::Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;
        collect(child, program, timeout).await
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], input: &[u8]) -> Result<Output> {
        tracing::debug!(program, ?args, bytes = input.len(), "running command with stdin");
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        // stdin must be fed while stdout is drained (tee echoes its input).
        let stdin_handle = child.stdin.take();
        let input_owned = input.to_vec();
        let stdin_task = tokio::spawn(async move {
            if let Some(mut stdin) = stdin_handle {
                let _ = stdin.write_all(&input_owned).await;
            }
        });

        let output = collect(child, program, self.timeout).await;
        let _ = stdin_task.await;
        output
    }

    fn spawn_detached(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
        log: &Path,
    ) -> Result<u32> {
        let out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log)
            .with_context(|| format!("opening log {}", log.display()))?;
        let err = out
            .try_clone()
            .with_context(|| format!("opening log {}", log.display()))?;

        let child = tokio::process::Command::new(program)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::from(out))
            .stderr(Stdio::from(err))
            .process_group(0)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;
        let pid = child
            .id()
            .with_context(|| format!("{program} exited before its pid was read"))?;
        tracing::debug!(program, pid, log = %log.display(), "detached process started");
        Ok(pid)
    }
}

/// Wait for `child` and collect its output, killing it after `timeout`.
async fn collect(mut child: Child, program: &str, timeout: Duration) -> Result<Output> {
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    tokio::select! {
        result = async {
            let (status, stdout, stderr) = tokio::join!(
                child.wait(),
                drain(stdout_handle),
                drain(stderr_handle),
            );
            Ok(Output {
                status: status.with_context(|| format!("waiting for {program}"))?,
                stdout,
                stderr,
            })
        } => result,
        () = tokio::time::sleep(timeout) => {
            let _ = child.kill().await;
            Err(CommandTimeout {
                program: program.to_string(),
                after: timeout,
            }
            .into())
        }
    }
}

async fn drain(handle: Option<impl AsyncRead + Unpin>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = h.read_to_end(&mut buf).await;
    }
    buf
}
