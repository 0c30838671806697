//! Infrastructure implementation of the system facade ports.
//!
//! `HostSystem<R>` routes every host interaction (apt, ufw, pgrep/pkill,
//! tmux, xdpyinfo, sudo) through a `CommandRunner`, so tests can inject a
//! scripted runner without spawning real processes.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{
    Clock, CommandRunner, DisplayProbe, Downloader, Firewall, Identity, PackageManager,
    ProcessTable, SearchPath, SessionManager, SystemFs,
};
use crate::domain::{DetachedSpec, PortRule, SessionSpec};
use crate::infra::command_runner::{
    CommandTimeout, DEFAULT_CMD_TIMEOUT, PACKAGE_CMD_TIMEOUT, TokioCommandRunner,
};
use crate::infra::download::download_file;

/// Timeout for a single display-info query.
const DISPLAY_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Production adapter for every host-facing port.
pub struct HostSystem<R: CommandRunner> {
    cmd_runner: R,
    pkg_runner: R,
    quiet: bool,
}

impl<R: CommandRunner> HostSystem<R> {
    /// Create a host adapter with explicit runner instances.
    pub fn new(cmd_runner: R, pkg_runner: R, quiet: bool) -> Self {
        Self {
            cmd_runner,
            pkg_runner,
            quiet,
        }
    }
}

impl HostSystem<TokioCommandRunner> {
    /// Convenience constructor for production use.
    #[must_use]
    pub fn default_runner(quiet: bool) -> Self {
        Self::new(
            TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT),
            TokioCommandRunner::new(PACKAGE_CMD_TIMEOUT),
            quiet,
        )
    }
}

/// Map a pgrep/pkill style exit code: 0 matched, 1 nothing matched.
fn matched(program: &str, output: &Output) -> Result<bool> {
    match output.status.code() {
        Some(0) => Ok(true),
        Some(1) => Ok(false),
        _ => anyhow::bail!(
            "{program} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ),
    }
}

fn ensure_success(what: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    anyhow::bail!("{what} failed: {}", String::from_utf8_lossy(&output.stderr).trim())
}

impl<R: CommandRunner> Identity for HostSystem<R> {
    async fn effective_uid(&self) -> Result<u32> {
        let output = self.cmd_runner.run("id", &["-u"]).await?;
        ensure_success("id -u", &output)?;
        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse()
            .context("parsing effective uid")
    }
}

impl<R: CommandRunner> SearchPath for HostSystem<R> {
    fn which(&self, binary: &str) -> Option<PathBuf> {
        let path = std::env::var_os("PATH")?;
        std::env::split_paths(&path)
            .map(|dir| dir.join(binary))
            .find(|candidate| is_executable(candidate))
    }
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

impl<R: CommandRunner> PackageManager for HostSystem<R> {
    async fn install_packages(&self, packages: &[String]) -> Result<Output> {
        let update = self
            .pkg_runner
            .run("sudo", &["apt-get", "update"])
            .await
            .context("apt-get update")?;
        if !update.status.success() {
            return Ok(update);
        }
        let mut args = vec!["env", "DEBIAN_FRONTEND=noninteractive", "apt-get", "install", "-y"];
        args.extend(packages.iter().map(String::as_str));
        self.pkg_runner
            .run("sudo", &args)
            .await
            .context("apt-get install")
    }

    async fn install_local(&self, package: &Path) -> Result<Output> {
        let path = package.to_string_lossy();
        self.pkg_runner
            .run(
                "sudo",
                &["env", "DEBIAN_FRONTEND=noninteractive", "apt-get", "install", "-y", &path],
            )
            .await
            .with_context(|| format!("apt-get install {path}"))
    }
}

impl<R: CommandRunner> Downloader for HostSystem<R> {
    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        download_file(url, dest, self.quiet).await
    }
}

impl<R: CommandRunner> Firewall for HostSystem<R> {
    async fn allow(&self, rule: &PortRule) -> Result<Output> {
        let rule = rule.to_string();
        self.cmd_runner.run("sudo", &["ufw", "allow", &rule]).await
    }

    async fn enable(&self) -> Result<Output> {
        self.cmd_runner.run("sudo", &["ufw", "--force", "enable"]).await
    }
}

impl<R: CommandRunner> ProcessTable for HostSystem<R> {
    async fn pid_of(&self, name: &str) -> Result<Option<u32>> {
        let output = self.cmd_runner.run("pgrep", &["-x", "-o", name]).await?;
        if !matched("pgrep", &output)? {
            return Ok(None);
        }
        let pid = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .and_then(|l| l.trim().parse().ok());
        Ok(pid)
    }

    async fn kill_by_name(&self, name: &str) -> Result<bool> {
        let output = self.cmd_runner.run("sudo", &["pkill", "-9", "-x", name]).await?;
        matched("pkill", &output)
    }

    async fn kill_by_pattern(&self, pattern: &str) -> Result<bool> {
        let output = self.cmd_runner.run("sudo", &["pkill", "-9", "-f", pattern]).await?;
        matched("pkill", &output)
    }

    async fn spawn_detached(&self, spec: &DetachedSpec) -> Result<u32> {
        let cmd = &spec.command;
        if !spec.privileged {
            let args: Vec<&str> = cmd.args.iter().map(String::as_str).collect();
            return self
                .cmd_runner
                .spawn_detached(&cmd.program, &args, &cmd.env, &spec.log);
        }

        let bindings: Vec<String> = cmd.env.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let mut args: Vec<&str> = Vec::new();
        if !bindings.is_empty() {
            args.push("env");
            args.extend(bindings.iter().map(String::as_str));
        }
        args.push(&cmd.program);
        args.extend(cmd.args.iter().map(String::as_str));
        self.cmd_runner.spawn_detached("sudo", &args, &[], &spec.log)
    }

    async fn snapshot(&self) -> Result<String> {
        let output = self.cmd_runner.run("ps", &["-eo", "pid,comm,args"]).await?;
        ensure_success("ps", &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl<R: CommandRunner> SessionManager for HostSystem<R> {
    async fn start(&self, spec: &SessionSpec) -> Result<()> {
        let line = spec.shell_line();
        tracing::debug!(session = %spec.name, %line, "starting tmux session");
        let output = self
            .cmd_runner
            .run("tmux", &["new-session", "-d", "-s", &spec.name, &line])
            .await?;
        ensure_success("tmux new-session", &output)
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let target = format!("={name}");
        let output = self.cmd_runner.run("tmux", &["has-session", "-t", &target]).await?;
        Ok(output.status.success())
    }

    async fn terminate(&self, name: &str) -> Result<bool> {
        let target = format!("={name}");
        let output = self.cmd_runner.run("tmux", &["kill-session", "-t", &target]).await?;
        Ok(output.status.success())
    }

    async fn list(&self) -> Result<String> {
        let output = self.cmd_runner.run("tmux", &["ls"]).await?;
        // Without a server tmux exits non-zero and explains on stderr.
        let text = if output.status.success() {
            &output.stdout
        } else {
            &output.stderr
        };
        Ok(String::from_utf8_lossy(text).trim().to_string())
    }
}

impl<R: CommandRunner> DisplayProbe for HostSystem<R> {
    async fn is_ready(&self, display: &str) -> Result<bool> {
        let output = self
            .cmd_runner
            .run_with_timeout("xdpyinfo", &["-display", display], DISPLAY_QUERY_TIMEOUT)
            .await;
        match output {
            Ok(o) => Ok(o.status.success()),
            // A hung query counts as not ready yet.
            Err(e) if e.is::<CommandTimeout>() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl<R: CommandRunner> SystemFs for HostSystem<R> {
    async fn write_root_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            let parent = parent.to_string_lossy();
            let output = self.cmd_runner.run("sudo", &["mkdir", "-p", &parent]).await?;
            ensure_success("sudo mkdir", &output)?;
        }
        let target = path.to_string_lossy();
        let output = self
            .cmd_runner
            .run_with_stdin("sudo", &["tee", &target], content)
            .await?;
        ensure_success("sudo tee", &output)
    }

    async fn remove_root_file(&self, path: &Path) -> Result<()> {
        let target = path.to_string_lossy();
        let output = self.cmd_runner.run("sudo", &["rm", "-f", &target]).await?;
        ensure_success("sudo rm", &output)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("creating directory {}", path.display()))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(e).with_context(|| format!("removing file {}", path.display()))
            }
            _ => Ok(()),
        }
    }

    fn read_to_string(&self, path: &Path) -> Result<Option<String>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading file {}", path.display())),
        }
    }
}

impl<R: CommandRunner> Clock for HostSystem<R> {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
