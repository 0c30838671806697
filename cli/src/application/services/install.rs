//! Application services: repository installs and download-and-install.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::application::ports::{
    Downloader, PackageManager, ProgressReporter, SearchPath, SystemFs,
};
use crate::domain::{Artifact, ProvisionError};

/// Outcome of [`install_artifact`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The binary was already on `PATH`; nothing was downloaded.
    AlreadyInstalled(PathBuf),
    /// The artifact was downloaded and installed.
    Installed,
}

/// Install the fixed package list from the system repositories.
///
/// # Errors
///
/// Returns [`ProvisionError::DependencyInstall`] when the package manager
/// exits non-zero. Never retried.
pub async fn install_dependencies(pm: &impl PackageManager, packages: &[String]) -> Result<()> {
    let output = pm.install_packages(packages).await?;
    if !output.status.success() {
        return Err(ProvisionError::DependencyInstall {
            packages: packages.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }
    Ok(())
}

/// Download `artifact` into `tmp_dir` and install it, unless its binary is
/// already reachable on `PATH`.
///
/// The downloaded file is removed whether or not the install succeeds.
///
/// # Errors
///
/// Returns [`ProvisionError::Download`] on a fetch failure and
/// [`ProvisionError::PackageInstall`] when the package manager rejects the file.
pub async fn install_artifact(
    sys: &(impl SearchPath + Downloader + PackageManager + SystemFs),
    reporter: &impl ProgressReporter,
    artifact: &Artifact,
    tmp_dir: &Path,
) -> Result<InstallOutcome> {
    if let Some(path) = sys.which(&artifact.binary) {
        reporter.success(&format!(
            "{} already installed ({})",
            artifact.package,
            path.display()
        ));
        return Ok(InstallOutcome::AlreadyInstalled(path));
    }

    let url = artifact.url();
    let dest = tmp_dir.join(artifact.file_name());
    reporter.detail(&format!("downloading {} {}", artifact.package, artifact.version));
    if let Err(e) = sys.download(&url, &dest).await {
        discard(sys, &dest);
        return Err(ProvisionError::Download {
            url,
            reason: format!("{e:#}"),
        }
        .into());
    }

    let installed = sys.install_local(&dest).await;
    discard(sys, &dest);
    let output = installed?;
    if !output.status.success() {
        return Err(ProvisionError::PackageInstall {
            package: artifact.package.clone(),
            path: dest,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }
    Ok(InstallOutcome::Installed)
}

fn discard(fs: &impl SystemFs, path: &Path) {
    if let Err(e) = fs.remove_file(path) {
        tracing::warn!(path = %path.display(), error = %format!("{e:#}"), "temp file not removed");
    }
}
