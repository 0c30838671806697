//! Single-run guard.
//!
//! `RunLock` records the orchestrator's PID in `~/.deskcast/deskcast.pid`
//! for the duration of a run. A lock left behind by a dead process is taken
//! over; a lock held by a live one aborts the run. Drop only removes the
//! file while it still names this process.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::ProvisionError;

/// Held for the lifetime of a provisioning run; removes its file on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Default lock location (`~/.deskcast/deskcast.pid`).
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".deskcast").join("deskcast.pid"))
    }

    /// Take the lock at `path`.
    ///
    /// The file is created exclusively, so of two runs racing for a free
    /// lock only one succeeds. A lock left by a dead process (or holding no
    /// PID) is removed and creation retried once.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::AlreadyRunning`] when another live process
    /// holds it, or an I/O error when the file cannot be written.
    pub fn acquire(path: &Path) -> Result<Self> {
        let own = std::process::id();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }

        let mut took_over = false;
        loop {
            match create_exclusive(path, own) {
                Ok(()) => break,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if let Some(pid) = read_pid(path)?
                        && process_alive(pid)
                    {
                        return Err(ProvisionError::AlreadyRunning {
                            pid,
                            lock: path.to_path_buf(),
                        }
                        .into());
                    }
                    if took_over {
                        anyhow::bail!(
                            "lock file {} was re-created while taking it over",
                            path.display()
                        );
                    }
                    tracing::debug!(lock = %path.display(), "taking over stale run lock");
                    match std::fs::remove_file(path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => {
                            return Err(e).with_context(|| {
                                format!("removing stale lock file {}", path.display())
                            });
                        }
                    }
                    took_over = true;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("creating lock file {}", path.display()));
                }
            }
        }

        tracing::debug!(pid = own, lock = %path.display(), "run lock acquired");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match read_pid(&self.path) {
            Ok(Some(pid)) if pid == std::process::id() => {}
            Ok(holder) => {
                tracing::warn!(
                    lock = %self.path.display(),
                    ?holder,
                    "run lock no longer ours; left in place"
                );
                return;
            }
            Err(e) => {
                tracing::warn!(lock = %self.path.display(), error = %e, "run lock not removed");
                return;
            }
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(lock = %self.path.display(), error = %e, "run lock not removed");
        }
    }
}

/// Write `pid` to a private file and hard-link it into place. The link fails
/// with `AlreadyExists` when the lock is taken, and the lock never exists
/// without its PID.
fn create_exclusive(path: &Path, pid: u32) -> std::io::Result<()> {
    let staging = path.with_extension(format!("pid.{pid}"));
    std::fs::write(&staging, format!("{pid}\n"))?;
    let linked = std::fs::hard_link(&staging, path);
    let _ = std::fs::remove_file(&staging);
    linked
}

fn read_pid(path: &Path) -> Result<Option<u32>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content.trim().parse().ok()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading lock file {}", path.display())),
    }
}

fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}
