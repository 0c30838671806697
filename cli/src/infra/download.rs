//! HTTP download of release artifacts.
//!
//! Blocking `ureq` I/O runs on the blocking pool; the file is streamed into
//! `{dest}.partial` and renamed into place only once complete.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Download `url` to `dest`, replacing any existing file.
///
/// # Errors
///
/// Returns an error on a non-2xx status, an interrupted transfer, or a
/// failed write.
pub async fn download_file(url: &str, dest: &Path, quiet: bool) -> Result<()> {
    let url = url.to_string();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || fetch(&url, &dest, quiet))
        .await
        .context("download task panicked")?
}

fn fetch(url: &str, dest: &Path, quiet: bool) -> Result<()> {
    tracing::debug!(url, dest = %dest.display(), "downloading");
    let response = match ureq::get(url).call() {
        Ok(r) => r,
        Err(ureq::Error::Status(code, _)) => anyhow::bail!("HTTP {code}"),
        Err(e) => return Err(anyhow::Error::new(e).context("request failed")),
    };

    let total = response
        .header("Content-Length")
        .and_then(|v| v.parse::<u64>().ok());
    let pb = if quiet {
        indicatif::ProgressBar::hidden()
    } else if let Some(t) = total {
        let pb = indicatif::ProgressBar::new(t);
        pb.set_style(
            indicatif::ProgressStyle::default_bar()
                .template("  [{bar:40}] {percent}% ({bytes}/{total_bytes})")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb
    } else {
        indicatif::ProgressBar::new_spinner()
    };

    let partial = partial_path(dest);
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&partial)
        .with_context(|| format!("opening {}", partial.display()))?;

    let mut reader = response.into_reader();
    let mut buf = vec![0u8; 64 * 1024];
    let copied = loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break Ok(()),
            Ok(n) => n,
            Err(e) => break Err(anyhow::Error::new(e).context("download interrupted")),
        };
        if let Err(e) = file.write_all(&buf[..n]) {
            break Err(anyhow::Error::new(e).context("writing download"));
        }
        pb.inc(n as u64);
    };
    pb.finish_and_clear();
    drop(file);

    if let Err(e) = copied {
        std::fs::remove_file(&partial).ok();
        return Err(e);
    }
    std::fs::rename(&partial, dest)
        .with_context(|| format!("finalizing {}", dest.display()))?;
    Ok(())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut s = dest.as_os_str().to_owned();
    s.push(".partial");
    PathBuf::from(s)
}
