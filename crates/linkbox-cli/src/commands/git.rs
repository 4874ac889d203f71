//! Git backup command handlers
//!
//! Commits and pushes the bookmark file, or pulls it, using the `git`
//! repository that contains it.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use tracing::debug;

use linkbox_core::Library;

use crate::output::Output;

/// Commit the document file and push it
pub fn push(library: &Library, output: &Output) -> Result<()> {
    let (file, dir) = document_location(library)?;

    let changes = git_run(&["status", "--porcelain", "--", &file], &dir)?;
    if changes.trim().is_empty() {
        bail!("No changes to commit.");
    }

    git_run(&["add", "--", &file], &dir)?;
    git_run(&["commit", "-m", &commit_message(Utc::now())], &dir)?;
    let pushed = git_run(&["push"], &dir)?;

    output.success("Pushed bookmarks");
    if !pushed.trim().is_empty() {
        output.message(pushed.trim());
    }
    Ok(())
}

/// Pull the repository holding the document, then reload it
pub async fn pull(library: &mut Library, output: &Output) -> Result<()> {
    let (_, dir) = document_location(library)?;
    let path = library
        .documents()
        .path()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("No document open"))?;

    git_run(&["status"], &dir)?;
    let pulled = git_run(&["pull", "--ff"], &dir)?;

    library
        .open_path(&path)
        .await
        .with_context(|| format!("Failed to reload {}", path.display()))?;

    output.message(pulled.trim());
    Ok(())
}

/// Commit message for a backup made at `now`
pub fn commit_message(now: DateTime<Utc>) -> String {
    format!("Backup bookmarks {}", now.format("%Y-%m-%d %H:%M:%S"))
}

/// File name and containing directory of the open document
fn document_location(library: &Library) -> Result<(String, PathBuf)> {
    let path = library
        .documents()
        .path()
        .ok_or_else(|| anyhow!("No document open"))?;

    let file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("Not a file: {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((file, dir))
}

/// Run git in `dir`, returning stdout
///
/// A non-zero exit becomes an error carrying both stdout and stderr.
fn git_run(args: &[&str], dir: &Path) -> Result<String> {
    debug!("git {:?} in {}", args, dir.display());

    let result = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .context("Failed to run git. Is it installed?")?;

    let stdout = String::from_utf8_lossy(&result.stdout).into_owned();
    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        bail!(
            "git {} failed:\n{}{}",
            args.first().copied().unwrap_or_default(),
            stdout,
            stderr
        );
    }
    Ok(stdout)
}
