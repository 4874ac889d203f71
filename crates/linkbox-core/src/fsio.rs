//! File I/O for synchronized files
//!
//! Reads are plain whole-file reads. Writes are atomic: the bytes go to a
//! hidden temp file next to the target, are synced, then renamed over it,
//! so neither the watcher nor another reader ever sees a half-written file.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Read the whole file
pub async fn read_text(path: &Path) -> io::Result<Vec<u8>> {
    fs::read(path).await
}

/// Write the whole file atomically
///
/// 1. Write to a temp file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
pub async fn write_text(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let temp_path = temp_path_for(path);

    let result = async {
        let mut file = File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, path).await
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&temp_path).await;
    }
    result
}

/// `dir/links.json` -> `dir/.links.json.tmp`
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}
