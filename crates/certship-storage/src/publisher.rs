//! Directory and marker publishing

use std::path::{Path, PathBuf};

use certship_core::IssueError;
use tracing::{error, info};

use crate::store::Bucket;

/// Source attribution recorded when the zero-byte marker fails to upload.
const MARKER_SOURCE: &str = "Empty log file";

/// Uploads every file under `local_dir` to `dest_prefix` in the bucket,
/// recursing into subdirectories. Files go up in relative-path order so the
/// upload sequence, and the file a failure points at, is the same on every
/// run. The first failed upload aborts the rest.
pub async fn publish_directory(
    local_dir: &Path,
    bucket: &dyn Bucket,
    dest_prefix: &str,
) -> Result<(), IssueError> {
    info!(
        source = %local_dir.display(),
        bucket = bucket.name(),
        prefix = dest_prefix,
        "Uploading directory content"
    );
    for relative in collect_files_sorted(local_dir)? {
        let source = local_dir.join(&relative);
        let key = join_key(dest_prefix, &relative);
        info!(source = %source.display(), key = %key, "Uploading file");
        bucket.upload_file(&source, &key).await.map_err(|e| {
            error!(source = %source.display(), key = %key, error = %e, "Upload failed");
            IssueError::S3Upload {
                source_path: source.display().to_string(),
                bucket: bucket.name().to_string(),
                bucket_path: key.clone(),
            }
        })?;
    }
    info!(
        source = %local_dir.display(),
        bucket = bucket.name(),
        prefix = dest_prefix,
        "Directory upload completed"
    );
    Ok(())
}

/// Uploads a zero-byte object to `dest`. Doubles as the pre-flight write
/// check before a job starts and as its timestamped log marker.
pub async fn publish_marker(bucket: &dyn Bucket, dest: &str) -> Result<(), IssueError> {
    let key = normalize_key(dest);
    info!(bucket = bucket.name(), key = %key, "Uploading log marker");
    bucket.upload_bytes(Vec::new(), &key).await.map_err(|e| {
        error!(bucket = bucket.name(), key = %key, error = %e, "Marker upload failed");
        IssueError::S3Upload {
            source_path: MARKER_SOURCE.to_string(),
            bucket: bucket.name().to_string(),
            bucket_path: key.clone(),
        }
    })?;
    info!(bucket = bucket.name(), key = %key, "Log marker upload completed");
    Ok(())
}

/// Collapses `.`, `..` and doubled separators without touching the
/// filesystem. Leading separators are dropped; object keys never start
/// with one.
pub fn normalize_key(key: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in key.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_none_or(|last| *last == "..") {
                    parts.push("..");
                } else {
                    parts.pop();
                }
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

fn join_key(prefix: &str, relative: &Path) -> String {
    let mut key = String::from(prefix);
    for component in relative.components() {
        key.push('/');
        key.push_str(&component.as_os_str().to_string_lossy());
    }
    normalize_key(&key)
}

/// All files under `root`, as paths relative to it, sorted.
fn collect_files_sorted(root: &Path) -> Result<Vec<PathBuf>, IssueError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            IssueError::Internal(format!("Cannot read directory {}: {e}", dir.display()))
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| {
                IssueError::Internal(format!("Cannot read directory {}: {e}", dir.display()))
            })?;
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let relative = path.strip_prefix(root).map_err(|e| {
                    IssueError::Internal(format!("Path {} escapes {}: {e}", path.display(), root.display()))
                })?;
                files.push(relative.to_path_buf());
            }
        }
    }
    files.sort();
    Ok(files)
}
