//! File system utilities.

use crate::Result;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Video extensions recognised as library media (compared lowercase).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "wmv", "flv", "m4v", "rmvb"];

/// Check if a path exists and is a directory.
pub fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(crate::Error::PathNotFound(path.display().to_string()));
    }
    if !path.is_dir() {
        return Err(crate::Error::NotADirectory(path.display().to_string()));
    }
    Ok(())
}

/// Get file extension in lowercase.
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Check if a file is a video file based on extension.
pub fn is_video_file(path: &Path) -> bool {
    get_extension(path)
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Last modification time of a file, if it can be read.
pub fn modified_time(path: &Path) -> Option<DateTime<Utc>> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .ok()
}

/// Sibling path a file is staged under before it replaces `path`.
pub fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.part", name))
}

/// Write a file atomically, creating its parent directory first.
///
/// Contents are staged in a sibling file and renamed into place, so `path`
/// either keeps its old contents or holds the complete new ones.
pub async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let staged = partial_path(path);
    let result = async {
        tokio::fs::write(&staged, contents).await?;
        tokio::fs::rename(&staged, path).await
    }
    .await;

    if let Err(e) = result {
        if let Err(cleanup) = tokio::fs::remove_file(&staged).await {
            tracing::debug!("Failed to remove {}: {}", staged.display(), cleanup);
        }
        return Err(e.into());
    }
    Ok(())
}
