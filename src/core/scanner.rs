//! Directory scanner module.
//!
//! Finds video files under library roots, guesses a searchable title from
//! the file name and derives the sibling artifact paths of a video.

use crate::models::media::ArtifactPresence;
use crate::utils::fs::is_video_file;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively collect video files under `root`.
///
/// Failing to read the root itself is an error. Problems below the root are
/// logged and skipped. Results are sorted by path.
pub fn collect_video_files(root: &Path) -> Result<Vec<PathBuf>> {
    tracing::info!("Collecting video files from {}", root.display());

    let mut videos = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 || e.path() == Some(root) => {
                return Err(Error::LibraryRootUnreadable {
                    path: root.display().to_string(),
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                tracing::warn!("Failed to read entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if entry.file_type().is_file() && is_video_file(entry.path()) {
            videos.push(entry.into_path());
        }
    }

    videos.sort();
    tracing::debug!("Found {} video files in {}", videos.len(), root.display());
    Ok(videos)
}

/// Guess a movie title from a file name without extension.
///
/// Release tags and quality markers follow the first dot, so the first
/// non-empty dot-separated segment is taken as the title.
pub fn guess_title(file_stem: &str) -> String {
    file_stem
        .split('.')
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Title heuristic applied to a full video path.
pub fn guess_title_from_path(video: &Path) -> String {
    video
        .file_stem()
        .map(|s| guess_title(&s.to_string_lossy()))
        .unwrap_or_default()
}

/// The three enrichment outputs that sit next to a video file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// `<basename>-poster.jpg`
    pub poster: PathBuf,
    /// `<basename>-fanart.jpg`
    pub fanart: PathBuf,
    /// `<basename>.nfo`
    pub sidecar: PathBuf,
}

impl ArtifactPaths {
    /// Derive artifact paths for a video. Pure; touches no disk.
    pub fn for_video(video: &Path) -> Self {
        let dir = video.parent().unwrap_or_else(|| Path::new(""));
        let base = video
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            poster: dir.join(format!("{}-poster.jpg", base)),
            fanart: dir.join(format!("{}-fanart.jpg", base)),
            sidecar: dir.join(format!("{}.nfo", base)),
        }
    }

    /// Stat the artifacts on disk.
    pub fn presence(&self) -> ArtifactPresence {
        ArtifactPresence {
            poster: self.poster.is_file(),
            fanart: self.fanart.is_file(),
            sidecar: self.sidecar.is_file(),
        }
    }
}
