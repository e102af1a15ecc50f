//! In-memory media record store.
//!
//! The store is the single source of truth for what the rest of the system
//! reports. Records are keyed by absolute path and replaced whole, so a
//! reader never sees a half-applied transition.

use crate::core::scanner::ArtifactPaths;
use crate::generators::nfo::parse_movie_nfo;
use crate::models::media::{ArtifactPresence, MediaRecord, MediaStatus};
use crate::utils::fs::modified_time;
use crate::Result;
use dashmap::{DashMap, DashSet};
use std::path::{Path, PathBuf};

/// Concurrent map from video path to its record.
#[derive(Debug, Default)]
pub struct MediaRecordStore {
    records: DashMap<PathBuf, MediaRecord>,
    in_flight: DashSet<PathBuf>,
}

/// Marks a path as owned by one running pipeline; released on drop.
#[derive(Debug)]
pub struct PipelineGuard<'a> {
    in_flight: &'a DashSet<PathBuf>,
    path: PathBuf,
}

impl Drop for PipelineGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.path);
    }
}

impl MediaRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for its path.
    pub fn upsert(&self, record: MediaRecord) {
        tracing::debug!(path = %record.path.display(), status = %record.status, "Record updated");
        self.records.insert(record.path.clone(), record);
    }

    pub fn get(&self, path: &Path) -> Option<MediaRecord> {
        self.records.get(path).map(|r| r.value().clone())
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    /// Snapshot of every record, sorted by path.
    pub fn all(&self) -> Vec<MediaRecord> {
        let mut records: Vec<MediaRecord> = self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Add a record for a never-seen path.
    ///
    /// Returns the new record, or `None` when the path is already known
    /// (the existing record is left untouched).
    pub fn seed(&self, path: &Path) -> Result<Option<MediaRecord>> {
        if self.exists(path) {
            return Ok(None);
        }

        let record = build_seed_record(path)?;
        match self.records.entry(path.to_path_buf()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(None),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(Some(record))
            }
        }
    }

    /// Re-stat the artifacts of a known record.
    ///
    /// Promotes the record to Completed when all three artifacts now exist
    /// and the sidecar parses, e.g. after they were produced by another
    /// tool. Returns the refreshed snapshot, or `None` for unknown paths and
    /// paths a running pipeline owns.
    pub fn refresh_resource_flags(&self, path: &Path) -> Option<MediaRecord> {
        let Some(_guard) = self.try_begin(path) else {
            tracing::debug!("Pipeline running, not refreshing: {}", path.display());
            return None;
        };

        let artifacts = ArtifactPaths::for_video(path);
        let presence = artifacts.presence();
        let trusted = presence.is_complete() && sidecar_parses(&artifacts.sidecar);

        let mut entry = self.records.get_mut(path)?;
        let record = entry.value_mut();
        apply_presence(record, &artifacts, presence);

        if trusted && record.status != MediaStatus::Completed {
            tracing::info!(
                "Metadata for {} is complete on disk, marking as completed",
                path.display()
            );
            record.status = MediaStatus::Completed;
            record.error_message = None;
            if record.last_enriched.is_none() {
                record.last_enriched = modified_time(&artifacts.sidecar);
            }
        }

        Some(record.clone())
    }

    /// Claim exclusive pipeline ownership of `path`.
    ///
    /// Returns `None` when another pipeline already runs for the path.
    pub fn try_begin(&self, path: &Path) -> Option<PipelineGuard<'_>> {
        if self.in_flight.insert(path.to_path_buf()) {
            Some(PipelineGuard {
                in_flight: &self.in_flight,
                path: path.to_path_buf(),
            })
        } else {
            None
        }
    }

    /// Whether a pipeline currently owns `path`.
    pub fn is_in_flight(&self, path: &Path) -> bool {
        self.in_flight.contains(path)
    }
}

/// Record artifact paths only for files that exist.
pub fn apply_presence(record: &mut MediaRecord, artifacts: &ArtifactPaths, presence: ArtifactPresence) {
    record.poster_path = presence.poster.then(|| artifacts.poster.clone());
    record.fanart_path = presence.fanart.then(|| artifacts.fanart.clone());
    record.sidecar_path = presence.sidecar.then(|| artifacts.sidecar.clone());
}

fn sidecar_parses(sidecar: &Path) -> bool {
    std::fs::read_to_string(sidecar)
        .map(|content| parse_movie_nfo(&content).is_some())
        .unwrap_or(false)
}

/// Build the initial record for a path from what is already on disk.
fn build_seed_record(path: &Path) -> Result<MediaRecord> {
    let metadata = std::fs::metadata(path)?;
    let artifacts = ArtifactPaths::for_video(path);
    let presence = artifacts.presence();

    let mut record = MediaRecord::new(path, metadata.len());
    apply_presence(&mut record, &artifacts, presence);

    if presence.sidecar {
        match std::fs::read_to_string(&artifacts.sidecar) {
            Ok(content) => match parse_movie_nfo(&content) {
                Some(movie) => {
                    record.title = Some(movie.title);
                    record.year = movie.year;
                    record.status = MediaStatus::Completed;
                    record.last_enriched = modified_time(&artifacts.sidecar);
                }
                None => tracing::warn!(
                    "Existing NFO could not be parsed: {}",
                    artifacts.sidecar.display()
                ),
            },
            Err(e) => tracing::warn!(
                "Failed to read existing NFO {}: {}",
                artifacts.sidecar.display(),
                e
            ),
        }
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_on_drop() {
        let store = MediaRecordStore::new();
        let path = Path::new("/movies/a.mkv");

        let guard = store.try_begin(path).unwrap();
        assert!(store.is_in_flight(path));
        assert!(store.try_begin(path).is_none());

        drop(guard);
        assert!(!store.is_in_flight(path));
        assert!(store.try_begin(path).is_some());
    }

    #[test]
    fn test_refresh_skips_in_flight_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let video = dir.path().join("Heat.1995.mkv");
        std::fs::write(&video, "fake").unwrap();
        let store = MediaRecordStore::new();
        store.seed(&video).unwrap();

        let artifacts = ArtifactPaths::for_video(&video);
        std::fs::write(&artifacts.poster, "jpg").unwrap();
        std::fs::write(&artifacts.fanart, "jpg").unwrap();
        std::fs::write(&artifacts.sidecar, "<movie><title>Heat</title></movie>").unwrap();

        let guard = store.try_begin(&video).unwrap();
        assert!(store.refresh_resource_flags(&video).is_none());
        assert_eq!(store.get(&video).unwrap().status, MediaStatus::Pending);
        assert!(store.is_in_flight(&video));

        drop(guard);
        let record = store.refresh_resource_flags(&video).unwrap();
        assert_eq!(record.status, MediaStatus::Completed);
        assert!(!store.is_in_flight(&video));
    }

    #[test]
    fn test_refresh_does_not_trust_corrupt_sidecar() {
        let dir = tempfile::TempDir::new().unwrap();
        let video = dir.path().join("Heat.1995.mkv");
        std::fs::write(&video, "fake").unwrap();
        let store = MediaRecordStore::new();
        store.seed(&video).unwrap();

        let artifacts = ArtifactPaths::for_video(&video);
        std::fs::write(&artifacts.poster, "jpg").unwrap();
        std::fs::write(&artifacts.fanart, "jpg").unwrap();
        std::fs::write(&artifacts.sidecar, "<movie><title>trunc").unwrap();

        let record = store.refresh_resource_flags(&video).unwrap();
        assert_eq!(record.status, MediaStatus::Pending);
        assert!(record.last_enriched.is_none());
        assert!(record.sidecar_path.is_some());
    }

    #[test]
    fn test_upsert_replaces_by_path() {
        let store = MediaRecordStore::new();
        let mut record = MediaRecord::new(Path::new("/movies/a.mkv"), 1);
        store.upsert(record.clone());

        record.title = Some("A".to_string());
        store.upsert(record);

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get(Path::new("/movies/a.mkv")).unwrap().title.as_deref(),
            Some("A")
        );
    }

    #[test]
    fn test_all_is_sorted_snapshot() {
        let store = MediaRecordStore::new();
        store.upsert(MediaRecord::new(Path::new("/m/b.mkv"), 1));
        store.upsert(MediaRecord::new(Path::new("/m/a.mkv"), 1));

        let snapshot = store.all();
        store.upsert(MediaRecord::new(Path::new("/m/c.mkv"), 1));

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].path, PathBuf::from("/m/a.mkv"));
    }
}
