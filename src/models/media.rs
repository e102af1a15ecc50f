//! Media-related data models.

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::path::{Path, PathBuf};

/// Processing status of a library file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaStatus {
    Pending,
    Scanning,
    Downloading,
    Completed,
    Error,
}

impl MediaStatus {
    /// Whether a pipeline is actively working on the file.
    pub fn is_active(&self) -> bool {
        matches!(self, MediaStatus::Scanning | MediaStatus::Downloading)
    }
}

impl std::fmt::Display for MediaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MediaStatus::Pending => "pending",
            MediaStatus::Scanning => "scanning",
            MediaStatus::Downloading => "downloading",
            MediaStatus::Completed => "completed",
            MediaStatus::Error => "error",
        };
        f.pad(name)
    }
}

/// Fine-grained progress marker shown next to the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcessingStage {
    /// Identifying the file and resolving its title.
    Scanning,
    /// Resolving metadata and writing the NFO sidecar.
    WritingSidecar,
    /// Downloading the poster.
    FetchingPoster,
    /// Downloading the fanart/backdrop.
    FetchingFanart,
    /// Nothing in progress.
    #[serde(rename = "none")]
    Idle,
}

/// Which of the three enrichment artifacts exist on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtifactPresence {
    pub poster: bool,
    pub fanart: bool,
    pub sidecar: bool,
}

impl ArtifactPresence {
    /// All three artifacts exist.
    pub fn is_complete(&self) -> bool {
        self.poster && self.fanart && self.sidecar
    }

    /// Names of the missing artifacts, comma separated.
    pub fn missing(&self) -> String {
        let mut missing = Vec::new();
        if !self.poster {
            missing.push("poster");
        }
        if !self.fanart {
            missing.push("fanart");
        }
        if !self.sidecar {
            missing.push("nfo");
        }
        missing.join(", ")
    }
}

/// One discovered video file and everything known about it.
///
/// Records are plain values: the store keeps the committed copy and every
/// transition publishes a fresh snapshot. On the wire the artifact flags
/// (`hasPoster`, `hasFanart`, `hasNfo`, `isMetadataComplete`) are derived
/// from the paths.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    /// Opaque identifier, stable for the record's lifetime.
    pub id: String,
    /// Absolute path to the video; the natural key.
    pub path: PathBuf,
    /// File name including extension.
    pub file_name: String,
    /// File size in bytes at discovery time.
    pub size: u64,
    pub status: MediaStatus,
    pub processing_stage: ProcessingStage,
    pub title: Option<String>,
    pub year: Option<u16>,
    pub poster_path: Option<PathBuf>,
    pub fanart_path: Option<PathBuf>,
    pub sidecar_path: Option<PathBuf>,
    /// When the file was last fully enriched.
    pub last_enriched: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl MediaRecord {
    /// Create a pending record for a path.
    pub fn new(path: &Path, size: u64) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            path: path.to_path_buf(),
            file_name,
            size,
            status: MediaStatus::Pending,
            processing_stage: ProcessingStage::Idle,
            title: None,
            year: None,
            poster_path: None,
            fanart_path: None,
            sidecar_path: None,
            last_enriched: None,
            error_message: None,
        }
    }

    /// Poster, fanart and sidecar are all recorded as present.
    pub fn is_metadata_complete(&self) -> bool {
        self.poster_path.is_some() && self.fanart_path.is_some() && self.sidecar_path.is_some()
    }

    /// Whether the record can skip the pipeline: completed, all artifacts
    /// present and the source not modified since the last enrichment.
    pub fn is_up_to_date(&self, source_modified: Option<DateTime<Utc>>) -> bool {
        if self.status != MediaStatus::Completed || !self.is_metadata_complete() {
            return false;
        }
        match (self.last_enriched, source_modified) {
            (Some(enriched), Some(modified)) => modified <= enriched,
            _ => false,
        }
    }

    /// Move into an active status. Clears any previous error.
    pub fn begin(&mut self, status: MediaStatus, stage: ProcessingStage) {
        self.status = status;
        self.processing_stage = stage;
        self.error_message = None;
    }

    /// Mark the record as fully enriched now.
    pub fn complete(&mut self, title: Option<String>, year: Option<u16>) {
        self.status = MediaStatus::Completed;
        self.processing_stage = ProcessingStage::Idle;
        if title.is_some() {
            self.title = title;
        }
        if year.is_some() {
            self.year = year;
        }
        self.last_enriched = Some(Utc::now());
        self.error_message = None;
    }

    /// Mark the record as failed.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = MediaStatus::Error;
        self.processing_stage = ProcessingStage::Idle;
        self.error_message = Some(message.into());
    }
}

impl Serialize for MediaRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("MediaRecord", 17)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("path", &self.path)?;
        state.serialize_field("fileName", &self.file_name)?;
        state.serialize_field("size", &self.size)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("processingStage", &self.processing_stage)?;
        state.serialize_field("title", &self.title)?;
        state.serialize_field("year", &self.year)?;
        state.serialize_field("posterPath", &self.poster_path)?;
        state.serialize_field("fanartPath", &self.fanart_path)?;
        state.serialize_field("sidecarPath", &self.sidecar_path)?;
        state.serialize_field("hasPoster", &self.poster_path.is_some())?;
        state.serialize_field("hasFanart", &self.fanart_path.is_some())?;
        state.serialize_field("hasNfo", &self.sidecar_path.is_some())?;
        state.serialize_field("isMetadataComplete", &self.is_metadata_complete())?;
        state.serialize_field("lastEnriched", &self.last_enriched)?;
        state.serialize_field("errorMessage", &self.error_message)?;
        state.end()
    }
}

/// Artwork references of a movie.
///
/// Remote URLs come from TMDB; local paths replace them in the sidecar once
/// the files are downloaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Art {
    pub poster: Option<String>,
    pub fanart: Option<String>,
    pub local_poster: Option<PathBuf>,
    pub local_fanart: Option<PathBuf>,
}

/// Canonical movie metadata, as resolved from TMDB or read from a sidecar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    /// TMDB ID.
    pub tmdb_id: Option<u64>,
    /// Localized title.
    pub title: String,
    /// Original title.
    pub original_title: Option<String>,
    /// Release year.
    pub year: Option<u16>,
    /// Full release date (YYYY-MM-DD).
    pub premiered: Option<String>,
    /// Overview/synopsis.
    pub plot: Option<String>,
    /// User rating (0-10).
    pub rating: Option<f32>,
    /// Vote count.
    pub votes: Option<u32>,
    pub genres: Vec<String>,
    pub directors: Vec<String>,
    pub art: Art,
}

/// Parse the year out of a `YYYY-MM-DD` release date.
pub fn year_from_date(date: &str) -> Option<u16> {
    date.get(..4).and_then(|y| y.parse().ok())
}
