//! Error types for the media library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the media library.
#[derive(Error, Debug)]
pub enum Error {
    // Credential errors
    #[error("TMDB API key not configured. Set TMDB_API_KEY or tmdb.api_key in settings.toml")]
    TmdbApiKeyMissing,

    #[error("TMDB API key invalid")]
    TmdbApiKeyInvalid,

    // File system errors
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Cannot read library path {path}: {reason}")]
    LibraryRootUnreadable { path: String, reason: String },

    // TMDB errors
    #[error("Movie not found on TMDB: {0}")]
    MovieNotFound(String),

    #[error("TMDB request failed with status {status}: {url}")]
    TmdbRequest { status: u16, url: String },

    // Artwork errors
    #[error("Download failed after {attempts} attempt(s): {url}: {reason}")]
    DownloadFailed {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("Metadata incomplete for {path}: missing {missing}")]
    MetadataIncomplete { path: String, missing: String },

    // Scan control
    #[error("Operation cancelled")]
    Cancelled,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Whether this error is a cooperative cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Covers network-level failures, throttling and server errors, and
    /// local I/O errors other than missing paths or permissions.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(e) => {
                if let Some(status) = e.status() {
                    return is_transient_status(status.as_u16());
                }
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            Error::TmdbRequest { status, .. } => is_transient_status(*status),
            Error::Io(e) => !matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
            ),
            _ => false,
        }
    }
}

/// Server errors and throttling are worth another attempt; other statuses are not.
fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}
