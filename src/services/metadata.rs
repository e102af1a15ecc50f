//! Remote metadata resolution and sidecar I/O.
//!
//! [`MetadataClient`] is the seam the coordinator talks to. The TMDB
//! implementation resolves a title through search + details and downloads
//! artwork with a bounded, cancellable retry loop.

use crate::generators::nfo::{generate_movie_nfo, parse_movie_nfo};
use crate::models::config::SettingsStore;
use crate::models::media::MovieRecord;
use crate::services::tmdb::{TmdbClient, TmdbConfig};
use crate::utils::fs::write_file;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Resolves movie metadata and fetches artwork.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// Search by title, take the top hit and return its full details.
    ///
    /// Fails with [`Error::MovieNotFound`] when the search has no results.
    async fn fetch_metadata(&self, title: &str, cancel: &CancellationToken) -> Result<MovieRecord>;

    /// Download an artwork file.
    async fn download_asset(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>>;
}

/// Retry schedule for downloads.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based): base, 2x base, 4x base...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Run `fut` unless `cancel` fires first.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        res = fut => res,
    }
}

/// TMDB backed [`MetadataClient`].
///
/// Credentials are read from the settings store on every lookup, so keys
/// saved through the API apply to the next file processed.
#[derive(Debug, Clone)]
pub struct TmdbMetadataClient {
    settings: Arc<SettingsStore>,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl TmdbMetadataClient {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        Self {
            settings,
            http: reqwest::Client::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// TMDB client for the current credentials.
    fn tmdb(&self) -> Result<TmdbClient> {
        let config = TmdbConfig::from_settings(&self.settings.tmdb())?;
        Ok(TmdbClient::new(config, self.http.clone()))
    }

    /// Override the download retry schedule.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn download_once(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::TmdbRequest {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl MetadataClient for TmdbMetadataClient {
    async fn fetch_metadata(&self, title: &str, cancel: &CancellationToken) -> Result<MovieRecord> {
        let tmdb = self.tmdb()?;
        tracing::debug!("Searching TMDB for: {}", title);
        let results = cancellable(cancel, tmdb.search_movie(title)).await?;

        let top = results
            .into_iter()
            .next()
            .ok_or_else(|| Error::MovieNotFound(title.to_string()))?;
        tracing::debug!("Top TMDB match for '{}': {} ({})", title, top.title, top.id);

        let details = cancellable(cancel, tmdb.get_movie_details(top.id)).await?;
        Ok(tmdb.to_movie_record(details))
    }

    async fn download_asset(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match cancellable(cancel, self.download_once(url)).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    tracing::warn!(
                        "Download attempt {}/{} failed for {}: {}, retrying in {:?}",
                        attempt,
                        self.retry.max_attempts,
                        url,
                        e,
                        delay
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    return Err(Error::DownloadFailed {
                        url: url.to_string(),
                        attempts: attempt,
                        reason: e.to_string(),
                    })
                }
            }
        }
    }
}

/// Write the sidecar for `movie` to `destination`.
pub async fn write_sidecar(movie: &MovieRecord, destination: &Path) -> Result<()> {
    let content = generate_movie_nfo(movie);
    write_file(destination, content.as_bytes()).await?;
    tracing::debug!("Wrote NFO: {}", destination.display());
    Ok(())
}

/// Read a sidecar. Unreadable or unparseable files yield `None`.
pub async fn read_sidecar(path: &Path) -> Option<MovieRecord> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("Failed to read NFO {}: {}", path.display(), e);
            return None;
        }
    };

    let movie = parse_movie_nfo(&content);
    if movie.is_none() {
        tracing::warn!("NFO could not be parsed, ignoring: {}", path.display());
    }
    movie
}
