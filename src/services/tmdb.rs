//! TMDB API client.

use crate::models::config::TmdbSettings;
use crate::models::media::{year_from_date, Art, MovieRecord};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// TMDB client configuration.
#[derive(Debug, Clone)]
pub struct TmdbConfig {
    /// API key or Bearer token (JWT)
    pub api_key: String,
    pub language: String,
    /// Whether to use Bearer token authentication (API v4 style)
    pub use_bearer: bool,
    /// API root, without trailing slash.
    pub api_base_url: String,
    /// Prefix prepended to image paths.
    pub image_base_url: String,
}

impl TmdbConfig {
    /// Create config from settings.
    /// Supports both API key (v3) and Bearer token (v4) formats.
    pub fn from_settings(settings: &TmdbSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(crate::Error::TmdbApiKeyMissing)?;

        // Bearer tokens start with "eyJ" (base64 encoded JWT header)
        let use_bearer = api_key.starts_with("eyJ");

        Ok(Self {
            api_key,
            language: settings.language.clone(),
            use_bearer,
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            image_base_url: settings.image_base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Movie search result.
#[derive(Debug, Deserialize)]
pub struct MovieSearchResult {
    pub results: Vec<MovieSearchItem>,
}

/// Movie search item.
#[derive(Debug, Deserialize)]
pub struct MovieSearchItem {
    pub id: u64,
    pub title: String,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
}

/// Movie details.
#[derive(Debug, Deserialize)]
pub struct MovieDetails {
    pub id: u64,
    pub title: String,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub vote_average: Option<f32>,
    pub vote_count: Option<u32>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub genres: Option<Vec<Genre>>,
    pub credits: Option<Credits>,
}

/// Genre.
#[derive(Debug, Deserialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

/// Movie credits.
#[derive(Debug, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

/// Crew member.
#[derive(Debug, Deserialize)]
pub struct CrewMember {
    pub id: u64,
    pub name: String,
    pub job: String,
}

/// TMDB API client.
#[derive(Debug, Clone)]
pub struct TmdbClient {
    config: TmdbConfig,
    client: reqwest::Client,
}

impl TmdbClient {
    /// Create a new TMDB client.
    pub fn new(config: TmdbConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Create a new TMDB client from settings.
    pub fn from_settings(settings: &TmdbSettings) -> Result<Self> {
        Ok(Self::new(
            TmdbConfig::from_settings(settings)?,
            reqwest::Client::new(),
        ))
    }

    /// Build a request with proper authentication.
    fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        if self.config.use_bearer {
            request.header("Authorization", format!("Bearer {}", self.config.api_key))
        } else {
            request
        }
    }

    /// Build URL with optional api_key parameter (only for v3 style).
    fn build_url(&self, path: &str, extra_params: &str) -> String {
        if self.config.use_bearer {
            format!(
                "{}/{}?language={}{}",
                self.config.api_base_url, path, self.config.language, extra_params
            )
        } else {
            format!(
                "{}/{}?api_key={}&language={}{}",
                self.config.api_base_url,
                path,
                self.config.api_key,
                self.config.language,
                extra_params
            )
        }
    }

    /// GET a JSON document, turning non-success statuses into errors.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self.build_request(url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(crate::Error::TmdbApiKeyInvalid);
        }
        if !status.is_success() {
            return Err(crate::Error::TmdbRequest {
                status: status.as_u16(),
                url: redact(url),
            });
        }
        Ok(resp.json().await?)
    }

    /// Verify API key is valid.
    pub async fn verify_api_key(&self) -> Result<bool> {
        let url = self.build_url("authentication", "");
        let resp = self.build_request(&url).send().await?;
        Ok(resp.status().is_success())
    }

    /// Search for movies.
    pub async fn search_movie(&self, query: &str) -> Result<Vec<MovieSearchItem>> {
        let url = self.build_url(
            "search/movie",
            &format!("&query={}", urlencoding::encode(query)),
        );
        let resp: MovieSearchResult = self.get_json(&url).await?;
        Ok(resp.results)
    }

    /// Get movie details with credits.
    pub async fn get_movie_details(&self, movie_id: u64) -> Result<MovieDetails> {
        let url = self.build_url(&format!("movie/{}", movie_id), "&append_to_response=credits");
        self.get_json(&url).await
    }

    /// Full URL of an image path returned by the API.
    pub fn image_url(&self, image_path: &str) -> String {
        format!("{}{}", self.config.image_base_url, image_path)
    }

    /// Map TMDB details into the canonical movie record.
    pub fn to_movie_record(&self, movie: MovieDetails) -> MovieRecord {
        let year = movie.release_date.as_deref().and_then(year_from_date);
        let premiered = movie.release_date.filter(|d| !d.is_empty());

        let directors = movie
            .credits
            .map(|c| {
                c.crew
                    .into_iter()
                    .filter(|m| m.job == "Director")
                    .map(|m| m.name)
                    .collect()
            })
            .unwrap_or_default();

        MovieRecord {
            tmdb_id: Some(movie.id),
            title: movie.title,
            original_title: movie.original_title,
            year,
            premiered,
            plot: movie.overview.filter(|o| !o.is_empty()),
            rating: movie.vote_average,
            votes: movie.vote_count,
            genres: movie
                .genres
                .unwrap_or_default()
                .into_iter()
                .map(|g| g.name)
                .collect(),
            directors,
            art: Art {
                poster: movie.poster_path.map(|p| self.image_url(&p)),
                fanart: movie.backdrop_path.map(|p| self.image_url(&p)),
                local_poster: None,
                local_fanart: None,
            },
        }
    }
}

/// Strip the api_key query parameter before a URL ends up in logs or errors.
pub fn redact(url: &str) -> String {
    match regex::Regex::new(r"api_key=[^&]*") {
        Ok(re) => re.replace(url, "api_key=***").to_string(),
        Err(_) => url.to_string(),
    }
}
