//! TMDB API client.

use crate::models::config::TmdbConfig;
use crate::models::media::{ExternalId, MediaKind, MetadataQuery, ResolvedMetadata};
use crate::services::resolver::MetadataResolver;
use crate::Result;
use serde::Deserialize;
use std::future::Future;

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

/// TMDB API client.
pub struct TmdbClient {
    api_key: String,
    language: String,
    /// Whether to use Bearer token authentication (API v4 style)
    use_bearer: bool,
    client: reqwest::Client,
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
    pub original_title: String,
    pub release_date: Option<String>,
    pub vote_count: Option<u32>,
}

/// TV show search result.
#[derive(Debug, Deserialize)]
pub struct TvSearchResult {
    pub results: Vec<TvSearchItem>,
}

/// TV show search item.
#[derive(Debug, Deserialize)]
pub struct TvSearchItem {
    pub id: u64,
    pub name: String,
    pub original_name: String,
    pub first_air_date: Option<String>,
}

/// Year of a TMDB `YYYY-MM-DD` date.
fn date_year(date: Option<&str>) -> Option<u16> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

/// Confidence that a hit is the queried title: exact year match is best.
fn hit_confidence(query_year: Option<u16>, hit_year: Option<u16>) -> f32 {
    match (query_year, hit_year) {
        (Some(q), Some(h)) if q == h => 1.0,
        (None, _) => 0.8,
        _ => 0.5,
    }
}

impl TmdbClient {
    /// Create a new TMDB client.
    ///
    /// Bearer tokens start with "eyJ" (base64 encoded JWT header).
    pub fn new(api_key: String, language: String) -> Self {
        let use_bearer = api_key.starts_with("eyJ");
        Self {
            api_key,
            language,
            use_bearer,
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from configuration. Fails when no key is set.
    pub fn from_config(config: &TmdbConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| crate::Error::InvalidConfig("TMDB_API_KEY is not set".to_string()))?;
        Ok(Self::new(api_key, config.language.clone()))
    }

    /// Build a request with proper authentication.
    fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        if self.use_bearer {
            request.header("Authorization", format!("Bearer {}", self.api_key))
        } else {
            request
        }
    }

    /// Build URL with optional api_key parameter (only for v3 style).
    fn build_url(&self, path: &str, extra_params: &str) -> String {
        if self.use_bearer {
            format!(
                "{}/{}?language={}{}",
                TMDB_BASE_URL, path, self.language, extra_params
            )
        } else {
            format!(
                "{}/{}?api_key={}&language={}{}",
                TMDB_BASE_URL, path, self.api_key, self.language, extra_params
            )
        }
    }

    /// Search for movies.
    pub async fn search_movie(
        &self,
        query: &str,
        year: Option<u16>,
    ) -> Result<Vec<MovieSearchItem>> {
        let year_param = year.map(|y| format!("&year={}", y)).unwrap_or_default();
        let url = self.build_url(
            "search/movie",
            &format!("&query={}{}", urlencoding::encode(query), year_param),
        );

        let resp: MovieSearchResult = self
            .build_request(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.results)
    }

    /// Search for TV shows.
    pub async fn search_tv(&self, query: &str, year: Option<u16>) -> Result<Vec<TvSearchItem>> {
        let year_param = year
            .map(|y| format!("&first_air_date_year={}", y))
            .unwrap_or_default();
        let url = self.build_url(
            "search/tv",
            &format!("&query={}{}", urlencoding::encode(query), year_param),
        );

        let resp: TvSearchResult = self
            .build_request(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.results)
    }

    /// Resolve a query to the first matching search hit.
    pub async fn lookup(&self, query: &MetadataQuery) -> Result<Option<ResolvedMetadata>> {
        tracing::debug!("TMDB lookup: {} {:?} ({})", query.title, query.year, query.kind);

        let resolved = match query.kind {
            MediaKind::Movie => {
                let results = self.search_movie(&query.title, query.year).await?;
                results.into_iter().next().map(|hit| {
                    let year = date_year(hit.release_date.as_deref());
                    ResolvedMetadata {
                        title: hit.title,
                        year,
                        external_id: ExternalId::Tmdb(hit.id),
                        kind_confidence: hit_confidence(query.year, year),
                    }
                })
            }
            MediaKind::Series => {
                let results = self.search_tv(&query.title, query.year).await?;
                results.into_iter().next().map(|hit| {
                    let year = date_year(hit.first_air_date.as_deref());
                    ResolvedMetadata {
                        title: hit.name,
                        year,
                        external_id: ExternalId::Tmdb(hit.id),
                        kind_confidence: hit_confidence(query.year, year),
                    }
                })
            }
        };

        Ok(resolved)
    }
}

impl MetadataResolver for TmdbClient {
    fn resolve(
        &self,
        query: &MetadataQuery,
    ) -> impl Future<Output = Result<Option<ResolvedMetadata>>> + Send {
        self.lookup(query)
    }
}
