use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::*;
use crate::config::CatalogConfig;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Client for the movie catalog API. Stateless: every call builds a query,
/// hits the network, and parses the payload. No retries, no caching.
#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> CatalogResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> CatalogResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "catalog request");

        let response = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status { status, body });
        }

        Ok(response.json::<T>().await?)
    }

    pub async fn popular(&self, page: u32) -> CatalogResult<Page<Movie>> {
        self.get_json("/movie/popular", &[("page", page.to_string())])
            .await
    }

    pub async fn search(&self, query: &str, page: u32) -> CatalogResult<Page<Movie>> {
        self.get_json(
            "/search/movie",
            &[("query", query.to_string()), ("page", page.to_string())],
        )
        .await
    }

    /// Details by id with videos, credits, images and release dates appended
    /// in the same request.
    pub async fn details(&self, id: i64) -> CatalogResult<MovieDetails> {
        self.get_json(
            &format!("/movie/{}", id),
            &[(
                "append_to_response",
                "videos,credits,images,release_dates".to_string(),
            )],
        )
        .await
    }

    pub async fn similar(&self, id: i64, page: u32) -> CatalogResult<Page<Movie>> {
        self.get_json(
            &format!("/movie/{}/similar", id),
            &[("page", page.to_string())],
        )
        .await
    }

    /// Watch providers for one region. Upstream returns every region at once;
    /// the region sub-field is extracted here.
    pub async fn watch_providers(
        &self,
        id: i64,
        region: &str,
    ) -> CatalogResult<Option<RegionProviders>> {
        let mut result: WatchProvidersResult = self
            .get_json(&format!("/movie/{}/watch/providers", id), &[])
            .await?;
        Ok(result.results.remove(region))
    }

    pub async fn genres(&self) -> CatalogResult<Vec<Genre>> {
        let list: GenreList = self.get_json("/genre/movie/list", &[]).await?;
        Ok(list.genres)
    }

    /// Discovery by genre, most popular first.
    pub async fn discover_by_genres(
        &self,
        genre_ids: &[i64],
        page: u32,
    ) -> CatalogResult<Page<Movie>> {
        self.get_json(
            "/discover/movie",
            &[
                ("with_genres", join_genre_ids(genre_ids)),
                ("sort_by", "popularity.desc".to_string()),
                ("page", page.to_string()),
            ],
        )
        .await
    }
}

fn join_genre_ids(genre_ids: &[i64]) -> String {
    genre_ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
