use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum::Json;
use serde::Deserialize;

use super::{ApiError, ApiResult};
use crate::catalog::images;
use crate::catalog::{Genre, Movie, MovieDetails, Page, RegionProviders};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DiscoverQuery {
    pub genres: String,
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RegionQuery {
    pub region: Option<String>,
}

pub async fn popular(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Json<Page<Movie>>> {
    Ok(Json(state.catalog.popular(params.page.unwrap_or(1)).await?))
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Json<Page<Movie>>> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("search query cannot be empty".into()));
    }
    Ok(Json(
        state.catalog.search(query, params.page.unwrap_or(1)).await?,
    ))
}

pub async fn details(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MovieDetails>> {
    Ok(Json(state.catalog.details(id).await?))
}

pub async fn similar(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Json<Page<Movie>>> {
    Ok(Json(
        state.catalog.similar(id, params.page.unwrap_or(1)).await?,
    ))
}

pub async fn watch_providers(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<RegionQuery>,
) -> ApiResult<Json<Option<RegionProviders>>> {
    let region = params
        .region
        .unwrap_or_else(|| state.config.catalog.region.clone());
    Ok(Json(state.catalog.watch_providers(id, &region).await?))
}

pub async fn genres(State(state): State<AppState>) -> ApiResult<Json<Vec<Genre>>> {
    Ok(Json(state.catalog.genres().await?))
}

pub async fn discover(
    State(state): State<AppState>,
    Query(params): Query<DiscoverQuery>,
) -> ApiResult<Json<Page<Movie>>> {
    let genre_ids = parse_genre_ids(&params.genres)?;
    Ok(Json(
        state
            .catalog
            .discover_by_genres(&genre_ids, params.page.unwrap_or(1))
            .await?,
    ))
}

/// Redirect to the CDN-composed image URL so the UI never needs the CDN
/// base or size list.
pub async fn image(
    State(state): State<AppState>,
    Path((size, path)): Path<(String, String)>,
) -> ApiResult<Redirect> {
    if !images::valid_size(&size) {
        return Err(ApiError::BadRequest(format!("unknown image size: {size}")));
    }
    let url = images::image_url(&state.config.catalog.image_base_url, &size, &path);
    Ok(Redirect::temporary(&url))
}

fn parse_genre_ids(raw: &str) -> ApiResult<Vec<i64>> {
    let ids = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>())
        .collect::<Result<Vec<i64>, _>>()
        .map_err(|_| ApiError::BadRequest("invalid genres parameter".into()))?;

    if ids.is_empty() {
        return Err(ApiError::BadRequest("genres parameter is required".into()));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_genre_ids() {
        assert_eq!(parse_genre_ids("28,12").unwrap(), vec![28, 12]);
        assert_eq!(parse_genre_ids(" 18 ").unwrap(), vec![18]);
        assert!(parse_genre_ids("").is_err());
        assert!(parse_genre_ids("drama").is_err());
    }
}
