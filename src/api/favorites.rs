use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use super::{require_client_id, ApiError, ApiResult};
use crate::catalog::Movie;
use crate::middleware::ClientId;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct FavoriteStatus {
    pub favorite: bool,
}

#[derive(Debug, Serialize)]
pub struct AddResponse {
    pub favorite: bool,
    pub nudge_signin: bool,
}

pub async fn list(
    State(state): State<AppState>,
    client: Option<Extension<ClientId>>,
) -> ApiResult<Json<Vec<Movie>>> {
    let client_id = require_client_id(&client)?;

    let session = state.sessions.get_or_create(&client_id).await;
    Ok(Json(session.favorites.favorites().as_ref().clone()))
}

pub async fn status(
    State(state): State<AppState>,
    client: Option<Extension<ClientId>>,
    Path(movie_id): Path<i64>,
) -> ApiResult<Json<FavoriteStatus>> {
    let client_id = require_client_id(&client)?;

    let session = state.sessions.get_or_create(&client_id).await;
    Ok(Json(FavoriteStatus {
        favorite: session.favorites.is_favorite(movie_id),
    }))
}

pub async fn add(
    State(state): State<AppState>,
    client: Option<Extension<ClientId>>,
    Path(movie_id): Path<i64>,
    Json(movie): Json<Movie>,
) -> ApiResult<Json<AddResponse>> {
    let client_id = require_client_id(&client)?;

    if movie.id != movie_id {
        return Err(ApiError::BadRequest(
            "movie id in path and body do not match".into(),
        ));
    }

    let session = state.sessions.get_or_create(&client_id).await;
    let outcome = session.favorites.add(movie).await;

    Ok(Json(AddResponse {
        favorite: outcome.favorite,
        nudge_signin: outcome.nudge_signin,
    }))
}

pub async fn remove(
    State(state): State<AppState>,
    client: Option<Extension<ClientId>>,
    Path(movie_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let client_id = require_client_id(&client)?;

    let session = state.sessions.get_or_create(&client_id).await;
    session.favorites.remove(movie_id).await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn dismiss_nudge(
    State(state): State<AppState>,
    client: Option<Extension<ClientId>>,
) -> ApiResult<StatusCode> {
    let client_id = require_client_id(&client)?;

    let session = state.sessions.get_or_create(&client_id).await;
    session.favorites.dismiss_nudge();

    Ok(StatusCode::NO_CONTENT)
}
