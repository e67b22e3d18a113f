pub mod auth;
pub mod favorites;
pub mod movies;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::json;

use crate::catalog::CatalogError;
use crate::cloud::{AuthError, StoreError};
use crate::middleware::ClientId;

/// Errors surfaced to the web UI. Every gateway failure is converted to a
/// display string here; nothing propagates further up.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("failed to load from catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("cloud store error: {0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    BadRequest(String),
    #[error("not signed in")]
    NotSignedIn,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Catalog(_) | ApiError::Store(_) => StatusCode::BAD_GATEWAY,
            ApiError::Auth(AuthError::RequiresRecentLogin) => StatusCode::UNAUTHORIZED,
            ApiError::Auth(AuthError::Provider(_)) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::BAD_GATEWAY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotSignedIn => StatusCode::UNAUTHORIZED,
        };

        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// The favorites and auth endpoints are per-client; the browser identifies
/// itself with a stable x-client-id header.
pub(crate) fn require_client_id(client: &Option<Extension<ClientId>>) -> ApiResult<String> {
    client
        .as_ref()
        .map(|Extension(ClientId(id))| id.clone())
        .ok_or_else(|| ApiError::BadRequest("missing x-client-id header".to_string()))
}
