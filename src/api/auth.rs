use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{require_client_id, ApiError, ApiResult};
use crate::cloud::AuthUser;
use crate::middleware::ClientId;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct IdpSignInRequest {
    pub provider_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl From<&AuthUser> for UserResponse {
    fn from(user: &AuthUser) -> Self {
        Self {
            uid: user.uid.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            photo_url: user.photo_url.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

pub async fn sign_up(
    State(state): State<AppState>,
    client: Option<Extension<ClientId>>,
    Json(request): Json<SignUpRequest>,
) -> ApiResult<Json<UserResponse>> {
    let client_id = require_client_id(&client)?;

    if request.email.trim().is_empty()
        || request.password.is_empty()
        || request.display_name.trim().is_empty()
    {
        return Err(ApiError::BadRequest(
            "email, password and display name are required".into(),
        ));
    }

    let user = state
        .identity
        .sign_up(
            request.email.trim(),
            &request.password,
            request.display_name.trim(),
        )
        .await?;

    let response = UserResponse::from(&user);
    let session = state.sessions.get_or_create(&client_id).await;
    session.sign_in(user).await;

    Ok(Json(response))
}

pub async fn sign_in(
    State(state): State<AppState>,
    client: Option<Extension<ClientId>>,
    Json(request): Json<SignInRequest>,
) -> ApiResult<Json<UserResponse>> {
    let client_id = require_client_id(&client)?;

    let user = state
        .identity
        .sign_in(request.email.trim(), &request.password)
        .await?;

    let response = UserResponse::from(&user);
    let session = state.sessions.get_or_create(&client_id).await;
    session.sign_in(user).await;

    Ok(Json(response))
}

pub async fn sign_in_idp(
    State(state): State<AppState>,
    client: Option<Extension<ClientId>>,
    Json(request): Json<IdpSignInRequest>,
) -> ApiResult<Json<UserResponse>> {
    let client_id = require_client_id(&client)?;

    let user = state
        .identity
        .sign_in_with_idp(&request.provider_token)
        .await?;

    let response = UserResponse::from(&user);
    let session = state.sessions.get_or_create(&client_id).await;
    session.sign_in(user).await;

    Ok(Json(response))
}

pub async fn sign_out(
    State(state): State<AppState>,
    client: Option<Extension<ClientId>>,
) -> ApiResult<StatusCode> {
    let client_id = require_client_id(&client)?;

    let session = state.sessions.get_or_create(&client_id).await;
    session.sign_out().await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_session(
    State(state): State<AppState>,
    client: Option<Extension<ClientId>>,
) -> ApiResult<Json<SessionResponse>> {
    let client_id = require_client_id(&client)?;

    let session = state.sessions.get_or_create(&client_id).await;
    let current = session.session();

    Ok(Json(SessionResponse {
        authenticated: current.is_authenticated(),
        user: current.user().map(UserResponse::from),
    }))
}

/// Delete the signed-in account: the user's favorites collection first, then
/// the identity record. The provider rejects the identity deletion when the
/// sign-in is stale; that surfaces as a retryable 401 asking the user to
/// sign in again.
pub async fn delete_account(
    State(state): State<AppState>,
    client: Option<Extension<ClientId>>,
) -> ApiResult<StatusCode> {
    let client_id = require_client_id(&client)?;

    let session = state.sessions.get_or_create(&client_id).await;
    let user = session
        .session()
        .user()
        .cloned()
        .ok_or(ApiError::NotSignedIn)?;

    state.store.clear(&user).await?;
    state.identity.delete_account(&user.id_token).await?;
    info!(uid = %user.uid, "account deleted");

    session.sign_out().await;
    Ok(StatusCode::NO_CONTENT)
}
