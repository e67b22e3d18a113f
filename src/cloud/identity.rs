use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::info;

use super::types::*;
use crate::config::CloudConfig;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("identity request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("identity service returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("{0}")]
    Provider(String),
    #[error("this operation requires a recent sign-in, please sign in again and retry")]
    RequiresRecentLogin,
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Client for the hosted identity service (Firebase-compatible REST API).
/// The service holds the account records; this client only exchanges
/// credentials for tokens and profile data.
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    api_key: String,
    identity_url: String,
    avatar_base_url: String,
}

impl IdentityClient {
    pub fn new(config: &CloudConfig) -> AuthResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            identity_url: config.identity_url.trim_end_matches('/').to_string(),
            avatar_base_url: config.avatar_base_url.clone(),
        })
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> AuthResult<T> {
        let url = format!("{}/{}?key={}", self.identity_url, endpoint, self.api_key);

        let response = self.http.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_error_body(status, &body));
        }

        Ok(response.json::<T>().await?)
    }

    /// Create an account, then store the display name and a generated
    /// placeholder avatar on the profile.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> AuthResult<AuthUser> {
        let created: TokenResponse = self
            .post_json(
                "accounts:signUp",
                json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        let photo_url = self.avatar_url(display_name);
        let updated: AccountInfo = self
            .post_json(
                "accounts:update",
                json!({
                    "idToken": created.id_token,
                    "displayName": display_name,
                    "photoUrl": photo_url,
                    "returnSecureToken": false,
                }),
            )
            .await?;

        info!(uid = %created.local_id, "account created");

        Ok(AuthUser {
            uid: created.local_id,
            email: updated.email.or(created.email),
            display_name: updated.display_name,
            photo_url: updated.photo_url,
            id_token: created.id_token,
            refresh_token: created.refresh_token,
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthUser> {
        let tokens: TokenResponse = self
            .post_json(
                "accounts:signInWithPassword",
                json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        // The password endpoint does not return the stored photo URL.
        let lookup: LookupResponse = self
            .post_json("accounts:lookup", json!({ "idToken": tokens.id_token }))
            .await?;
        let account = lookup.users.into_iter().next();

        Ok(AuthUser {
            uid: tokens.local_id,
            email: account
                .as_ref()
                .and_then(|a| a.email.clone())
                .or(tokens.email),
            display_name: account
                .as_ref()
                .and_then(|a| a.display_name.clone())
                .or(tokens.display_name),
            photo_url: account.and_then(|a| a.photo_url),
            id_token: tokens.id_token,
            refresh_token: tokens.refresh_token,
        })
    }

    /// Sign in with an OAuth credential obtained by the front-end popup flow.
    pub async fn sign_in_with_idp(&self, provider_token: &str) -> AuthResult<AuthUser> {
        let tokens: TokenResponse = self
            .post_json(
                "accounts:signInWithIdp",
                json!({
                    "postBody": format!("id_token={}&providerId=google.com", provider_token),
                    "requestUri": "http://localhost",
                    "returnSecureToken": true,
                }),
            )
            .await?;

        Ok(AuthUser {
            uid: tokens.local_id,
            email: tokens.email,
            display_name: tokens.display_name,
            photo_url: tokens.photo_url,
            id_token: tokens.id_token,
            refresh_token: tokens.refresh_token,
        })
    }

    /// Delete the identity record. The provider rejects this with a stale
    /// credential unless the sign-in was recent; that case surfaces as
    /// `RequiresRecentLogin` so the caller can ask the user to re-authenticate.
    pub async fn delete_account(&self, id_token: &str) -> AuthResult<()> {
        let _: serde_json::Value = self
            .post_json("accounts:delete", json!({ "idToken": id_token }))
            .await?;
        Ok(())
    }

    fn avatar_url(&self, display_name: &str) -> String {
        format!(
            "{}?name={}&background=random",
            self.avatar_base_url.trim_end_matches('/'),
            urlencoding::encode(display_name)
        )
    }
}

/// Map the provider's error envelope to a user-facing error. Messages may
/// carry a detail suffix after " : " which is not part of the code.
fn map_error_body(status: reqwest::StatusCode, body: &str) -> AuthError {
    let message = match serde_json::from_str::<ProviderErrorBody>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => {
            return AuthError::Status {
                status,
                body: body.to_string(),
            }
        }
    };

    let code = message.split(" : ").next().unwrap_or("").trim();
    match code {
        "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" | "TOKEN_EXPIRED" | "USER_TOKEN_EXPIRED"
        | "INVALID_ID_TOKEN" => AuthError::RequiresRecentLogin,
        "EMAIL_EXISTS" => AuthError::Provider("an account with this email already exists".into()),
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            AuthError::Provider("invalid email or password".into())
        }
        "WEAK_PASSWORD" => AuthError::Provider("password should be at least 6 characters".into()),
        "USER_DISABLED" => AuthError::Provider("this account has been disabled".into()),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => {
            AuthError::Provider("too many attempts, please try again later".into())
        }
        other if !other.is_empty() => AuthError::Provider(other.to_string()),
        _ => AuthError::Status {
            status,
            body: body.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_error(message: &str) -> String {
        format!(r#"{{"error":{{"code":400,"message":"{}"}}}}"#, message)
    }

    #[test]
    fn test_map_stale_credential_is_retryable() {
        let err = map_error_body(
            reqwest::StatusCode::BAD_REQUEST,
            &provider_error("CREDENTIAL_TOO_OLD_LOGIN_AGAIN"),
        );
        assert!(matches!(err, AuthError::RequiresRecentLogin));
    }

    #[test]
    fn test_map_known_codes() {
        let err = map_error_body(
            reqwest::StatusCode::BAD_REQUEST,
            &provider_error("EMAIL_EXISTS"),
        );
        assert_eq!(
            err.to_string(),
            "an account with this email already exists"
        );

        let err = map_error_body(
            reqwest::StatusCode::BAD_REQUEST,
            &provider_error("INVALID_LOGIN_CREDENTIALS"),
        );
        assert_eq!(err.to_string(), "invalid email or password");
    }

    #[test]
    fn test_map_message_with_detail_suffix() {
        let err = map_error_body(
            reqwest::StatusCode::BAD_REQUEST,
            &provider_error("WEAK_PASSWORD : Password should be at least 6 characters"),
        );
        assert_eq!(err.to_string(), "password should be at least 6 characters");
    }

    #[test]
    fn test_map_unknown_body_keeps_status_and_body() {
        let err = map_error_body(reqwest::StatusCode::BAD_GATEWAY, "<html>oops</html>");
        match err {
            AuthError::Status { status, body } => {
                assert_eq!(status, reqwest::StatusCode::BAD_GATEWAY);
                assert!(body.contains("oops"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
