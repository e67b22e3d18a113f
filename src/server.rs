use axum::{
    extract::Request,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::api;
use crate::catalog::CatalogClient;
use crate::cloud::{FavoritesCollection, IdentityClient};
use crate::config::Config;
use crate::session::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<CatalogClient>,
    pub identity: Arc<IdentityClient>,
    pub store: Arc<dyn FavoritesCollection>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(
        config: Config,
        catalog: Arc<CatalogClient>,
        identity: Arc<IdentityClient>,
        store: Arc<dyn FavoritesCollection>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
            identity,
            store,
            sessions,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/movies/popular", get(api::movies::popular))
        .route("/api/movies/search", get(api::movies::search))
        .route("/api/movies/:id", get(api::movies::details))
        .route("/api/movies/:id/similar", get(api::movies::similar))
        .route(
            "/api/movies/:id/watch-providers",
            get(api::movies::watch_providers),
        )
        .route("/api/genres", get(api::movies::genres))
        .route("/api/discover", get(api::movies::discover))
        .route("/api/image/:size/*path", get(api::movies::image))
        .route("/api/auth/signup", post(api::auth::sign_up))
        .route("/api/auth/signin", post(api::auth::sign_in))
        .route("/api/auth/signin/idp", post(api::auth::sign_in_idp))
        .route("/api/auth/signout", post(api::auth::sign_out))
        .route("/api/auth/account", delete(api::auth::delete_account))
        .route("/api/session", get(api::auth::get_session))
        .route("/api/favorites", get(api::favorites::list))
        .route(
            "/api/favorites/:id",
            get(api::favorites::status)
                .put(api::favorites::add)
                .delete(api::favorites::remove),
        )
        .route("/api/nudge/dismiss", post(api::favorites::dismiss_nudge));

    let mut router = Router::new()
        .route("/robots.txt", get(robots_txt_handler))
        .merge(api_routes)
        .fallback(fallback_handler);

    if let Some(ref appdir) = state.config.appdir {
        // The built web UI; unmatched paths fall through to it.
        router = router.fallback_service(ServeDir::new(appdir));
    }

    router
        .layer(axum::middleware::from_fn(crate::middleware::client_id))
        .layer(axum::middleware::from_fn(crate::middleware::log_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn robots_txt_handler() -> &'static str {
    "User-agent: *\nDisallow: /\n"
}

async fn fallback_handler(req: Request<axum::body::Body>) -> impl IntoResponse {
    // Handle OPTIONS requests for CORS preflight
    if req.method() == axum::http::Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    StatusCode::NOT_FOUND.into_response()
}
