use axum::{extract::Request, middleware::Next, response::Response};
use tracing::info;

/// Stable per-browser identifier taken from the x-client-id header. The
/// favorites and auth endpoints key their session state on it.
#[derive(Debug, Clone)]
pub struct ClientId(pub String);

const CLIENT_ID_HEADER: &str = "x-client-id";
const MAX_CLIENT_ID_LEN: usize = 128;

pub async fn client_id(mut req: Request, next: Next) -> Response {
    let client_id = req
        .headers()
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && id.len() <= MAX_CLIENT_ID_LEN);

    if let Some(id) = client_id {
        req.extensions_mut().insert(ClientId(id));
    }

    next.run(req).await
}

pub async fn log_request(req: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let mut response = next.run(req).await;

    let status = response.status().as_u16();
    let content_length = response
        .headers()
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    info!(
        request_id = %request_id,
        method = %method,
        url = %uri,
        status = status,
        length = content_length,
        "HTTP request"
    );

    if let Ok(value) = request_id.to_string().parse() {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}
