use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::sse::{apply_change, ChangeEvent, SseParser};
use super::types::AuthUser;
use crate::catalog::Movie;
use crate::config::CloudConfig;

const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);
const MAX_CONSECUTIVE_FAILURES: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Live subscription to a user's favorites collection. Each received value
/// is a full snapshot of the collection. Dropping the handle tears the
/// stream down.
pub struct Subscription {
    pub receiver: mpsc::Receiver<Vec<Movie>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Wrap a snapshot channel and the task feeding it so that dropping the
    /// subscription tears the producer down.
    pub fn new(
        receiver: mpsc::Receiver<Vec<Movie>>,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            receiver,
            cancel,
            task,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

/// Per-user favorites collection hosted by the realtime-database provider,
/// rooted at `users/{uid}/favorites/{movieId}`.
#[async_trait]
pub trait FavoritesCollection: Send + Sync {
    async fn list(&self, user: &AuthUser) -> StoreResult<Vec<Movie>>;
    async fn exists(&self, user: &AuthUser, movie_id: i64) -> StoreResult<bool>;
    async fn put(&self, user: &AuthUser, movie: &Movie) -> StoreResult<()>;
    async fn delete(&self, user: &AuthUser, movie_id: i64) -> StoreResult<()>;
    /// Remove the whole collection in a single batched write.
    async fn clear(&self, user: &AuthUser) -> StoreResult<()>;
    async fn subscribe(&self, user: &AuthUser) -> StoreResult<Subscription>;
}

#[derive(Clone)]
pub struct CloudStore {
    http: reqwest::Client,
    database_url: String,
}

impl CloudStore {
    pub fn new(config: &CloudConfig) -> StoreResult<Self> {
        // No overall timeout: the same client serves the long-lived event
        // stream. Connect failures still surface promptly.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            database_url: config.database_url.trim_end_matches('/').to_string(),
        })
    }

    fn collection_url(&self, uid: &str) -> String {
        format!(
            "{}/users/{}/favorites.json",
            self.database_url,
            urlencoding::encode(uid)
        )
    }

    fn document_url(&self, uid: &str, movie_id: i64) -> String {
        format!(
            "{}/users/{}/favorites/{}.json",
            self.database_url,
            urlencoding::encode(uid),
            movie_id
        )
    }

    async fn check(response: reqwest::Response) -> StoreResult<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status, body });
        }
        Ok(response)
    }
}

#[async_trait]
impl FavoritesCollection for CloudStore {
    async fn list(&self, user: &AuthUser) -> StoreResult<Vec<Movie>> {
        let response = self
            .http
            .get(self.collection_url(&user.uid))
            .query(&[("auth", user.id_token.as_str())])
            .send()
            .await?;
        let value: Value = Self::check(response).await?.json().await?;
        Ok(snapshot_movies(&value))
    }

    async fn exists(&self, user: &AuthUser, movie_id: i64) -> StoreResult<bool> {
        let response = self
            .http
            .get(self.document_url(&user.uid, movie_id))
            .query(&[("auth", user.id_token.as_str()), ("shallow", "true")])
            .send()
            .await?;
        let value: Value = Self::check(response).await?.json().await?;
        Ok(!value.is_null())
    }

    async fn put(&self, user: &AuthUser, movie: &Movie) -> StoreResult<()> {
        let response = self
            .http
            .put(self.document_url(&user.uid, movie.id))
            .query(&[("auth", user.id_token.as_str())])
            .json(movie)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, user: &AuthUser, movie_id: i64) -> StoreResult<()> {
        let response = self
            .http
            .delete(self.document_url(&user.uid, movie_id))
            .query(&[("auth", user.id_token.as_str())])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn clear(&self, user: &AuthUser) -> StoreResult<()> {
        let response = self
            .http
            .delete(self.collection_url(&user.uid))
            .query(&[("auth", user.id_token.as_str())])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn subscribe(&self, user: &AuthUser) -> StoreResult<Subscription> {
        let (tx, receiver) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(stream_loop(
            self.http.clone(),
            self.collection_url(&user.uid),
            user.id_token.clone(),
            tx,
            cancel.clone(),
        ));

        Ok(Subscription {
            receiver,
            cancel,
            task,
        })
    }
}

/// Keep the event stream alive, reconnecting with a fixed backoff. After
/// too many consecutive failures the subscription goes quiet and the last
/// delivered snapshot stays in effect.
async fn stream_loop(
    http: reqwest::Client,
    url: String,
    auth: String,
    tx: mpsc::Sender<Vec<Movie>>,
    cancel: CancellationToken,
) {
    let mut failures: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return;
        }

        match stream_once(&http, &url, &auth, &tx, &cancel, &mut failures).await {
            Ok(()) => return,
            Err(e) => {
                failures += 1;
                if failures >= MAX_CONSECUTIVE_FAILURES {
                    error!(url = %url, error = %e, "favorites subscription giving up");
                    return;
                }
                warn!(url = %url, error = %e, "favorites subscription dropped, reconnecting");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(RECONNECT_BACKOFF) => {}
        }
    }
}

async fn stream_once(
    http: &reqwest::Client,
    url: &str,
    auth: &str,
    tx: &mpsc::Sender<Vec<Movie>>,
    cancel: &CancellationToken,
    failures: &mut u32,
) -> Result<(), String> {
    let response = http
        .get(url)
        .query(&[("auth", auth)])
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("status {}: {}", status, body));
    }

    let mut stream = response.bytes_stream();
    let mut parser = SseParser::new();
    let mut root = Value::Object(Default::default());

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            chunk = stream.next() => chunk,
        };

        let chunk = match chunk {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => return Err(e.to_string()),
            None => return Err("stream closed".to_string()),
        };

        for event in parser.push(&chunk) {
            match event.event.as_str() {
                "put" | "patch" => {
                    let change: ChangeEvent = serde_json::from_str(&event.data)
                        .map_err(|e| format!("bad change event: {}", e))?;
                    apply_change(&mut root, &change.path, change.data, event.event == "patch");
                    *failures = 0;
                    if tx.send(snapshot_movies(&root)).await.is_err() {
                        return Ok(());
                    }
                }
                "keep-alive" => {}
                "cancel" | "auth_revoked" => {
                    return Err(format!("server ended stream: {}", event.event));
                }
                other => debug!(event = %other, "ignoring stream event"),
            }
        }
    }
}

/// Flatten the mirrored collection into a snapshot list. Entries that do not
/// parse as a movie are skipped.
pub fn snapshot_movies(root: &Value) -> Vec<Movie> {
    let mut movies: Vec<Movie> = root
        .as_object()
        .map(|map| {
            map.values()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default();
    movies.sort_by_key(|m: &Movie| m.id);
    movies
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_movies_sorted_and_filtered() {
        let root = json!({
            "9": {"id": 9, "title": "B"},
            "5": {"id": 5, "title": "A"},
            "bogus": {"not": "a movie"}
        });

        let movies = snapshot_movies(&root);
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].id, 5);
        assert_eq!(movies[1].id, 9);
    }

    #[test]
    fn test_snapshot_of_empty_collection() {
        assert!(snapshot_movies(&Value::Null).is_empty());
        assert!(snapshot_movies(&json!({})).is_empty());
    }
}
