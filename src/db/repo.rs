use async_trait::async_trait;

use super::model::DbResult;
use crate::catalog::Movie;

/// Device-scoped favorites store backing anonymous sessions, keyed by the
/// stable client id each browser presents.
#[async_trait]
pub trait AnonFavoritesRepo: Send + Sync {
    async fn list_favorites(&self, client_id: &str) -> DbResult<Vec<Movie>>;
    async fn has_favorite(&self, client_id: &str, movie_id: i64) -> DbResult<bool>;
    /// Insert, skipping silently when the movie id is already stored.
    async fn put_favorite(&self, client_id: &str, movie: &Movie) -> DbResult<()>;
    /// Delete by key; deleting an absent id is a no-op.
    async fn delete_favorite(&self, client_id: &str, movie_id: i64) -> DbResult<()>;
    async fn clear_favorites(&self, client_id: &str) -> DbResult<()>;
}
