use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One anonymously stored favorite. The movie value is kept verbatim as
/// JSON so it round-trips unchanged through migration.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnonFavorite {
    pub clientid: String,
    pub movieid: i64,
    pub movie: String,
    pub added: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Corrupt favorite entry: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not found: {0}")]
    NotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;
