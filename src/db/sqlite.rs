use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{info, warn};

use super::model::*;
use super::repo::*;
use crate::catalog::Movie;

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(db_path)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let repo = Self { pool };

        repo.init_schema().await?;

        info!("Database initialized at {}", db_path);

        Ok(repo)
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::raw_sql(schema).execute(&self.pool).await?;
        Ok(())
    }

    pub fn close(&self) {
        let pool = self.pool.clone();
        tokio::spawn(async move { pool.close().await });
    }
}

#[async_trait]
impl AnonFavoritesRepo for SqliteRepository {
    async fn list_favorites(&self, client_id: &str) -> DbResult<Vec<Movie>> {
        let rows = sqlx::query_as::<_, AnonFavorite>(
            "SELECT clientid, movieid, movie, added FROM anonfavorites
             WHERE clientid = ? ORDER BY added, movieid",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        let mut movies = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_str::<Movie>(&row.movie) {
                Ok(movie) => movies.push(movie),
                Err(e) => {
                    warn!(client_id = %client_id, movie_id = row.movieid, error = %e,
                        "skipping corrupt favorite entry");
                }
            }
        }
        Ok(movies)
    }

    async fn has_favorite(&self, client_id: &str, movie_id: i64) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM anonfavorites WHERE clientid = ? AND movieid = ?",
        )
        .bind(client_id)
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    async fn put_favorite(&self, client_id: &str, movie: &Movie) -> DbResult<()> {
        let json = serde_json::to_string(movie)?;
        sqlx::query(
            "INSERT OR IGNORE INTO anonfavorites (clientid, movieid, movie, added)
             VALUES (?, ?, ?, ?)",
        )
        .bind(client_id)
        .bind(movie.id)
        .bind(&json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_favorite(&self, client_id: &str, movie_id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM anonfavorites WHERE clientid = ? AND movieid = ?")
            .bind(client_id)
            .bind(movie_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_favorites(&self, client_id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM anonfavorites WHERE clientid = ?")
            .bind(client_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
