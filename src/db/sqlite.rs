use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use super::model::*;
use super::repo::*;

type BookmarkRow = (String, String, String, String, String, String, String);

const BOOKMARK_COLUMNS: &str =
    "id, userid, movieid, title, backdroppath, releaseyear, created";

/// Cached tokens unused for this many minutes are dropped and reloaded on
/// next use.
const TOKEN_IDLE_MINUTES: i64 = 30;

pub struct SqliteRepository {
    pool: SqlitePool,
    token_cache: Arc<RwLock<HashMap<String, AccessToken>>>,
    /// `lastused` times not yet written back, keyed by token.
    token_usage: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl SqliteRepository {
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(db_path)?.create_if_missing(true);

        // Every connection to an in-memory database is a separate database,
        // so those get exactly one connection that is never recycled.
        let pool = if db_path.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let repo = Self {
            pool,
            token_cache: Arc::new(RwLock::new(HashMap::new())),
            token_usage: Arc::new(Mutex::new(HashMap::new())),
        };

        repo.init_schema().await?;

        info!("Database initialized at {}", db_path);

        Ok(repo)
    }

    pub async fn in_memory() -> DbResult<Self> {
        Self::new("sqlite::memory:").await
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::raw_sql(schema).execute(&self.pool).await?;
        Ok(())
    }

    pub fn start_background_tasks(self: Arc<Self>) {
        let repo_clone = Arc::clone(&self);
        tokio::spawn(async move {
            repo_clone.token_flush_loop().await;
        });
    }

    async fn token_flush_loop(&self) {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(10));
        loop {
            interval.tick().await;
            if let Err(e) = self.flush_token_cache().await {
                error!("Failed to flush token cache: {}", e);
            }
            let cutoff = Utc::now() - chrono::Duration::minutes(TOKEN_IDLE_MINUTES);
            self.evict_idle_tokens(cutoff).await;
        }
    }

    /// Writes pending `lastused` times back to the database. Tokens that were
    /// not used since the last flush are not touched.
    async fn flush_token_cache(&self) -> DbResult<()> {
        let pending: Vec<(String, DateTime<Utc>)> =
            std::mem::take(&mut *self.token_usage.lock().await)
                .into_iter()
                .collect();
        if pending.is_empty() {
            return Ok(());
        }

        {
            let mut cache = self.token_cache.write().await;
            for (token, lastused) in &pending {
                if let Some(t) = cache.get_mut(token) {
                    t.lastused = Some(*lastused);
                }
            }
        }

        for (i, (token, lastused)) in pending.iter().enumerate() {
            let result = sqlx::query("UPDATE accesstokens SET lastused = ? WHERE token = ?")
                .bind(lastused.to_rfc3339())
                .bind(token)
                .execute(&self.pool)
                .await;
            if let Err(e) = result {
                // Keep what was not written for the next round, unless it was
                // used again in the meantime.
                let mut usage = self.token_usage.lock().await;
                for (token, lastused) in &pending[i..] {
                    usage.entry(token.clone()).or_insert(*lastused);
                }
                return Err(e.into());
            }
        }

        debug!(count = pending.len(), "Token usage flushed");
        Ok(())
    }

    /// Drops cached tokens last used before `cutoff`. Pending usage is kept,
    /// so call this after a flush.
    async fn evict_idle_tokens(&self, cutoff: DateTime<Utc>) {
        let usage = self.token_usage.lock().await;
        let mut cache = self.token_cache.write().await;
        let before = cache.len();
        cache.retain(|token, t| {
            usage.contains_key(token) || t.lastused.is_some_and(|used| used >= cutoff)
        });
        let evicted = before - cache.len();
        if evicted > 0 {
            debug!(evicted, "Idle tokens evicted from cache");
        }
    }

    pub async fn close(&self) {
        if let Err(e) = self.flush_token_cache().await {
            error!("Failed to flush token cache on close: {}", e);
        }
        self.pool.close().await;
    }
}

fn bookmark_from_row(row: BookmarkRow) -> Bookmark {
    Bookmark {
        id: row.0,
        user_id: row.1,
        movie_id: row.2,
        title: row.3,
        backdrop_path: row.4,
        release_year: row.5,
        created: parse_timestamp(Some(row.6)).unwrap_or_default(),
    }
}

#[async_trait]
impl UserRepo for SqliteRepository {
    async fn get_user(&self, username: &str) -> DbResult<User> {
        let row = sqlx::query_as::<_, (String, String, String, Option<String>, Option<String>)>(
            "SELECT id, username, password, created, lastlogin FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::NotFound(format!("User not found: {}", username)),
            _ => DbError::Sqlx(e),
        })?;

        Ok(User {
            id: row.0,
            username: row.1,
            password: row.2,
            created: parse_timestamp(row.3),
            lastlogin: parse_timestamp(row.4),
        })
    }

    async fn get_user_by_id(&self, id: &str) -> DbResult<User> {
        let row = sqlx::query_as::<_, (String, String, String, Option<String>, Option<String>)>(
            "SELECT id, username, password, created, lastlogin FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::NotFound(format!("User not found: {}", id)),
            _ => DbError::Sqlx(e),
        })?;

        Ok(User {
            id: row.0,
            username: row.1,
            password: row.2,
            created: parse_timestamp(row.3),
            lastlogin: parse_timestamp(row.4),
        })
    }

    async fn create_user(&self, user: &User) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO users (id, username, password, created, lastlogin) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password)
        .bind(user.created.as_ref().map(|dt| dt.to_rfc3339()))
        .bind(user.lastlogin.as_ref().map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                DbError::AlreadyExists(format!("User already exists: {}", user.username))
            }
            _ => DbError::Sqlx(e),
        })?;
        Ok(())
    }

    async fn update_last_login(&self, id: &str) -> DbResult<()> {
        sqlx::query("UPDATE users SET lastlogin = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AccessTokenRepo for SqliteRepository {
    async fn get_token(&self, token: &str) -> DbResult<AccessToken> {
        let now = Utc::now();

        let cached = self.token_cache.read().await.get(token).cloned();
        if let Some(mut t) = cached {
            t.lastused = Some(now);
            self.token_usage.lock().await.insert(token.to_string(), now);
            return Ok(t);
        }

        // Misses are filled under the write lock, so a concurrent
        // `delete_token` cannot be undone by a stale read.
        let mut cache = self.token_cache.write().await;
        if let Some(mut t) = cache.get(token).cloned() {
            t.lastused = Some(now);
            drop(cache);
            self.token_usage.lock().await.insert(token.to_string(), now);
            return Ok(t);
        }

        let result = sqlx::query_as::<_, (String, String, Option<String>, Option<String>)>(
            "SELECT token, userid, created, lastused FROM accesstokens WHERE token = ?",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::NotFound("Token not found".to_string()),
            _ => DbError::Sqlx(e),
        })?;

        let access_token = AccessToken {
            token: result.0,
            userid: result.1,
            created: parse_timestamp(result.2),
            lastused: Some(now),
        };
        cache.insert(token.to_string(), access_token.clone());
        drop(cache);

        self.token_usage.lock().await.insert(token.to_string(), now);
        Ok(access_token)
    }

    async fn upsert_token(&self, token: &AccessToken) -> DbResult<()> {
        let mut cache = self.token_cache.write().await;

        sqlx::query(
            "INSERT OR REPLACE INTO accesstokens (token, userid, created, lastused) VALUES (?, ?, ?, ?)",
        )
        .bind(&token.token)
        .bind(&token.userid)
        .bind(token.created.as_ref().map(|dt| dt.to_rfc3339()))
        .bind(token.lastused.as_ref().map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        cache.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn delete_token(&self, token: &str) -> DbResult<()> {
        let mut cache = self.token_cache.write().await;

        sqlx::query("DELETE FROM accesstokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        cache.remove(token);
        drop(cache);

        self.token_usage.lock().await.remove(token);
        Ok(())
    }
}

#[async_trait]
impl BookmarkRepo for SqliteRepository {
    async fn list_bookmarks(&self, user_id: &str) -> DbResult<Vec<Bookmark>> {
        let rows = sqlx::query_as::<_, BookmarkRow>(&format!(
            "SELECT {} FROM bookmarks WHERE userid = ? ORDER BY created, rowid",
            BOOKMARK_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(bookmark_from_row).collect())
    }

    async fn create_bookmark(&self, user_id: &str, new: &NewBookmark) -> DbResult<Bookmark> {
        let bookmark = Bookmark {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            movie_id: new.movie_id.clone(),
            title: new.title.clone(),
            backdrop_path: new.backdrop_path.clone(),
            release_year: new.release_year.clone(),
            created: Utc::now(),
        };

        sqlx::query(&format!(
            "INSERT INTO bookmarks ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
            BOOKMARK_COLUMNS
        ))
        .bind(&bookmark.id)
        .bind(&bookmark.user_id)
        .bind(&bookmark.movie_id)
        .bind(&bookmark.title)
        .bind(&bookmark.backdrop_path)
        .bind(&bookmark.release_year)
        .bind(bookmark.created.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(bookmark_id = %bookmark.id, user_id, "bookmark stored");

        Ok(bookmark)
    }

    async fn delete_bookmark(&self, id: &str, user_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let owner = sqlx::query_as::<_, (String,)>("SELECT userid FROM bookmarks WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Bookmark not found: {}", id)))?
            .0;

        if owner != user_id {
            return Err(DbError::Forbidden(format!(
                "Bookmark {} is not owned by {}",
                id, user_id
            )));
        }

        sqlx::query("DELETE FROM bookmarks WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_bookmarks_by_movie(&self, user_id: &str, movie_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE userid = ? AND movieid = ?")
            .bind(user_id)
            .bind(movie_id)
            .execute(&self.pool)
            .await?;

        match result.rows_affected() {
            0 => Err(DbError::NotFound(format!(
                "Bookmark not found for movie {}",
                movie_id
            ))),
            n => Ok(n),
        }
    }
}
