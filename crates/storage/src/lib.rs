use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::CountLogId;

const MEMORY_DATABASE_URL: &str = "sqlite::memory:";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCountLog {
    pub id: CountLogId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);

        // Every connection to `sqlite::memory:` opens a fresh database, so the
        // pool must keep exactly one connection alive for the schema to stick.
        let pool_options = if database_url.starts_with(MEMORY_DATABASE_URL) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(connect_options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn insert_count_log(&self, message: &str) -> Result<CountLogId> {
        let rec = sqlx::query(
            "INSERT INTO count_log (message, created_at) VALUES (?, ?) RETURNING id",
        )
        .bind(message)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("failed to insert count log entry")?;
        Ok(CountLogId(rec.get::<i64, _>(0)))
    }

    pub async fn list_count_logs(&self) -> Result<Vec<StoredCountLog>> {
        let rows = sqlx::query("SELECT id, message, created_at FROM count_log ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .context("failed to list count log entries")?;

        rows.into_iter()
            .map(|row| {
                Ok(StoredCountLog {
                    id: CountLogId(row.try_get("id")?),
                    message: row.try_get("message")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    pub async fn count_log_len(&self) -> Result<i64> {
        let len: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM count_log")
            .fetch_one(&self.pool)
            .await
            .context("failed to count log entries")?;
        Ok(len)
    }

    /// Returns `false` when no entry with `id` existed.
    pub async fn delete_count_log(&self, id: CountLogId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM count_log WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete count log entry {}", id.0))?;
        Ok(result.rows_affected() > 0)
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with(MEMORY_DATABASE_URL) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
