use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Executor, SqlitePool};

const MIGRATIONS: &[(&str, &str)] = &[("0001_init.sql", include_str!("../../migrations/0001_init.sql"))];

pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let in_memory = database_url.contains(":memory:");
    let mut options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("invalid DATABASE_URL {database_url}"))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool = SqlitePoolOptions::new()
        // every connection to :memory: is its own database
        .max_connections(if in_memory { 1 } else { 8 })
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    for (name, sql) in MIGRATIONS {
        pool.execute(*sql)
            .await
            .with_context(|| format!("migration {name} failed"))?;
        tracing::debug!(migration = name, "applied");
    }
    Ok(())
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// `base`, or `base-2`, `base-3`... whichever is free in `table`.
pub async fn unique_slug(
    pool: &SqlitePool,
    table: &'static str,
    base: &str,
    exclude_id: Option<&str>,
) -> std::result::Result<String, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE slug = ? AND id != ?");
    let mut candidate = base.to_string();
    let mut n = 1;
    loop {
        let taken: i64 = sqlx::query_scalar(&sql)
            .bind(&candidate)
            .bind(exclude_id.unwrap_or(""))
            .fetch_one(pool)
            .await?;
        if taken == 0 {
            return Ok(candidate);
        }
        n += 1;
        candidate = format!("{base}-{n}");
    }
}
