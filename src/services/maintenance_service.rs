use sqlx::SqlitePool;
use tokio::time::{sleep, Duration};

use crate::services::guest_service;

/// Starts the background maintenance loop: expired guest sessions are purged
/// every `interval_secs`.
pub fn start(pool: SqlitePool, interval_secs: u64) {
    tracing::info!(interval_secs, "starting maintenance task");
    tokio::spawn(async move {
        loop {
            if let Err(e) = run_once(&pool).await {
                tracing::error!(error = %e, "maintenance run failed");
            }
            sleep(Duration::from_secs(interval_secs.max(1))).await;
        }
    });
}

pub async fn run_once(pool: &SqlitePool) -> anyhow::Result<()> {
    let purged = guest_service::purge_expired(pool).await?;
    tracing::debug!(purged, "maintenance run completed");
    Ok(())
}
