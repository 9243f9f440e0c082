//! Background loops (the hourly session sweep and the statistics poll) and
//! the helper that moves store work onto the blocking pool.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{
    error::{AppError, Result},
    services::{
        auth::AuthService,
        statistics::{StatisticsBoard, StatisticsClient},
    },
};

/// Runs store and password hashing work off the async executor.
pub async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))?
}

/// Spawns the periodic sweep of expired sessions. The first sweep runs one
/// full interval after start.
pub fn spawn_session_sweeper(auth: Arc<AuthService>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(every).await;
            tracing::info!("🧹 Running scheduled cleanup of expired sessions...");
            let sweeper = auth.clone();
            match blocking(move || sweeper.expire_current_session()).await {
                Ok(removed) => {
                    tracing::info!("✅ Session cleanup completed, {} removed", removed);
                }
                Err(e) => {
                    tracing::error!("❌ Session cleanup failed: {}", e);
                }
            }
        }
    })
}

/// Polls the statistics endpoint once and publishes the result. When a user
/// is logged in their share totals are refreshed from the summary.
pub async fn poll_statistics_once(
    client: &StatisticsClient,
    board: &StatisticsBoard,
    auth: &Arc<AuthService>,
) -> Result<()> {
    let summary = client.fetch().await?;
    board.publish(summary)?;

    let auth = auth.clone();
    blocking(move || {
        if let Some(ctx) = auth.current()? {
            auth.apply_statistics(&ctx, &summary)?;
        }
        Ok(())
    })
    .await
}

/// Spawns the fixed-interval statistics poll. Failures are logged and the
/// next tick simply tries again; there is no backoff.
pub fn spawn_statistics_poller(
    client: StatisticsClient,
    board: StatisticsBoard,
    auth: Arc<AuthService>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = poll_statistics_once(&client, &board, &auth).await {
                tracing::warn!(url = client.url(), "Failed to fetch statistics: {}", e);
            }
        }
    })
}
