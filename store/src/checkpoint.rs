//! Periodic leaderboard checkpoints for a running server

use crate::leaderboard::{LeaderboardError, LeaderboardStore};
use log::{error, info};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{interval, Duration, MissedTickBehavior};

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint period must be greater than zero")]
    ZeroPeriod,
    #[error(transparent)]
    Leaderboard(#[from] LeaderboardError),
    #[error("checkpoint task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Saves the leaderboard on a blocking worker so the async runtime keeps running
pub async fn save_leaderboard(
    leaderboard: &Arc<LeaderboardStore>,
    path: &Path,
) -> Result<(), CheckpointError> {
    let leaderboard = Arc::clone(leaderboard);
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || leaderboard.save(&path)).await??;
    Ok(())
}

/// Writes the leaderboard to `path` every `period` until `shutdown` resolves,
/// then writes it one final time
///
/// Failed periodic saves are logged and retried on the next tick. Only the
/// result of the final save is returned. Returns the number of periodic
/// checkpoints that succeeded. A zero `period` is rejected before anything
/// is written.
pub async fn run_checkpoints<F>(
    leaderboard: Arc<LeaderboardStore>,
    path: PathBuf,
    period: Duration,
    shutdown: F,
) -> Result<usize, CheckpointError>
where
    F: Future<Output = ()>,
{
    if period.is_zero() {
        return Err(CheckpointError::ZeroPeriod);
    }

    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Skip the first tick since it fires immediately
    timer.tick().await;

    tokio::pin!(shutdown);
    let mut completed = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = timer.tick() => {
                match save_leaderboard(&leaderboard, &path).await {
                    Ok(()) => completed += 1,
                    Err(e) => error!("Leaderboard checkpoint failed: {}", e),
                }
            }
        }
    }

    info!("Writing final leaderboard checkpoint to {}", path.display());
    save_leaderboard(&leaderboard, &path).await?;
    Ok(completed)
}
