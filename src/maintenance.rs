//! Per-venue background tasks. Each holds a `Weak` engine and stops once the
//! venue is gone.

use std::sync::Weak;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::{Engine, EngineError, RefreshOutcome};

pub const COMPACT_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Compact the WAL once it has grown by `threshold` appends.
/// Returns whether a compaction ran.
pub async fn compact_if_needed(engine: &Engine, threshold: u64) -> Result<bool, EngineError> {
    let appends = engine.wal_appends_since_compact().await;
    if appends < threshold {
        return Ok(false);
    }
    engine.compact_wal().await?;
    info!(appends, "WAL compacted");
    Ok(true)
}

pub async fn run_compactor(engine: Weak<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(COMPACT_CHECK_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;
    loop {
        interval.tick().await;
        let Some(engine) = engine.upgrade() else { break };
        if let Err(e) = compact_if_needed(&engine, threshold).await {
            warn!(error = %e, "WAL compaction failed");
        }
    }
}

/// Recompute derived blocked windows. Picks up refreshes that failed right
/// after a reservation change.
pub async fn refresh_once(engine: &Engine) -> Result<RefreshOutcome, EngineError> {
    let outcome = engine.refresh_blocked_windows().await?;
    if outcome.changed {
        info!(derived = outcome.derived, "periodic refresh replaced derived windows");
    } else {
        debug!(derived = outcome.derived, "periodic refresh: no change");
    }
    Ok(outcome)
}

pub async fn run_refresher(engine: Weak<Engine>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;
    loop {
        interval.tick().await;
        let Some(engine) = engine.upgrade() else { break };
        if let Err(e) = refresh_once(&engine).await {
            warn!(error = %e, "periodic blocked window refresh failed");
        }
    }
}
