//! Periodic export + validation driven by a fixed timer.
//!
//! Ticks are not reentrancy-guarded: an export that outlives its interval may
//! overlap the next tick. Each export is a fresh, independent read with no
//! shared mutable state, so overlap is tolerated.

use std::time::Duration;

use crate::backup::{archive, exporter, validator};
use crate::AppState;

/// Enforced floor for the scheduled backup interval, in minutes.
pub const MIN_INTERVAL_MINUTES: u64 = 5;

/// Spawn the backup scheduler if an interval is configured. Every tick
/// exports all tenants, persists the snapshot, then runs a consistency scan.
/// A failing tick is logged and retried on the next tick.
pub fn spawn_backup_scheduler(state: AppState) {
    let Some(minutes) = state.config.backup_interval_minutes else {
        tracing::info!("scheduled backups disabled");
        return;
    };
    let minutes = if minutes < MIN_INTERVAL_MINUTES {
        tracing::warn!(
            requested = minutes,
            floor = MIN_INTERVAL_MINUTES,
            "backup interval below floor, clamping"
        );
        MIN_INTERVAL_MINUTES
    } else {
        minutes
    };

    tracing::info!(interval_minutes = minutes, "scheduled backups enabled");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(minutes * 60));
        // the first interval tick fires immediately; wait one full period
        ticker.tick().await;

        loop {
            ticker.tick().await;
            run_tick(&state).await;
        }
    });
}

async fn run_tick(state: &AppState) {
    let snapshot = exporter::export_snapshot(&state.repo, None).await;
    match archive::persist_snapshot(&snapshot, &state.config.snapshot_dir, state.config.cipher_key())
        .await
    {
        Ok(stored) => {
            tracing::info!(path = %stored.path, size_bytes = stored.size_bytes, "scheduled snapshot persisted");
        }
        Err(err) => {
            tracing::error!(error = %err, "scheduled snapshot failed, retrying next tick");
        }
    }

    match validator::check_consistency(&state.repo, None).await {
        Ok(issues) if issues.is_empty() => tracing::debug!("consistency scan clean"),
        Ok(issues) => tracing::warn!(count = issues.len(), "consistency issues detected"),
        Err(err) => tracing::error!(error = %err, "consistency scan failed"),
    }
}
