//! Backup and restore API endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::{success, ApiResult};
use crate::backup::{archive, catalog, exporter, recovery, restore, validator};
use crate::errors::AppError;
use crate::models::{
    ConsistencyReport, RecoveryOutcome, RecoveryRequest, RestoreOptions, RestoreSummary, Snapshot,
    SnapshotFile, StoredSnapshot,
};
use crate::AppState;

/// Tenant scope for export and consistency operations; absent means all
/// tenants (operator mode).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantQuery {
    pub tenant_id: Option<i64>,
}

/// Query parameters for restore-from-payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreQuery {
    pub tenant_id: Option<i64>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub verbose: bool,
}

/// GET /api/backup/export - Export a snapshot to the caller.
pub async fn export_snapshot(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
) -> ApiResult<Snapshot> {
    let snapshot = exporter::export_snapshot(&state.repo, query.tenant_id).await;
    success(snapshot)
}

/// POST /api/backup/export - Export a snapshot and persist it to disk.
pub async fn persist_snapshot(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
) -> ApiResult<StoredSnapshot> {
    let snapshot = exporter::export_snapshot(&state.repo, query.tenant_id).await;
    let stored = archive::persist_snapshot(
        &snapshot,
        &state.config.snapshot_dir,
        state.config.cipher_key(),
    )
    .await?;
    success(stored)
}

/// GET /api/backup/snapshots - List persisted snapshots, newest-first.
pub async fn list_snapshots(State(state): State<AppState>) -> ApiResult<Vec<SnapshotFile>> {
    let files = catalog::list_snapshots(&state.config.snapshot_dir).await?;
    success(files)
}

/// POST /api/backup/restore - Restore a (possibly partial) snapshot payload.
pub async fn restore_snapshot(
    State(state): State<AppState>,
    Query(query): Query<RestoreQuery>,
    Json(payload): Json<Snapshot>,
) -> ApiResult<RestoreSummary> {
    let tenant = query
        .tenant_id
        .ok_or_else(|| AppError::Validation("tenantId is required".to_string()))?;
    let options = RestoreOptions {
        dry_run: query.dry_run,
        verbose: query.verbose,
    };

    let summary = restore::restore_snapshot(&state.repo, &payload, tenant, options).await?;
    success(summary)
}

/// POST /api/backup/restore/member - Restore from the first snapshot
/// containing a member with the given name.
pub async fn restore_member(
    State(state): State<AppState>,
    Json(request): Json<RecoveryRequest>,
) -> ApiResult<RecoveryOutcome> {
    let outcome = recovery::restore_by_member_name(
        &state.repo,
        &state.config.snapshot_dir,
        state.config.cipher_key(),
        &request,
    )
    .await?;

    match outcome {
        Some(outcome) => success(outcome),
        None => Err(AppError::NotFound(format!(
            "No snapshot contains a member matching '{}'",
            request.name.trim()
        ))),
    }
}

/// GET /api/backup/consistency - Scan for dangling relational references.
pub async fn consistency_check(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
) -> ApiResult<ConsistencyReport> {
    let issues = validator::check_consistency(&state.repo, query.tenant_id).await?;
    success(ConsistencyReport { issues })
}
