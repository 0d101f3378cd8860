//! Snapshot exporter: reads every collection into an in-memory snapshot.
//!
//! Each collection read is individually guarded: a failing collection
//! defaults to an empty sequence rather than aborting the export. A partial
//! backup is strictly preferred over no backup.

use std::future::Future;

use chrono::Utc;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{Snapshot, SnapshotMeta, SNAPSHOT_SCHEMA_VERSION};

/// Export all collections for one tenant, or across all tenants when
/// `tenant` is `None` (operator-only mode). Pure read, no side effects.
///
/// Collection element ordering follows store-native order and is not
/// guaranteed stable across calls.
pub async fn export_snapshot(repo: &Repository, tenant: Option<i64>) -> Snapshot {
    let (
        settings,
        users,
        members,
        departments,
        events,
        announcements,
        sermons,
        finance_records,
    ) = tokio::join!(
        guarded("settings", repo.list_settings(tenant)),
        guarded("users", repo.list_users(tenant)),
        guarded("members", repo.list_members(tenant)),
        guarded("departments", repo.list_departments(tenant)),
        guarded("events", repo.list_events(tenant)),
        guarded("announcements", repo.list_announcements(tenant)),
        guarded("sermons", repo.list_sermons(tenant)),
        guarded("financeRecords", repo.list_finance_records(tenant)),
    );
    let (
        attendance_records,
        councils,
        committees,
        board_minutes,
        business_minutes,
        programs,
        cell_groups,
        cell_group_memberships,
    ) = tokio::join!(
        guarded("attendanceRecords", repo.list_attendance_records(tenant)),
        guarded("councils", repo.list_councils(tenant)),
        guarded("committees", repo.list_committees(tenant)),
        guarded("boardMinutes", repo.list_board_minutes(tenant)),
        guarded("businessMinutes", repo.list_business_minutes(tenant)),
        guarded("programs", repo.list_programs(tenant)),
        guarded("cellGroups", repo.list_cell_groups(tenant)),
        guarded(
            "cellGroupMemberships",
            repo.list_cell_group_memberships(tenant)
        ),
    );

    Snapshot {
        meta: SnapshotMeta {
            created_at: Utc::now().to_rfc3339(),
            version: SNAPSHOT_SCHEMA_VERSION.to_string(),
        },
        settings: Some(settings),
        users: Some(users),
        members: Some(members),
        departments: Some(departments),
        events: Some(events),
        announcements: Some(announcements),
        sermons: Some(sermons),
        finance_records: Some(finance_records),
        attendance_records: Some(attendance_records),
        councils: Some(councils),
        committees: Some(committees),
        board_minutes: Some(board_minutes),
        business_minutes: Some(business_minutes),
        programs: Some(programs),
        cell_groups: Some(cell_groups),
        cell_group_memberships: Some(cell_group_memberships),
    }
}

/// Run one collection read, defaulting to empty on failure.
async fn guarded<T>(
    collection: &str,
    read: impl Future<Output = Result<Vec<T>, AppError>>,
) -> Vec<T> {
    match read.await {
        Ok(rows) => rows,
        Err(err) => {
            tracing::warn!(collection, error = %err, "collection read failed, exporting empty");
            Vec::new()
        }
    }
}
