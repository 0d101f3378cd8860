//! Snapshot document and restore result models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    Announcement, AttendanceRecord, CellGroup, CellGroupMembership, Committee, Council, Department,
    Event, FinanceRecord, Member, Minutes, Program, Sermon, Setting, User,
};

/// On-disk snapshot schema version.
pub const SNAPSHOT_SCHEMA_VERSION: &str = "1.0";

/// Snapshot header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnapshotMeta {
    pub created_at: String,
    pub version: String,
}

/// A point-in-time export of the entity collections, immutable once written.
///
/// The same type serves as the restore payload: a collection that is `None`
/// was absent from the payload and is skipped entirely by the restore engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Snapshot {
    pub meta: SnapshotMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Vec<Setting>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<User>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Member>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departments: Option<Vec<Department>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Event>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub announcements: Option<Vec<Announcement>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sermons: Option<Vec<Sermon>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finance_records: Option<Vec<FinanceRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance_records: Option<Vec<AttendanceRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub councils: Option<Vec<Council>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committees: Option<Vec<Committee>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_minutes: Option<Vec<Minutes>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_minutes: Option<Vec<Minutes>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub programs: Option<Vec<Program>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_groups: Option<Vec<CellGroup>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_group_memberships: Option<Vec<CellGroupMembership>>,
}

/// Result of persisting a snapshot to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSnapshot {
    pub path: String,
    pub size_bytes: u64,
}

/// A persisted snapshot file as listed by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFile {
    pub path: String,
    pub created_at: String,
    pub size_bytes: u64,
}

/// Options controlling a restore run.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RestoreOptions {
    /// Reconcile inside the transaction, then roll back instead of committing.
    pub dry_run: bool,
    /// Enumerate skipped rows in the summary (implied by `dry_run`).
    pub verbose: bool,
}

impl RestoreOptions {
    pub fn report_skips(&self) -> bool {
        self.dry_run || self.verbose
    }
}

/// A payload row the restore engine dropped, and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    pub collection: String,
    pub index: usize,
    pub reason: String,
}

/// Per-collection counts of records reconciled (matched or created) by a
/// restore run. Counters report records processed, not net-new rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSummary {
    pub counts: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub skipped: Vec<SkippedRow>,
    pub dry_run: bool,
}

impl RestoreSummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Record one reconciled row for a collection.
    pub fn tally(&mut self, collection: &str) {
        *self.counts.entry(collection.to_string()).or_insert(0) += 1;
    }

    /// Mark a collection as touched even if every row was skipped.
    pub fn touch(&mut self, collection: &str) {
        self.counts.entry(collection.to_string()).or_insert(0);
    }

    pub fn skip(&mut self, collection: &str, index: usize, reason: &str) {
        self.skipped.push(SkippedRow {
            collection: collection.to_string(),
            index,
            reason: reason.to_string(),
        });
    }
}

/// Scan direction for member-search recovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    #[default]
    Latest,
    Earliest,
}

/// Request body for restore-by-member-name.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryRequest {
    pub name: String,
    pub tenant_id: Option<i64>,
    #[serde(default)]
    pub strategy: SearchStrategy,
    /// Collections to restore from the matching file; defaults to
    /// users, members and departments.
    #[serde(default)]
    pub collections: Option<Vec<String>>,
}

/// Successful outcome of member-search recovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryOutcome {
    pub source_file: String,
    pub summary: RestoreSummary,
}

/// Result of a consistency scan; empty issues means healthy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyReport {
    pub issues: Vec<String>,
}
