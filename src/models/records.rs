//! Record-keeping models: settings, finance, attendance and meeting minutes.

use serde::{Deserialize, Serialize};

/// A tenant-scoped configuration entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Setting {
    pub id: i64,
    pub tenant_id: Option<i64>,
    pub key: Option<String>,
    pub value: Option<String>,
}

/// A finance ledger entry. Archival-only: exported but never restored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FinanceRecord {
    pub id: i64,
    pub tenant_id: Option<i64>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub date: Option<String>,
    pub memo: Option<String>,
}

/// Attendance taken for one service or gathering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: i64,
    pub tenant_id: Option<i64>,
    pub service_name: Option<String>,
    pub date: Option<String>,
    pub entries: Vec<AttendanceEntry>,
}

/// One member's presence within an [`AttendanceRecord`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub id: i64,
    pub record_id: Option<i64>,
    pub member_id: Option<i64>,
    pub status: Option<String>,
}

/// Minutes of a board or business meeting, with its revision history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Minutes {
    pub id: i64,
    pub tenant_id: Option<i64>,
    pub title: Option<String>,
    pub meeting_date: Option<String>,
    pub versions: Vec<MinutesVersion>,
}

/// One stored revision of a [`Minutes`] document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MinutesVersion {
    pub id: i64,
    pub minutes_id: Option<i64>,
    pub version_no: Option<i64>,
    pub content: Option<String>,
    pub created_at: Option<String>,
}
