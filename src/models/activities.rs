//! Activity models: events, programs, announcements, sermons and cell groups.

use serde::{Deserialize, Serialize};

/// A scheduled event, optionally owned by a department.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub tenant_id: Option<i64>,
    pub title: Option<String>,
    pub date: Option<String>,
    pub department_id: Option<i64>,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// A longer-running program (discipleship course, seminar series, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Program {
    pub id: i64,
    pub tenant_id: Option<i64>,
    pub name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

/// A published announcement. Historical communications are immutable:
/// restore matches these but never updates them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Announcement {
    pub id: i64,
    pub tenant_id: Option<i64>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub created_at: Option<String>,
}

/// A sermon record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Sermon {
    pub id: i64,
    pub tenant_id: Option<i64>,
    pub title: Option<String>,
    pub date: Option<String>,
    pub speaker: Option<String>,
    pub scripture: Option<String>,
    pub summary: Option<String>,
}

/// A small-group ("cell") unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CellGroup {
    pub id: i64,
    pub tenant_id: Option<i64>,
    pub name: Option<String>,
    pub leader_member_id: Option<i64>,
    pub description: Option<String>,
}

/// Membership of a member in a cell group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CellGroupMembership {
    pub id: i64,
    pub tenant_id: Option<i64>,
    pub cell_group_id: Option<i64>,
    pub member_id: Option<i64>,
    pub joined_at: Option<String>,
}
