//! Governance models: councils and committees with their member links.

use serde::{Deserialize, Serialize};

/// A church council for a given term.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Council {
    pub id: i64,
    pub tenant_id: Option<i64>,
    pub name: Option<String>,
    pub year: Option<i64>,
    pub members: Vec<CouncilMember>,
}

/// Join row linking a member into a council.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CouncilMember {
    pub id: i64,
    pub council_id: Option<i64>,
    pub member_id: Option<i64>,
    pub role: Option<String>,
}

/// A standing committee.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Committee {
    pub id: i64,
    pub tenant_id: Option<i64>,
    pub name: Option<String>,
    pub purpose: Option<String>,
    pub members: Vec<CommitteeMember>,
}

/// Join row linking a member into a committee.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommitteeMember {
    pub id: i64,
    pub committee_id: Option<i64>,
    pub member_id: Option<i64>,
    pub role: Option<String>,
}
