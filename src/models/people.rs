//! People-related models: users, members and departments.

use serde::{Deserialize, Serialize};

/// A login-capable platform user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub tenant_id: Option<i64>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
    pub created_at: Option<String>,
}

/// A congregation member, optionally linked to a [`User`] account.
///
/// Members without a linked user are matched across backup boundaries by
/// (firstName, lastName, dob). That key is a heuristic, not a guarantee:
/// two unrelated people sharing a name and birthdate collapse into one
/// record on restore.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Member {
    pub id: i64,
    pub tenant_id: Option<i64>,
    pub user_id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub photo_url: Option<String>,
    pub joined_at: Option<String>,
    pub created_at: Option<String>,
}

impl Member {
    /// Full display name, used by member-search recovery.
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
    }
}

/// An organizational department (choir, ushering, youth, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Department {
    pub id: i64,
    pub tenant_id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
}
