//! Consistency validator: read-only scan for dangling relational references.
//!
//! Checks are independent and additive; each gathers the referencing
//! collection and the referenced id set, then filters for references that do
//! not resolve within the same tenant. Violations are reported, never
//! repaired. New checks follow the identical shape and can be appended
//! independently.
//!
//! Unlike the exporter, a collection read failure here propagates: the
//! validator exists for diagnostic visibility, so it must not paper over
//! unreadable collections.

use std::collections::HashSet;

use crate::db::Repository;
use crate::errors::AppError;

/// Scan the store for dangling references. An empty result means healthy.
pub async fn check_consistency(
    repo: &Repository,
    tenant: Option<i64>,
) -> Result<Vec<String>, AppError> {
    let mut issues = Vec::new();

    let users = repo.list_users(tenant).await?;
    let user_ids: HashSet<i64> = users.iter().map(|u| u.id).collect();
    let members = repo.list_members(tenant).await?;
    let member_ids: HashSet<i64> = members.iter().map(|m| m.id).collect();

    // Member -> linked user
    for member in &members {
        if let Some(user_id) = member.user_id {
            if !user_ids.contains(&user_id) {
                issues.push(format!(
                    "member {} references missing user {}",
                    member.id, user_id
                ));
            }
        }
    }

    // Event -> owning department
    let departments = repo.list_departments(tenant).await?;
    let department_ids: HashSet<i64> = departments.iter().map(|d| d.id).collect();
    for event in repo.list_events(tenant).await? {
        if let Some(department_id) = event.department_id {
            if !department_ids.contains(&department_id) {
                issues.push(format!(
                    "event {} references missing department {}",
                    event.id, department_id
                ));
            }
        }
    }

    // Council membership -> council and member
    let councils = repo.list_councils(tenant).await?;
    let council_ids: HashSet<i64> = councils.iter().map(|c| c.id).collect();
    for link in repo.list_council_links(tenant).await? {
        if let Some(council_id) = link.council_id {
            if !council_ids.contains(&council_id) {
                issues.push(format!(
                    "council membership {} references missing council {}",
                    link.id, council_id
                ));
            }
        }
        if let Some(member_id) = link.member_id {
            if !member_ids.contains(&member_id) {
                issues.push(format!(
                    "council membership {} references missing member {}",
                    link.id, member_id
                ));
            }
        }
    }

    // Committee membership -> committee and member
    let committees = repo.list_committees(tenant).await?;
    let committee_ids: HashSet<i64> = committees.iter().map(|c| c.id).collect();
    for link in repo.list_committee_links(tenant).await? {
        if let Some(committee_id) = link.committee_id {
            if !committee_ids.contains(&committee_id) {
                issues.push(format!(
                    "committee membership {} references missing committee {}",
                    link.id, committee_id
                ));
            }
        }
        if let Some(member_id) = link.member_id {
            if !member_ids.contains(&member_id) {
                issues.push(format!(
                    "committee membership {} references missing member {}",
                    link.id, member_id
                ));
            }
        }
    }

    Ok(issues)
}
