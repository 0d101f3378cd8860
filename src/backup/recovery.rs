//! Member-search recovery: find a snapshot containing a named member and
//! restore a subset of that one file.
//!
//! The catalog is scanned in the requested direction and the first file with
//! a matching member wins; this is short-circuit-on-first-match, not a
//! best-match search across all files. Finding no match in any file is a
//! normal business outcome, not an error.

use std::collections::HashSet;
use std::path::Path;

use crate::backup::{archive, catalog, restore};
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    Member, RecoveryOutcome, RecoveryRequest, RestoreOptions, SearchStrategy, Snapshot,
};

/// Collections restored when the request does not name any.
pub const DEFAULT_COLLECTIONS: &[&str] = &["users", "members", "departments"];

/// Scan persisted snapshots for a member matching `request.name` and restore
/// the requested collections from the first file that contains one.
/// Returns `None` when no snapshot contains a match.
pub async fn restore_by_member_name(
    repo: &Repository,
    snapshot_dir: &Path,
    key: Option<&str>,
    request: &RecoveryRequest,
) -> Result<Option<RecoveryOutcome>, AppError> {
    let tenant = request
        .tenant_id
        .ok_or_else(|| AppError::Validation("tenantId is required".to_string()))?;
    let query = normalize_name(&request.name);
    if query.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }

    let collections: Vec<String> = match &request.collections {
        Some(list) if !list.is_empty() => list.clone(),
        _ => DEFAULT_COLLECTIONS.iter().map(|c| c.to_string()).collect(),
    };

    let mut files = catalog::list_snapshots(snapshot_dir).await?;
    if request.strategy == SearchStrategy::Earliest {
        files.reverse();
    }

    for file in files {
        let snapshot = match archive::read_snapshot(Path::new(&file.path), key).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(file = %file.path, error = %err, "skipping unreadable snapshot");
                continue;
            }
        };

        let members = snapshot.members.as_deref().unwrap_or(&[]);
        if !members.iter().any(|m| member_matches(m, &query)) {
            continue;
        }

        tracing::info!(file = %file.path, tenant, "member match found, restoring subset");
        let payload = project_collections(&snapshot, &collections);
        let summary =
            restore::restore_snapshot(repo, &payload, tenant, RestoreOptions::default()).await?;

        return Ok(Some(RecoveryOutcome {
            source_file: file.path,
            summary,
        }));
    }

    Ok(None)
}

/// Trim, lowercase and collapse internal whitespace.
fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Exact full-name equality, or token-subset equality: every query token
/// present among the candidate's name tokens, order-insensitive.
fn member_matches(member: &Member, query: &str) -> bool {
    let candidate = normalize_name(&member.full_name());
    if candidate.is_empty() {
        return false;
    }
    if candidate == query {
        return true;
    }
    let tokens: HashSet<&str> = candidate.split(' ').collect();
    query.split(' ').all(|token| tokens.contains(token))
}

/// Build a partial payload holding only the requested collections from one
/// snapshot.
fn project_collections(snapshot: &Snapshot, collections: &[String]) -> Snapshot {
    let mut payload = Snapshot {
        meta: snapshot.meta.clone(),
        ..Snapshot::default()
    };
    for name in collections {
        match name.as_str() {
            "settings" => payload.settings = snapshot.settings.clone(),
            "users" => payload.users = snapshot.users.clone(),
            "members" => payload.members = snapshot.members.clone(),
            "departments" => payload.departments = snapshot.departments.clone(),
            "events" => payload.events = snapshot.events.clone(),
            "programs" => payload.programs = snapshot.programs.clone(),
            "cellGroups" => payload.cell_groups = snapshot.cell_groups.clone(),
            "councils" => payload.councils = snapshot.councils.clone(),
            "committees" => payload.committees = snapshot.committees.clone(),
            "sermons" => payload.sermons = snapshot.sermons.clone(),
            "announcements" => payload.announcements = snapshot.announcements.clone(),
            other => {
                tracing::warn!(collection = other, "ignoring unknown collection in recovery request");
            }
        }
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(first: &str, last: &str) -> Member {
        Member {
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            ..Member::default()
        }
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Jane   DOE "), "jane doe");
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn test_exact_match() {
        assert!(member_matches(&member("Jane", "Doe"), "jane doe"));
        assert!(!member_matches(&member("Jane", "Doe"), "john doe"));
    }

    #[test]
    fn test_token_subset_match() {
        // Query tokens are order-insensitive and may be a subset
        assert!(member_matches(&member("Jane Anne", "Doe"), "jane doe"));
        assert!(member_matches(&member("Jane", "Doe"), "doe jane"));
        assert!(!member_matches(&member("Jane", "Doe"), "jane smith"));
    }

    #[test]
    fn test_nameless_member_never_matches() {
        let nameless = Member::default();
        assert!(!member_matches(&nameless, "jane doe"));
    }

    #[test]
    fn test_projection_keeps_only_requested_collections() {
        let snapshot = Snapshot {
            users: Some(vec![Default::default()]),
            members: Some(vec![member("Jane", "Doe")]),
            events: Some(vec![Default::default()]),
            ..Snapshot::default()
        };
        let payload = project_collections(&snapshot, &["members".to_string()]);
        assert!(payload.members.is_some());
        assert!(payload.users.is_none());
        assert!(payload.events.is_none());
    }
}
