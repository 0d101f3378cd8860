//! Restore engine: non-destructive merge of a snapshot payload.
//!
//! The whole restore runs inside one transaction; any failure aborts with
//! zero partial effect. Every collection follows the same shape: compute the
//! record's natural key, look up an existing row within the target tenant,
//! refresh mutable descriptive fields on a match or create on a miss, and
//! count the row as reconciled either way. Rows missing mandatory natural-key
//! fields are skipped, not failed; unrestorable legacy rows are tolerated.
//!
//! Payload ids do not survive the round trip, so each reconciled collection
//! feeds an id remap (payload id to live id) that later collections use to
//! translate their foreign keys. Users therefore reconcile before members,
//! and departments before events. An unmappable foreign key is carried
//! through verbatim for the consistency validator to report.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Row, Sqlite, Transaction};
use uuid::Uuid;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    Announcement, CellGroup, Committee, Council, Department, Event, Member, Program,
    RestoreOptions, RestoreSummary, Sermon, Setting, Snapshot, User,
};

type Tx = Transaction<'static, Sqlite>;

/// Payload-id to live-id translation tables built up during a restore run.
#[derive(Default)]
struct IdRemap {
    users: HashMap<i64, i64>,
    departments: HashMap<i64, i64>,
    members: HashMap<i64, i64>,
}

impl IdRemap {
    fn user(&self, payload_id: i64) -> i64 {
        self.users.get(&payload_id).copied().unwrap_or(payload_id)
    }

    fn department(&self, payload_id: i64) -> i64 {
        self.departments
            .get(&payload_id)
            .copied()
            .unwrap_or(payload_id)
    }

    fn member(&self, payload_id: i64) -> i64 {
        self.members.get(&payload_id).copied().unwrap_or(payload_id)
    }
}

/// Merge `payload` into the target tenant. Collections absent from the
/// payload are skipped entirely; every restored row is force-written under
/// the requesting tenant regardless of tenant values embedded in the payload.
pub async fn restore_snapshot(
    repo: &Repository,
    payload: &Snapshot,
    tenant: i64,
    options: RestoreOptions,
) -> Result<RestoreSummary, AppError> {
    let run_id = Uuid::new_v4();
    tracing::info!(%run_id, tenant, dry_run = options.dry_run, "restore started");

    let mut tx = repo.begin().await?;
    let mut summary = RestoreSummary::new(options.dry_run);
    let mut remap = IdRemap::default();

    if let Some(rows) = payload.settings.as_deref() {
        restore_settings(&mut tx, rows, tenant, options, &mut summary).await?;
    }
    if let Some(rows) = payload.users.as_deref() {
        restore_users(&mut tx, rows, tenant, options, &mut summary, &mut remap).await?;
    }
    if let Some(rows) = payload.departments.as_deref() {
        restore_departments(&mut tx, rows, tenant, options, &mut summary, &mut remap).await?;
    }
    if let Some(rows) = payload.members.as_deref() {
        restore_members(&mut tx, rows, tenant, options, &mut summary, &mut remap).await?;
    }
    if let Some(rows) = payload.events.as_deref() {
        restore_events(&mut tx, rows, tenant, options, &mut summary, &remap).await?;
    }
    if let Some(rows) = payload.programs.as_deref() {
        restore_programs(&mut tx, rows, tenant, options, &mut summary).await?;
    }
    if let Some(rows) = payload.cell_groups.as_deref() {
        restore_cell_groups(&mut tx, rows, tenant, options, &mut summary, &remap).await?;
    }
    if let Some(rows) = payload.councils.as_deref() {
        restore_councils(&mut tx, rows, tenant, options, &mut summary, &remap).await?;
    }
    if let Some(rows) = payload.committees.as_deref() {
        restore_committees(&mut tx, rows, tenant, options, &mut summary, &remap).await?;
    }
    if let Some(rows) = payload.sermons.as_deref() {
        restore_sermons(&mut tx, rows, tenant, options, &mut summary).await?;
    }
    if let Some(rows) = payload.announcements.as_deref() {
        restore_announcements(&mut tx, rows, tenant, options, &mut summary).await?;
    }

    if options.dry_run {
        tx.rollback().await?;
    } else {
        tx.commit().await?;
    }

    tracing::info!(%run_id, tenant, counts = ?summary.counts, "restore finished");
    Ok(summary)
}

/// Trimmed, non-empty natural-key field, or `None` when the row is
/// unrestorable.
fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

async fn restore_settings(
    tx: &mut Tx,
    rows: &[Setting],
    tenant: i64,
    options: RestoreOptions,
    summary: &mut RestoreSummary,
) -> Result<(), AppError> {
    summary.touch("settings");
    for (index, row) in rows.iter().enumerate() {
        let Some(key) = required(&row.key) else {
            if options.report_skips() {
                summary.skip("settings", index, "missing key");
            }
            continue;
        };

        let existing: Option<i64> =
            sqlx::query("SELECT id FROM settings WHERE key = ? AND tenant_id = ?")
                .bind(key)
                .bind(tenant)
                .fetch_optional(&mut **tx)
                .await?
                .map(|r| r.get("id"));

        match existing {
            Some(id) => {
                sqlx::query("UPDATE settings SET value = COALESCE(?, value), tenant_id = ? WHERE id = ?")
                    .bind(&row.value)
                    .bind(tenant)
                    .bind(id)
                    .execute(&mut **tx)
                    .await?;
            }
            None => {
                sqlx::query("INSERT INTO settings (tenant_id, key, value) VALUES (?, ?, ?)")
                    .bind(tenant)
                    .bind(key)
                    .bind(&row.value)
                    .execute(&mut **tx)
                    .await?;
            }
        }
        summary.tally("settings");
    }
    Ok(())
}

async fn restore_users(
    tx: &mut Tx,
    rows: &[User],
    tenant: i64,
    options: RestoreOptions,
    summary: &mut RestoreSummary,
    remap: &mut IdRemap,
) -> Result<(), AppError> {
    summary.touch("users");
    for (index, row) in rows.iter().enumerate() {
        let Some(email) = required(&row.email) else {
            if options.report_skips() {
                summary.skip("users", index, "missing email");
            }
            continue;
        };

        let existing: Option<i64> =
            sqlx::query("SELECT id FROM users WHERE email = ? AND tenant_id = ?")
                .bind(email)
                .bind(tenant)
                .fetch_optional(&mut **tx)
                .await?
                .map(|r| r.get("id"));

        let live_id = match existing {
            Some(id) => {
                sqlx::query(
                    "UPDATE users SET name = COALESCE(?, name), role = COALESCE(?, role), \
                     active = COALESCE(?, active), tenant_id = ? WHERE id = ?",
                )
                .bind(&row.name)
                .bind(&row.role)
                .bind(row.active.map(i64::from))
                .bind(tenant)
                .bind(id)
                .execute(&mut **tx)
                .await?;
                id
            }
            None => {
                let result = sqlx::query(
                    "INSERT INTO users (tenant_id, email, name, role, active, created_at) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(tenant)
                .bind(email)
                .bind(&row.name)
                .bind(&row.role)
                .bind(row.active.map(i64::from))
                .bind(row.created_at.clone().unwrap_or_else(|| Utc::now().to_rfc3339()))
                .execute(&mut **tx)
                .await?;
                result.last_insert_rowid()
            }
        };

        if row.id != 0 {
            remap.users.insert(row.id, live_id);
        }
        summary.tally("users");
    }
    Ok(())
}

async fn restore_departments(
    tx: &mut Tx,
    rows: &[Department],
    tenant: i64,
    options: RestoreOptions,
    summary: &mut RestoreSummary,
    remap: &mut IdRemap,
) -> Result<(), AppError> {
    summary.touch("departments");
    for (index, row) in rows.iter().enumerate() {
        let Some(name) = required(&row.name) else {
            if options.report_skips() {
                summary.skip("departments", index, "missing name");
            }
            continue;
        };

        let existing: Option<i64> =
            sqlx::query("SELECT id FROM departments WHERE name = ? AND tenant_id = ?")
                .bind(name)
                .bind(tenant)
                .fetch_optional(&mut **tx)
                .await?
                .map(|r| r.get("id"));

        let live_id = match existing {
            Some(id) => {
                sqlx::query(
                    "UPDATE departments SET description = COALESCE(?, description), \
                     tenant_id = ? WHERE id = ?",
                )
                .bind(&row.description)
                .bind(tenant)
                .bind(id)
                .execute(&mut **tx)
                .await?;
                id
            }
            None => {
                let result = sqlx::query(
                    "INSERT INTO departments (tenant_id, name, description) VALUES (?, ?, ?)",
                )
                .bind(tenant)
                .bind(name)
                .bind(&row.description)
                .execute(&mut **tx)
                .await?;
                result.last_insert_rowid()
            }
        };

        if row.id != 0 {
            remap.departments.insert(row.id, live_id);
        }
        summary.tally("departments");
    }
    Ok(())
}

async fn restore_members(
    tx: &mut Tx,
    rows: &[Member],
    tenant: i64,
    options: RestoreOptions,
    summary: &mut RestoreSummary,
    remap: &mut IdRemap,
) -> Result<(), AppError> {
    summary.touch("members");
    for (index, row) in rows.iter().enumerate() {
        let linked_user = row.user_id.map(|id| remap.user(id));

        let existing: Option<i64> = match linked_user {
            Some(user_id) => {
                sqlx::query("SELECT id FROM members WHERE user_id = ? AND tenant_id = ?")
                    .bind(user_id)
                    .bind(tenant)
                    .fetch_optional(&mut **tx)
                    .await?
                    .map(|r| r.get("id"))
            }
            None => {
                let (Some(first), Some(last)) =
                    (required(&row.first_name), required(&row.last_name))
                else {
                    if options.report_skips() {
                        summary.skip("members", index, "missing firstName or lastName");
                    }
                    continue;
                };
                // dob compares null-equal so legacy rows without a birthdate
                // still collapse onto the same person
                sqlx::query(
                    "SELECT id FROM members WHERE first_name = ? AND last_name = ? \
                     AND dob IS ? AND tenant_id = ?",
                )
                .bind(first)
                .bind(last)
                .bind(&row.dob)
                .bind(tenant)
                .fetch_optional(&mut **tx)
                .await?
                .map(|r| r.get("id"))
            }
        };

        let live_id = match existing {
            Some(id) => {
                sqlx::query(
                    "UPDATE members SET gender = COALESCE(?, gender), phone = COALESCE(?, phone), \
                     email = COALESCE(?, email), address = COALESCE(?, address), \
                     photo_url = COALESCE(?, photo_url), joined_at = COALESCE(?, joined_at), \
                     tenant_id = ? WHERE id = ?",
                )
                .bind(&row.gender)
                .bind(&row.phone)
                .bind(&row.email)
                .bind(&row.address)
                .bind(&row.photo_url)
                .bind(&row.joined_at)
                .bind(tenant)
                .bind(id)
                .execute(&mut **tx)
                .await?;
                id
            }
            None => {
                let result = sqlx::query(
                    "INSERT INTO members (tenant_id, user_id, first_name, last_name, dob, gender, \
                     phone, email, address, photo_url, joined_at, created_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(tenant)
                .bind(linked_user)
                .bind(&row.first_name)
                .bind(&row.last_name)
                .bind(&row.dob)
                .bind(&row.gender)
                .bind(&row.phone)
                .bind(&row.email)
                .bind(&row.address)
                .bind(&row.photo_url)
                .bind(&row.joined_at)
                .bind(row.created_at.clone().unwrap_or_else(|| Utc::now().to_rfc3339()))
                .execute(&mut **tx)
                .await?;
                result.last_insert_rowid()
            }
        };

        if row.id != 0 {
            remap.members.insert(row.id, live_id);
        }
        summary.tally("members");
    }
    Ok(())
}

async fn restore_events(
    tx: &mut Tx,
    rows: &[Event],
    tenant: i64,
    options: RestoreOptions,
    summary: &mut RestoreSummary,
    remap: &IdRemap,
) -> Result<(), AppError> {
    summary.touch("events");
    for (index, row) in rows.iter().enumerate() {
        let (Some(title), Some(date)) = (required(&row.title), required(&row.date)) else {
            if options.report_skips() {
                summary.skip("events", index, "missing title or date");
            }
            continue;
        };
        let department = row.department_id.map(|id| remap.department(id));

        let existing: Option<i64> =
            sqlx::query("SELECT id FROM events WHERE title = ? AND date = ? AND tenant_id = ?")
                .bind(title)
                .bind(date)
                .bind(tenant)
                .fetch_optional(&mut **tx)
                .await?
                .map(|r| r.get("id"));

        match existing {
            Some(id) => {
                sqlx::query(
                    "UPDATE events SET department_id = COALESCE(?, department_id), \
                     location = COALESCE(?, location), description = COALESCE(?, description), \
                     tenant_id = ? WHERE id = ?",
                )
                .bind(department)
                .bind(&row.location)
                .bind(&row.description)
                .bind(tenant)
                .bind(id)
                .execute(&mut **tx)
                .await?;
            }
            None => {
                sqlx::query(
                    "INSERT INTO events (tenant_id, title, date, department_id, location, description) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(tenant)
                .bind(title)
                .bind(date)
                .bind(department)
                .bind(&row.location)
                .bind(&row.description)
                .execute(&mut **tx)
                .await?;
            }
        }
        summary.tally("events");
    }
    Ok(())
}

async fn restore_programs(
    tx: &mut Tx,
    rows: &[Program],
    tenant: i64,
    options: RestoreOptions,
    summary: &mut RestoreSummary,
) -> Result<(), AppError> {
    summary.touch("programs");
    for (index, row) in rows.iter().enumerate() {
        let (Some(name), Some(start_date)) = (required(&row.name), required(&row.start_date))
        else {
            if options.report_skips() {
                summary.skip("programs", index, "missing name or startDate");
            }
            continue;
        };

        let existing: Option<i64> = sqlx::query(
            "SELECT id FROM programs WHERE name = ? AND start_date = ? AND tenant_id = ?",
        )
        .bind(name)
        .bind(start_date)
        .bind(tenant)
        .fetch_optional(&mut **tx)
        .await?
        .map(|r| r.get("id"));

        match existing {
            Some(id) => {
                sqlx::query(
                    "UPDATE programs SET end_date = COALESCE(?, end_date), \
                     description = COALESCE(?, description), tenant_id = ? WHERE id = ?",
                )
                .bind(&row.end_date)
                .bind(&row.description)
                .bind(tenant)
                .bind(id)
                .execute(&mut **tx)
                .await?;
            }
            None => {
                sqlx::query(
                    "INSERT INTO programs (tenant_id, name, start_date, end_date, description) \
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(tenant)
                .bind(name)
                .bind(start_date)
                .bind(&row.end_date)
                .bind(&row.description)
                .execute(&mut **tx)
                .await?;
            }
        }
        summary.tally("programs");
    }
    Ok(())
}

async fn restore_cell_groups(
    tx: &mut Tx,
    rows: &[CellGroup],
    tenant: i64,
    options: RestoreOptions,
    summary: &mut RestoreSummary,
    remap: &IdRemap,
) -> Result<(), AppError> {
    summary.touch("cellGroups");
    for (index, row) in rows.iter().enumerate() {
        let Some(name) = required(&row.name) else {
            if options.report_skips() {
                summary.skip("cellGroups", index, "missing name");
            }
            continue;
        };
        let leader = row.leader_member_id.map(|id| remap.member(id));

        let existing: Option<i64> =
            sqlx::query("SELECT id FROM cell_groups WHERE name = ? AND tenant_id = ?")
                .bind(name)
                .bind(tenant)
                .fetch_optional(&mut **tx)
                .await?
                .map(|r| r.get("id"));

        match existing {
            Some(id) => {
                sqlx::query(
                    "UPDATE cell_groups SET leader_member_id = COALESCE(?, leader_member_id), \
                     description = COALESCE(?, description), tenant_id = ? WHERE id = ?",
                )
                .bind(leader)
                .bind(&row.description)
                .bind(tenant)
                .bind(id)
                .execute(&mut **tx)
                .await?;
            }
            None => {
                sqlx::query(
                    "INSERT INTO cell_groups (tenant_id, name, leader_member_id, description) \
                     VALUES (?, ?, ?, ?)",
                )
                .bind(tenant)
                .bind(name)
                .bind(leader)
                .bind(&row.description)
                .execute(&mut **tx)
                .await?;
            }
        }
        summary.tally("cellGroups");
    }
    Ok(())
}

async fn restore_councils(
    tx: &mut Tx,
    rows: &[Council],
    tenant: i64,
    options: RestoreOptions,
    summary: &mut RestoreSummary,
    remap: &IdRemap,
) -> Result<(), AppError> {
    summary.touch("councils");
    for (index, row) in rows.iter().enumerate() {
        let Some(name) = required(&row.name) else {
            if options.report_skips() {
                summary.skip("councils", index, "missing name");
            }
            continue;
        };

        let existing: Option<i64> =
            sqlx::query("SELECT id FROM councils WHERE name = ? AND tenant_id = ?")
                .bind(name)
                .bind(tenant)
                .fetch_optional(&mut **tx)
                .await?
                .map(|r| r.get("id"));

        let live_id = match existing {
            Some(id) => {
                sqlx::query("UPDATE councils SET year = COALESCE(?, year), tenant_id = ? WHERE id = ?")
                    .bind(row.year)
                    .bind(tenant)
                    .bind(id)
                    .execute(&mut **tx)
                    .await?;
                id
            }
            None => {
                let result =
                    sqlx::query("INSERT INTO councils (tenant_id, name, year) VALUES (?, ?, ?)")
                        .bind(tenant)
                        .bind(name)
                        .bind(row.year)
                        .execute(&mut **tx)
                        .await?;
                result.last_insert_rowid()
            }
        };

        for link in &row.members {
            let Some(member_id) = link.member_id.map(|id| remap.member(id)) else {
                continue;
            };
            upsert_link(tx, "council_members", "council_id", live_id, member_id, &link.role)
                .await?;
        }
        summary.tally("councils");
    }
    Ok(())
}

async fn restore_committees(
    tx: &mut Tx,
    rows: &[Committee],
    tenant: i64,
    options: RestoreOptions,
    summary: &mut RestoreSummary,
    remap: &IdRemap,
) -> Result<(), AppError> {
    summary.touch("committees");
    for (index, row) in rows.iter().enumerate() {
        let Some(name) = required(&row.name) else {
            if options.report_skips() {
                summary.skip("committees", index, "missing name");
            }
            continue;
        };

        let existing: Option<i64> =
            sqlx::query("SELECT id FROM committees WHERE name = ? AND tenant_id = ?")
                .bind(name)
                .bind(tenant)
                .fetch_optional(&mut **tx)
                .await?
                .map(|r| r.get("id"));

        let live_id = match existing {
            Some(id) => {
                sqlx::query(
                    "UPDATE committees SET purpose = COALESCE(?, purpose), tenant_id = ? WHERE id = ?",
                )
                .bind(&row.purpose)
                .bind(tenant)
                .bind(id)
                .execute(&mut **tx)
                .await?;
                id
            }
            None => {
                let result = sqlx::query(
                    "INSERT INTO committees (tenant_id, name, purpose) VALUES (?, ?, ?)",
                )
                .bind(tenant)
                .bind(name)
                .bind(&row.purpose)
                .execute(&mut **tx)
                .await?;
                result.last_insert_rowid()
            }
        };

        for link in &row.members {
            let Some(member_id) = link.member_id.map(|id| remap.member(id)) else {
                continue;
            };
            upsert_link(tx, "committee_members", "committee_id", live_id, member_id, &link.role)
                .await?;
        }
        summary.tally("committees");
    }
    Ok(())
}

/// Insert-if-absent on a membership join row, keyed by the composite
/// (owner id, member id).
async fn upsert_link(
    tx: &mut Tx,
    table: &str,
    owner_column: &str,
    owner_id: i64,
    member_id: i64,
    role: &Option<String>,
) -> Result<(), AppError> {
    let existing = sqlx::query(&format!(
        "SELECT id FROM {table} WHERE {owner_column} = ? AND member_id = ?"
    ))
    .bind(owner_id)
    .bind(member_id)
    .fetch_optional(&mut **tx)
    .await?;

    if existing.is_none() {
        sqlx::query(&format!(
            "INSERT INTO {table} ({owner_column}, member_id, role) VALUES (?, ?, ?)"
        ))
        .bind(owner_id)
        .bind(member_id)
        .bind(role)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn restore_sermons(
    tx: &mut Tx,
    rows: &[Sermon],
    tenant: i64,
    options: RestoreOptions,
    summary: &mut RestoreSummary,
) -> Result<(), AppError> {
    summary.touch("sermons");
    for (index, row) in rows.iter().enumerate() {
        let (Some(title), Some(date)) = (required(&row.title), required(&row.date)) else {
            if options.report_skips() {
                summary.skip("sermons", index, "missing title or date");
            }
            continue;
        };

        let existing: Option<i64> =
            sqlx::query("SELECT id FROM sermons WHERE title = ? AND date = ? AND tenant_id = ?")
                .bind(title)
                .bind(date)
                .bind(tenant)
                .fetch_optional(&mut **tx)
                .await?
                .map(|r| r.get("id"));

        match existing {
            Some(id) => {
                sqlx::query(
                    "UPDATE sermons SET speaker = COALESCE(?, speaker), \
                     scripture = COALESCE(?, scripture), summary = COALESCE(?, summary), \
                     tenant_id = ? WHERE id = ?",
                )
                .bind(&row.speaker)
                .bind(&row.scripture)
                .bind(&row.summary)
                .bind(tenant)
                .bind(id)
                .execute(&mut **tx)
                .await?;
            }
            None => {
                sqlx::query(
                    "INSERT INTO sermons (tenant_id, title, date, speaker, scripture, summary) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(tenant)
                .bind(title)
                .bind(date)
                .bind(&row.speaker)
                .bind(&row.scripture)
                .bind(&row.summary)
                .execute(&mut **tx)
                .await?;
            }
        }
        summary.tally("sermons");
    }
    Ok(())
}

async fn restore_announcements(
    tx: &mut Tx,
    rows: &[Announcement],
    tenant: i64,
    options: RestoreOptions,
    summary: &mut RestoreSummary,
) -> Result<(), AppError> {
    summary.touch("announcements");
    for (index, row) in rows.iter().enumerate() {
        let (Some(title), Some(created_at)) = (required(&row.title), required(&row.created_at))
        else {
            if options.report_skips() {
                summary.skip("announcements", index, "missing title or createdAt");
            }
            continue;
        };

        let existing: Option<i64> = sqlx::query(
            "SELECT id FROM announcements WHERE title = ? AND created_at = ? AND tenant_id = ?",
        )
        .bind(title)
        .bind(created_at)
        .bind(tenant)
        .fetch_optional(&mut **tx)
        .await?
        .map(|r| r.get("id"));

        // Historical communications are append-only: a match is counted but
        // never updated.
        if existing.is_none() {
            sqlx::query(
                "INSERT INTO announcements (tenant_id, title, body, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(tenant)
            .bind(title)
            .bind(&row.body)
            .bind(created_at)
            .execute(&mut **tx)
            .await?;
        }
        summary.tally("announcements");
    }
    Ok(())
}
