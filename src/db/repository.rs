//! Database repository for collection reads and the transactional write path.
//!
//! Reads are tenant-filtered when a tenant is given; passing `None` aggregates
//! across all tenants (operator-only mode). All restore writes go through a
//! single transaction obtained from [`Repository::begin`].

use std::collections::HashMap;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::errors::AppError;
use crate::models::{
    Announcement, AttendanceEntry, AttendanceRecord, CellGroup, CellGroupMembership, Committee,
    CommitteeMember, Council, CouncilMember, Department, Event, FinanceRecord, Member, Minutes,
    MinutesVersion, Program, Sermon, Setting, User,
};

/// Database repository for all collection operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Begin a transaction for the restore write path.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        Ok(self.pool.begin().await?)
    }

    /// Fetch rows from a base SELECT, appending a tenant filter when scoped.
    async fn fetch_scoped(
        &self,
        base_sql: &str,
        tenant: Option<i64>,
    ) -> Result<Vec<SqliteRow>, AppError> {
        let rows = match tenant {
            Some(t) => {
                sqlx::query(&format!("{base_sql} WHERE tenant_id = ?"))
                    .bind(t)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => sqlx::query(base_sql).fetch_all(&self.pool).await?,
        };
        Ok(rows)
    }

    // ==================== FLAT COLLECTIONS ====================

    pub async fn list_settings(&self, tenant: Option<i64>) -> Result<Vec<Setting>, AppError> {
        let rows = self
            .fetch_scoped("SELECT id, tenant_id, key, value FROM settings", tenant)
            .await?;
        Ok(rows.iter().map(setting_from_row).collect())
    }

    pub async fn list_users(&self, tenant: Option<i64>) -> Result<Vec<User>, AppError> {
        let rows = self
            .fetch_scoped(
                "SELECT id, tenant_id, email, name, role, active, created_at FROM users",
                tenant,
            )
            .await?;
        Ok(rows.iter().map(user_from_row).collect())
    }

    pub async fn list_members(&self, tenant: Option<i64>) -> Result<Vec<Member>, AppError> {
        let rows = self
            .fetch_scoped(
                "SELECT id, tenant_id, user_id, first_name, last_name, dob, gender, phone, \
                 email, address, photo_url, joined_at, created_at FROM members",
                tenant,
            )
            .await?;
        Ok(rows.iter().map(member_from_row).collect())
    }

    pub async fn list_departments(&self, tenant: Option<i64>) -> Result<Vec<Department>, AppError> {
        let rows = self
            .fetch_scoped(
                "SELECT id, tenant_id, name, description FROM departments",
                tenant,
            )
            .await?;
        Ok(rows.iter().map(department_from_row).collect())
    }

    pub async fn list_events(&self, tenant: Option<i64>) -> Result<Vec<Event>, AppError> {
        let rows = self
            .fetch_scoped(
                "SELECT id, tenant_id, title, date, department_id, location, description FROM events",
                tenant,
            )
            .await?;
        Ok(rows.iter().map(event_from_row).collect())
    }

    pub async fn list_announcements(
        &self,
        tenant: Option<i64>,
    ) -> Result<Vec<Announcement>, AppError> {
        let rows = self
            .fetch_scoped(
                "SELECT id, tenant_id, title, body, created_at FROM announcements",
                tenant,
            )
            .await?;
        Ok(rows.iter().map(announcement_from_row).collect())
    }

    pub async fn list_sermons(&self, tenant: Option<i64>) -> Result<Vec<Sermon>, AppError> {
        let rows = self
            .fetch_scoped(
                "SELECT id, tenant_id, title, date, speaker, scripture, summary FROM sermons",
                tenant,
            )
            .await?;
        Ok(rows.iter().map(sermon_from_row).collect())
    }

    pub async fn list_finance_records(
        &self,
        tenant: Option<i64>,
    ) -> Result<Vec<FinanceRecord>, AppError> {
        let rows = self
            .fetch_scoped(
                "SELECT id, tenant_id, category, amount, date, memo FROM finance_records",
                tenant,
            )
            .await?;
        Ok(rows.iter().map(finance_from_row).collect())
    }

    pub async fn list_programs(&self, tenant: Option<i64>) -> Result<Vec<Program>, AppError> {
        let rows = self
            .fetch_scoped(
                "SELECT id, tenant_id, name, start_date, end_date, description FROM programs",
                tenant,
            )
            .await?;
        Ok(rows.iter().map(program_from_row).collect())
    }

    pub async fn list_cell_groups(&self, tenant: Option<i64>) -> Result<Vec<CellGroup>, AppError> {
        let rows = self
            .fetch_scoped(
                "SELECT id, tenant_id, name, leader_member_id, description FROM cell_groups",
                tenant,
            )
            .await?;
        Ok(rows.iter().map(cell_group_from_row).collect())
    }

    pub async fn list_cell_group_memberships(
        &self,
        tenant: Option<i64>,
    ) -> Result<Vec<CellGroupMembership>, AppError> {
        let rows = self
            .fetch_scoped(
                "SELECT id, tenant_id, cell_group_id, member_id, joined_at \
                 FROM cell_group_memberships",
                tenant,
            )
            .await?;
        Ok(rows.iter().map(cell_membership_from_row).collect())
    }

    // ==================== NESTED COLLECTIONS ====================

    pub async fn list_attendance_records(
        &self,
        tenant: Option<i64>,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let rows = self
            .fetch_scoped(
                "SELECT id, tenant_id, service_name, date FROM attendance_records",
                tenant,
            )
            .await?;
        let mut records: Vec<AttendanceRecord> = rows.iter().map(attendance_from_row).collect();

        let entry_rows =
            sqlx::query("SELECT id, record_id, member_id, status FROM attendance_entries")
                .fetch_all(&self.pool)
                .await?;
        let mut by_record: HashMap<i64, Vec<AttendanceEntry>> = HashMap::new();
        for row in &entry_rows {
            let entry = AttendanceEntry {
                id: row.get("id"),
                record_id: row.get("record_id"),
                member_id: row.get("member_id"),
                status: row.get("status"),
            };
            if let Some(record_id) = entry.record_id {
                by_record.entry(record_id).or_default().push(entry);
            }
        }
        for record in &mut records {
            record.entries = by_record.remove(&record.id).unwrap_or_default();
        }
        Ok(records)
    }

    pub async fn list_councils(&self, tenant: Option<i64>) -> Result<Vec<Council>, AppError> {
        let rows = self
            .fetch_scoped("SELECT id, tenant_id, name, year FROM councils", tenant)
            .await?;
        let mut councils: Vec<Council> = rows.iter().map(council_from_row).collect();

        let link_rows = sqlx::query("SELECT id, council_id, member_id, role FROM council_members")
            .fetch_all(&self.pool)
            .await?;
        let mut by_council: HashMap<i64, Vec<CouncilMember>> = HashMap::new();
        for row in &link_rows {
            let link = council_link_from_row(row);
            if let Some(council_id) = link.council_id {
                by_council.entry(council_id).or_default().push(link);
            }
        }
        for council in &mut councils {
            council.members = by_council.remove(&council.id).unwrap_or_default();
        }
        Ok(councils)
    }

    pub async fn list_committees(&self, tenant: Option<i64>) -> Result<Vec<Committee>, AppError> {
        let rows = self
            .fetch_scoped("SELECT id, tenant_id, name, purpose FROM committees", tenant)
            .await?;
        let mut committees: Vec<Committee> = rows.iter().map(committee_from_row).collect();

        let link_rows =
            sqlx::query("SELECT id, committee_id, member_id, role FROM committee_members")
                .fetch_all(&self.pool)
                .await?;
        let mut by_committee: HashMap<i64, Vec<CommitteeMember>> = HashMap::new();
        for row in &link_rows {
            let link = committee_link_from_row(row);
            if let Some(committee_id) = link.committee_id {
                by_committee.entry(committee_id).or_default().push(link);
            }
        }
        for committee in &mut committees {
            committee.members = by_committee.remove(&committee.id).unwrap_or_default();
        }
        Ok(committees)
    }

    pub async fn list_board_minutes(&self, tenant: Option<i64>) -> Result<Vec<Minutes>, AppError> {
        self.list_minutes("board", tenant).await
    }

    pub async fn list_business_minutes(
        &self,
        tenant: Option<i64>,
    ) -> Result<Vec<Minutes>, AppError> {
        self.list_minutes("business", tenant).await
    }

    async fn list_minutes(&self, kind: &str, tenant: Option<i64>) -> Result<Vec<Minutes>, AppError> {
        let rows = match tenant {
            Some(t) => {
                sqlx::query(
                    "SELECT id, tenant_id, title, meeting_date FROM minutes \
                     WHERE kind = ? AND tenant_id = ?",
                )
                .bind(kind)
                .bind(t)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT id, tenant_id, title, meeting_date FROM minutes WHERE kind = ?")
                    .bind(kind)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        let mut minutes: Vec<Minutes> = rows.iter().map(minutes_from_row).collect();

        let version_rows = sqlx::query(
            "SELECT id, minutes_id, version_no, content, created_at FROM minutes_versions",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut by_minutes: HashMap<i64, Vec<MinutesVersion>> = HashMap::new();
        for row in &version_rows {
            let version = MinutesVersion {
                id: row.get("id"),
                minutes_id: row.get("minutes_id"),
                version_no: row.get("version_no"),
                content: row.get("content"),
                created_at: row.get("created_at"),
            };
            if let Some(minutes_id) = version.minutes_id {
                by_minutes.entry(minutes_id).or_default().push(version);
            }
        }
        for item in &mut minutes {
            item.versions = by_minutes.remove(&item.id).unwrap_or_default();
        }
        Ok(minutes)
    }

    // ==================== JOIN-ROW READS ====================

    // Membership links have no tenant column of their own; tenant scope is
    // derived from the owning council/committee.

    pub async fn list_council_links(
        &self,
        tenant: Option<i64>,
    ) -> Result<Vec<CouncilMember>, AppError> {
        let rows = match tenant {
            Some(t) => {
                sqlx::query(
                    "SELECT cm.id, cm.council_id, cm.member_id, cm.role FROM council_members cm \
                     JOIN councils c ON c.id = cm.council_id WHERE c.tenant_id = ?",
                )
                .bind(t)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT id, council_id, member_id, role FROM council_members")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows.iter().map(council_link_from_row).collect())
    }

    pub async fn list_committee_links(
        &self,
        tenant: Option<i64>,
    ) -> Result<Vec<CommitteeMember>, AppError> {
        let rows = match tenant {
            Some(t) => {
                sqlx::query(
                    "SELECT cm.id, cm.committee_id, cm.member_id, cm.role FROM committee_members cm \
                     JOIN committees c ON c.id = cm.committee_id WHERE c.tenant_id = ?",
                )
                .bind(t)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT id, committee_id, member_id, role FROM committee_members")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows.iter().map(committee_link_from_row).collect())
    }
}

// Helper functions for row conversion

fn setting_from_row(row: &SqliteRow) -> Setting {
    Setting {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        key: row.get("key"),
        value: row.get("value"),
    }
}

fn user_from_row(row: &SqliteRow) -> User {
    let active: Option<i64> = row.get("active");
    User {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        email: row.get("email"),
        name: row.get("name"),
        role: row.get("role"),
        active: active.map(|v| v != 0),
        created_at: row.get("created_at"),
    }
}

fn member_from_row(row: &SqliteRow) -> Member {
    Member {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        user_id: row.get("user_id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        dob: row.get("dob"),
        gender: row.get("gender"),
        phone: row.get("phone"),
        email: row.get("email"),
        address: row.get("address"),
        photo_url: row.get("photo_url"),
        joined_at: row.get("joined_at"),
        created_at: row.get("created_at"),
    }
}

fn department_from_row(row: &SqliteRow) -> Department {
    Department {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        name: row.get("name"),
        description: row.get("description"),
    }
}

fn event_from_row(row: &SqliteRow) -> Event {
    Event {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        title: row.get("title"),
        date: row.get("date"),
        department_id: row.get("department_id"),
        location: row.get("location"),
        description: row.get("description"),
    }
}

fn announcement_from_row(row: &SqliteRow) -> Announcement {
    Announcement {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        title: row.get("title"),
        body: row.get("body"),
        created_at: row.get("created_at"),
    }
}

fn sermon_from_row(row: &SqliteRow) -> Sermon {
    Sermon {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        title: row.get("title"),
        date: row.get("date"),
        speaker: row.get("speaker"),
        scripture: row.get("scripture"),
        summary: row.get("summary"),
    }
}

fn finance_from_row(row: &SqliteRow) -> FinanceRecord {
    FinanceRecord {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        category: row.get("category"),
        amount: row.get("amount"),
        date: row.get("date"),
        memo: row.get("memo"),
    }
}

fn attendance_from_row(row: &SqliteRow) -> AttendanceRecord {
    AttendanceRecord {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        service_name: row.get("service_name"),
        date: row.get("date"),
        entries: Vec::new(),
    }
}

fn council_from_row(row: &SqliteRow) -> Council {
    Council {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        name: row.get("name"),
        year: row.get("year"),
        members: Vec::new(),
    }
}

fn council_link_from_row(row: &SqliteRow) -> CouncilMember {
    CouncilMember {
        id: row.get("id"),
        council_id: row.get("council_id"),
        member_id: row.get("member_id"),
        role: row.get("role"),
    }
}

fn committee_from_row(row: &SqliteRow) -> Committee {
    Committee {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        name: row.get("name"),
        purpose: row.get("purpose"),
        members: Vec::new(),
    }
}

fn committee_link_from_row(row: &SqliteRow) -> CommitteeMember {
    CommitteeMember {
        id: row.get("id"),
        committee_id: row.get("committee_id"),
        member_id: row.get("member_id"),
        role: row.get("role"),
    }
}

fn minutes_from_row(row: &SqliteRow) -> Minutes {
    Minutes {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        title: row.get("title"),
        meeting_date: row.get("meeting_date"),
        versions: Vec::new(),
    }
}

fn program_from_row(row: &SqliteRow) -> Program {
    Program {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        name: row.get("name"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        description: row.get("description"),
    }
}

fn cell_group_from_row(row: &SqliteRow) -> CellGroup {
    CellGroup {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        name: row.get("name"),
        leader_member_id: row.get("leader_member_id"),
        description: row.get("description"),
    }
}

fn cell_membership_from_row(row: &SqliteRow) -> CellGroupMembership {
    CellGroupMembership {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        cell_group_id: row.get("cell_group_id"),
        member_id: row.get("member_id"),
        joined_at: row.get("joined_at"),
    }
}
