//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all entity collections. Every table is
//! tenant-scoped through a nullable `tenant_id` column.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER,
            key TEXT NOT NULL,
            value TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER,
            email TEXT NOT NULL,
            name TEXT,
            role TEXT,
            active INTEGER,
            created_at TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER,
            user_id INTEGER,
            first_name TEXT,
            last_name TEXT,
            dob TEXT,
            gender TEXT,
            phone TEXT,
            email TEXT,
            address TEXT,
            photo_url TEXT,
            joined_at TEXT,
            created_at TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS departments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER,
            name TEXT NOT NULL,
            description TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER,
            title TEXT NOT NULL,
            date TEXT,
            department_id INTEGER,
            location TEXT,
            description TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS announcements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER,
            title TEXT NOT NULL,
            body TEXT,
            created_at TEXT
        );

        CREATE TABLE IF NOT EXISTS sermons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER,
            title TEXT NOT NULL,
            date TEXT,
            speaker TEXT,
            scripture TEXT,
            summary TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS finance_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER,
            category TEXT,
            amount REAL,
            date TEXT,
            memo TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER,
            service_name TEXT,
            date TEXT
        );

        CREATE TABLE IF NOT EXISTS attendance_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            record_id INTEGER NOT NULL,
            member_id INTEGER,
            status TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS councils (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER,
            name TEXT NOT NULL,
            year INTEGER
        );

        CREATE TABLE IF NOT EXISTS council_members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            council_id INTEGER NOT NULL,
            member_id INTEGER NOT NULL,
            role TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS committees (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER,
            name TEXT NOT NULL,
            purpose TEXT
        );

        CREATE TABLE IF NOT EXISTS committee_members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            committee_id INTEGER NOT NULL,
            member_id INTEGER NOT NULL,
            role TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS minutes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER,
            kind TEXT NOT NULL,
            title TEXT,
            meeting_date TEXT
        );

        CREATE TABLE IF NOT EXISTS minutes_versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            minutes_id INTEGER NOT NULL,
            version_no INTEGER,
            content TEXT,
            created_at TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS programs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER,
            name TEXT NOT NULL,
            start_date TEXT,
            end_date TEXT,
            description TEXT
        );

        CREATE TABLE IF NOT EXISTS cell_groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER,
            name TEXT NOT NULL,
            leader_member_id INTEGER,
            description TEXT
        );

        CREATE TABLE IF NOT EXISTS cell_group_memberships (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER,
            cell_group_id INTEGER,
            member_id INTEGER,
            joined_at TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_users_tenant_email ON users(tenant_id, email);
        CREATE INDEX IF NOT EXISTS idx_members_tenant ON members(tenant_id);
        CREATE INDEX IF NOT EXISTS idx_members_user ON members(user_id);
        CREATE INDEX IF NOT EXISTS idx_members_name ON members(first_name, last_name);
        CREATE INDEX IF NOT EXISTS idx_departments_tenant_name ON departments(tenant_id, name);
        CREATE INDEX IF NOT EXISTS idx_events_tenant_title ON events(tenant_id, title);
        CREATE INDEX IF NOT EXISTS idx_council_members_council ON council_members(council_id);
        CREATE INDEX IF NOT EXISTS idx_committee_members_committee ON committee_members(committee_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
