//! Backup, consistency-validation and non-destructive restore core.
//!
//! The exporter reads the store into an in-memory [`crate::models::Snapshot`];
//! the archive module turns snapshots into durable (optionally encrypted)
//! files; the catalog lists them; the validator scans for dangling relational
//! references; the restore engine merges a payload back by natural keys; and
//! recovery scans the catalog for a snapshot containing a named member.

pub mod archive;
pub mod catalog;
pub mod exporter;
pub mod recovery;
pub mod restore;
pub mod scheduler;
pub mod validator;
