//! Data models for the FaithConnect backup subsystem.
//!
//! Every collection struct doubles as the snapshot archive record for that
//! collection: container-level `#[serde(default)]` lets a partial or legacy
//! payload row deserialize with absent fields as `None`, which is what the
//! restore engine's leniency policy operates on.

mod activities;
mod governance;
mod people;
mod records;
mod snapshot;

pub use activities::*;
pub use governance::*;
pub use people::*;
pub use records::*;
pub use snapshot::*;
