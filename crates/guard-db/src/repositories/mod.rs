//! Repository implementations
//!
//! SQLite implementations of the repository traits defined in guard-core.

mod error;
mod join_record;
mod membership;
mod quit_record;

pub use join_record::SqliteJoinRecordRepository;
pub use membership::SqliteMembershipRepository;
pub use quit_record::SqliteQuitRecordRepository;
