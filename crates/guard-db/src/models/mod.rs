//! Database models - SQLx-compatible structs for SQLite tables

mod member;
mod records;

pub use member::GroupMemberModel;
pub use records::{JoinRecordModel, QuitRecordModel};
