//! Stored roster row

use sqlx::FromRow;

/// Database model for group_members table
#[derive(Debug, Clone, Copy, FromRow)]
pub struct GroupMemberModel {
    pub group_id: i64,
    pub user_id: i64,
}
