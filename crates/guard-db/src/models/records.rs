//! Join and quit record database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for join_records table
#[derive(Debug, Clone, FromRow)]
pub struct JoinRecordModel {
    pub id: i64,
    pub user_id: i64,
    pub group_id: i64,
    pub join_time: DateTime<Utc>,
}

/// Database model for quit_records table
#[derive(Debug, Clone, FromRow)]
pub struct QuitRecordModel {
    pub user_id: i64,
    pub group_id: i64,
    pub quit_time: DateTime<Utc>,
    pub quit_type: String,
}
