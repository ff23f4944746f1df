//! SQLite implementation of QuitRecordRepository

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::instrument;

use guard_core::entities::QuitRecord;
use guard_core::traits::{QuitRecordRepository, RepoResult};
use guard_core::value_objects::UserId;

use crate::models::QuitRecordModel;

use super::error::map_db_error;

/// SQLite implementation of QuitRecordRepository
#[derive(Clone)]
pub struct SqliteQuitRecordRepository {
    pool: SqlitePool,
}

impl SqliteQuitRecordRepository {
    /// Create a new SqliteQuitRecordRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuitRecordRepository for SqliteQuitRecordRepository {
    #[instrument(skip(self), fields(user_id = %record.user_id, group_id = %record.group_id, quit_type = %record.quit_type))]
    async fn insert(&self, record: &QuitRecord) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            INSERT OR IGNORE INTO quit_records (user_id, group_id, quit_time, quit_type)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(record.user_id.into_inner())
        .bind(record.group_id.into_inner())
        .bind(record.quit_time)
        .bind(record.quit_type.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn find_by_user(&self, user_id: UserId) -> RepoResult<Vec<QuitRecord>> {
        let rows = sqlx::query_as::<_, QuitRecordModel>(
            r"
            SELECT user_id, group_id, quit_time, quit_type
            FROM quit_records
            WHERE user_id = $1
            ORDER BY quit_time ASC
            ",
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(QuitRecord::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn delete_by_user(&self, user_id: UserId) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            DELETE FROM quit_records WHERE user_id = $1
            ",
        )
        .bind(user_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}
