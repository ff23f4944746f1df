//! SQLite implementation of JoinRecordRepository

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::instrument;

use guard_core::entities::JoinRecord;
use guard_core::traits::{JoinRecordRepository, RepoResult};
use guard_core::value_objects::UserId;

use super::error::map_db_error;

/// SQLite implementation of JoinRecordRepository
#[derive(Clone)]
pub struct SqliteJoinRecordRepository {
    pool: SqlitePool,
}

impl SqliteJoinRecordRepository {
    /// Create a new SqliteJoinRecordRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JoinRecordRepository for SqliteJoinRecordRepository {
    #[instrument(skip(self), fields(user_id = %record.user_id, group_id = %record.group_id))]
    async fn insert(&self, record: &JoinRecord) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO join_records (user_id, group_id, join_time)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(record.user_id.into_inner())
        .bind(record.group_id.into_inner())
        .bind(record.join_time)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %record.user_id, group_id = %record.group_id))]
    async fn insert_many(&self, record: &JoinRecord, copies: u32) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        for _ in 0..copies {
            sqlx::query(
                r"
                INSERT INTO join_records (user_id, group_id, join_time)
                VALUES ($1, $2, $3)
                ",
            )
            .bind(record.user_id.into_inner())
            .bind(record.group_id.into_inner())
            .bind(record.join_time)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn count_by_user(&self, user_id: UserId) -> RepoResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM join_records WHERE user_id = $1
            ",
        )
        .bind(user_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(count)
    }

    #[instrument(skip(self))]
    async fn delete_by_user(&self, user_id: UserId) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            DELETE FROM join_records WHERE user_id = $1
            ",
        )
        .bind(user_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}
