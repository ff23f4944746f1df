//! SQLite implementation of MembershipRepository

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use guard_core::entities::{MembershipSnapshot, QuitRecord, QuitType};
use guard_core::traits::{MembershipRepository, RepoResult};
use guard_core::value_objects::{GroupId, UserId};

use crate::mappers::snapshot_from_rows;
use crate::models::GroupMemberModel;

use super::error::map_db_error;

/// SQLite implementation of MembershipRepository
#[derive(Clone)]
pub struct SqliteMembershipRepository {
    pool: SqlitePool,
}

impl SqliteMembershipRepository {
    /// Create a new SqliteMembershipRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for SqliteMembershipRepository {
    #[instrument(skip(self))]
    async fn load_snapshot(&self) -> RepoResult<MembershipSnapshot> {
        let rows = sqlx::query_as::<_, GroupMemberModel>(
            r"
            SELECT group_id, user_id FROM group_members
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(snapshot_from_rows(rows))
    }

    #[instrument(skip(self))]
    async fn members_of(&self, group_id: GroupId) -> RepoResult<HashSet<UserId>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r"
            SELECT user_id FROM group_members WHERE group_id = $1
            ",
        )
        .bind(group_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(ids.into_iter().map(UserId::new).collect())
    }

    #[instrument(skip(self))]
    async fn groups_of(&self, user_id: UserId) -> RepoResult<Vec<GroupId>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r"
            SELECT group_id FROM group_members
            WHERE user_id = $1
            ORDER BY group_id
            ",
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(ids.into_iter().map(GroupId::new).collect())
    }

    #[instrument(skip(self, live), fields(live = live.len()))]
    async fn reconcile_group(
        &self,
        group_id: GroupId,
        live: &HashSet<UserId>,
        at: DateTime<Utc>,
    ) -> RepoResult<Vec<UserId>> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let stored: HashSet<UserId> = sqlx::query_scalar::<_, i64>(
            r"
            SELECT user_id FROM group_members WHERE group_id = $1
            ",
        )
        .bind(group_id.into_inner())
        .fetch_all(&mut *tx)
        .await
        .map_err(map_db_error)?
        .into_iter()
        .map(UserId::new)
        .collect();

        let mut departed: Vec<UserId> = stored.difference(live).copied().collect();
        departed.sort_unstable();

        for user_id in &departed {
            sqlx::query(
                r"
                INSERT OR IGNORE INTO quit_records (user_id, group_id, quit_time, quit_type)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(user_id.into_inner())
            .bind(group_id.into_inner())
            .bind(at)
            .bind(QuitType::Leave.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        sqlx::query(
            r"
            DELETE FROM group_members WHERE group_id = $1
            ",
        )
        .bind(group_id.into_inner())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        for user_id in live {
            sqlx::query(
                r"
                INSERT INTO group_members (group_id, user_id) VALUES ($1, $2)
                ",
            )
            .bind(group_id.into_inner())
            .bind(user_id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;

        debug!(departed = departed.len(), "Roster replaced");
        Ok(departed)
    }

    #[instrument(skip(self))]
    async fn add_member(&self, group_id: GroupId, user_id: UserId) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES ($1, $2)
            ",
        )
        .bind(group_id.into_inner())
        .bind(user_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %record.user_id, group_id = %record.group_id, quit_type = %record.quit_type))]
    async fn record_departure(&self, record: &QuitRecord) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        sqlx::query(
            r"
            DELETE FROM group_members WHERE group_id = $1 AND user_id = $2
            ",
        )
        .bind(record.group_id.into_inner())
        .bind(record.user_id.into_inner())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        sqlx::query(
            r"
            INSERT OR IGNORE INTO quit_records (user_id, group_id, quit_time, quit_type)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(record.user_id.into_inner())
        .bind(record.group_id.into_inner())
        .bind(record.quit_time)
        .bind(record.quit_type.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            DELETE FROM group_members
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}
