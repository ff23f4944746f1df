//! Repository traits (ports) - define the interface for the record store
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation. Counts are always computed by the store;
//! callers never read-modify-write.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{JoinRecord, MembershipSnapshot, QuitRecord};
use crate::error::DomainError;
use crate::value_objects::{GroupId, UserId};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Join Records
// ============================================================================

#[async_trait]
pub trait JoinRecordRepository: Send + Sync {
    /// Append one join record
    async fn insert(&self, record: &JoinRecord) -> RepoResult<()>;

    /// Append `copies` identical join records in one transaction
    async fn insert_many(&self, record: &JoinRecord, copies: u32) -> RepoResult<()>;

    /// Number of join records for a user across all groups
    async fn count_by_user(&self, user_id: UserId) -> RepoResult<i64>;

    /// Delete all join records of a user, returning how many were removed
    async fn delete_by_user(&self, user_id: UserId) -> RepoResult<u64>;
}

// ============================================================================
// Quit Records
// ============================================================================

#[async_trait]
pub trait QuitRecordRepository: Send + Sync {
    /// Append one quit record.
    ///
    /// Returns `false` when a record with the same `(user, group, time)` key
    /// already exists.
    async fn insert(&self, record: &QuitRecord) -> RepoResult<bool>;

    /// Full quit history of a user across all groups, oldest first
    async fn find_by_user(&self, user_id: UserId) -> RepoResult<Vec<QuitRecord>>;

    /// Delete all quit records of a user, returning how many were removed
    async fn delete_by_user(&self, user_id: UserId) -> RepoResult<u64>;
}

// ============================================================================
// Membership Snapshot
// ============================================================================

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Load the snapshot of every recorded group
    async fn load_snapshot(&self) -> RepoResult<MembershipSnapshot>;

    /// Stored members of one group (empty if never recorded)
    async fn members_of(&self, group_id: GroupId) -> RepoResult<HashSet<UserId>>;

    /// Groups the user is recorded in
    async fn groups_of(&self, user_id: UserId) -> RepoResult<Vec<GroupId>>;

    /// Sync one group with its live roster in a single transaction.
    ///
    /// Computes `stored - live`, appends a `leave` quit record stamped `at`
    /// for each departed user, then replaces the stored roster with `live`.
    /// Returns the departed users.
    async fn reconcile_group(
        &self,
        group_id: GroupId,
        live: &HashSet<UserId>,
        at: DateTime<Utc>,
    ) -> RepoResult<Vec<UserId>>;

    /// Add one member to a group's stored roster (no-op if present)
    async fn add_member(&self, group_id: GroupId, user_id: UserId) -> RepoResult<()>;

    /// Remove the member from the stored roster and append the quit record,
    /// atomically
    async fn record_departure(&self, record: &QuitRecord) -> RepoResult<()>;

    /// Drop every stored roster row
    async fn clear(&self) -> RepoResult<u64>;
}
