//! Integration tests for guard-db repositories
//!
//! Each test runs against its own in-memory SQLite database, so no
//! external setup is needed:
//!
//! ```bash
//! cargo test -p guard-db --test integration_tests
//! ```

use std::collections::HashSet;

use chrono::{Duration, Utc};

use guard_core::entities::{JoinRecord, QuitRecord, QuitType};
use guard_core::traits::{JoinRecordRepository, MembershipRepository, QuitRecordRepository};
use guard_core::value_objects::{GroupId, UserId};
use guard_db::{
    create_pool, init_schema, DatabaseConfig, SqliteJoinRecordRepository,
    SqliteMembershipRepository, SqliteQuitRecordRepository, SqlitePool,
};

/// Helper to create a fresh database with the schema applied
async fn test_pool() -> SqlitePool {
    let pool = create_pool(&DatabaseConfig::in_memory())
        .await
        .expect("in-memory pool");
    init_schema(&pool).await.expect("schema");
    pool
}

fn users(ids: &[i64]) -> HashSet<UserId> {
    ids.iter().copied().map(UserId::new).collect()
}

// ============================================================================
// Join Record Tests
// ============================================================================

#[tokio::test]
async fn test_join_count_spans_groups() {
    let repo = SqliteJoinRecordRepository::new(test_pool().await);
    let user = UserId::new(100);

    assert_eq!(repo.count_by_user(user).await.unwrap(), 0);

    repo.insert(&JoinRecord::now(user, GroupId::new(1))).await.unwrap();
    repo.insert(&JoinRecord::now(user, GroupId::new(2))).await.unwrap();
    repo.insert(&JoinRecord::now(UserId::new(200), GroupId::new(1)))
        .await
        .unwrap();

    assert_eq!(repo.count_by_user(user).await.unwrap(), 2);
}

#[tokio::test]
async fn test_join_duplicates_are_counted() {
    let repo = SqliteJoinRecordRepository::new(test_pool().await);
    let record = JoinRecord::now(UserId::new(100), GroupId::new(1));

    repo.insert(&record).await.unwrap();
    repo.insert(&record).await.unwrap();

    assert_eq!(repo.count_by_user(record.user_id).await.unwrap(), 2);
}

#[tokio::test]
async fn test_join_insert_many_and_delete() {
    let repo = SqliteJoinRecordRepository::new(test_pool().await);
    let record = JoinRecord::now(UserId::new(100), GroupId::new(1));

    repo.insert_many(&record, 3).await.unwrap();
    assert_eq!(repo.count_by_user(record.user_id).await.unwrap(), 3);

    assert_eq!(repo.delete_by_user(record.user_id).await.unwrap(), 3);
    assert_eq!(repo.count_by_user(record.user_id).await.unwrap(), 0);
    assert_eq!(repo.delete_by_user(record.user_id).await.unwrap(), 0);
}

// ============================================================================
// Quit Record Tests
// ============================================================================

#[tokio::test]
async fn test_quit_insert_rejects_duplicate_key() {
    let repo = SqliteQuitRecordRepository::new(test_pool().await);
    let record = QuitRecord::now(UserId::new(100), GroupId::new(1), QuitType::Kick);

    assert!(repo.insert(&record).await.unwrap());
    assert!(!repo.insert(&record).await.unwrap());

    assert_eq!(repo.find_by_user(record.user_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_quit_history_oldest_first() {
    let repo = SqliteQuitRecordRepository::new(test_pool().await);
    let user = UserId::new(100);
    let now = Utc::now();

    let later = QuitRecord {
        user_id: user,
        group_id: GroupId::new(2),
        quit_time: now,
        quit_type: QuitType::Leave,
    };
    let earlier = QuitRecord {
        user_id: user,
        group_id: GroupId::new(1),
        quit_time: now - Duration::hours(1),
        quit_type: QuitType::Kick,
    };
    repo.insert(&later).await.unwrap();
    repo.insert(&earlier).await.unwrap();

    let history = repo.find_by_user(user).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].quit_type, QuitType::Kick);
    assert_eq!(history[1].group_id, GroupId::new(2));

    assert_eq!(repo.delete_by_user(user).await.unwrap(), 2);
    assert!(repo.find_by_user(user).await.unwrap().is_empty());
}

// ============================================================================
// Membership Tests
// ============================================================================

#[tokio::test]
async fn test_reconcile_records_departures() {
    let pool = test_pool().await;
    let members = SqliteMembershipRepository::new(pool.clone());
    let quits = SqliteQuitRecordRepository::new(pool);
    let group = GroupId::new(1);

    // First pass on an empty store records nobody as departed
    let departed = members
        .reconcile_group(group, &users(&[1, 2, 3]), Utc::now())
        .await
        .unwrap();
    assert!(departed.is_empty());
    assert_eq!(members.members_of(group).await.unwrap(), users(&[1, 2, 3]));

    let departed = members
        .reconcile_group(group, &users(&[1, 3, 4]), Utc::now())
        .await
        .unwrap();
    assert_eq!(departed, vec![UserId::new(2)]);
    assert_eq!(members.members_of(group).await.unwrap(), users(&[1, 3, 4]));

    let history = quits.find_by_user(UserId::new(2)).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].quit_type, QuitType::Leave);
    assert_eq!(history[0].group_id, group);
}

#[tokio::test]
async fn test_reconcile_leaves_other_groups_alone() {
    let members = SqliteMembershipRepository::new(test_pool().await);

    members
        .reconcile_group(GroupId::new(1), &users(&[1, 2]), Utc::now())
        .await
        .unwrap();
    members
        .reconcile_group(GroupId::new(2), &users(&[2, 3]), Utc::now())
        .await
        .unwrap();
    members
        .reconcile_group(GroupId::new(1), &users(&[]), Utc::now())
        .await
        .unwrap();

    let snapshot = members.load_snapshot().await.unwrap();
    assert_eq!(snapshot.members(GroupId::new(2)), Some(&users(&[2, 3])));
    assert!(snapshot.members(GroupId::new(1)).is_none());
}

#[tokio::test]
async fn test_snapshot_groups_of_user() {
    let members = SqliteMembershipRepository::new(test_pool().await);

    members.add_member(GroupId::new(1), UserId::new(7)).await.unwrap();
    members.add_member(GroupId::new(2), UserId::new(7)).await.unwrap();
    members.add_member(GroupId::new(2), UserId::new(7)).await.unwrap();
    members.add_member(GroupId::new(2), UserId::new(8)).await.unwrap();

    assert_eq!(
        members.groups_of(UserId::new(7)).await.unwrap(),
        vec![GroupId::new(1), GroupId::new(2)]
    );

    let snapshot = members.load_snapshot().await.unwrap();
    let multi = snapshot.multi_group_members();
    assert_eq!(multi.len(), 1);
    assert!(multi.contains_key(&UserId::new(7)));
}

#[tokio::test]
async fn test_record_departure_is_atomic() {
    let pool = test_pool().await;
    let members = SqliteMembershipRepository::new(pool.clone());
    let quits = SqliteQuitRecordRepository::new(pool);
    let group = GroupId::new(5);

    members.add_member(group, UserId::new(1)).await.unwrap();
    members.add_member(group, UserId::new(2)).await.unwrap();

    let record = QuitRecord::now(UserId::new(1), group, QuitType::Kick);
    members.record_departure(&record).await.unwrap();

    assert_eq!(members.members_of(group).await.unwrap(), users(&[2]));
    let history = quits.find_by_user(UserId::new(1)).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].quit_type, QuitType::Kick);
    assert_eq!(history[0].group_id, group);
}

#[tokio::test]
async fn test_clear_drops_all_rosters() {
    let members = SqliteMembershipRepository::new(test_pool().await);

    members
        .reconcile_group(GroupId::new(1), &users(&[1, 2]), Utc::now())
        .await
        .unwrap();
    assert_eq!(members.clear().await.unwrap(), 2);
    assert_eq!(members.load_snapshot().await.unwrap().group_count(), 0);
}
