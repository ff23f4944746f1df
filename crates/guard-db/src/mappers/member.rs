//! Roster rows -> MembershipSnapshot

use guard_core::entities::MembershipSnapshot;
use guard_core::value_objects::{GroupId, UserId};

use crate::models::GroupMemberModel;

/// Fold stored roster rows into a snapshot
pub fn snapshot_from_rows(rows: Vec<GroupMemberModel>) -> MembershipSnapshot {
    MembershipSnapshot::from_rows(
        rows.into_iter()
            .map(|row| (GroupId::new(row.group_id), UserId::new(row.user_id))),
    )
}
