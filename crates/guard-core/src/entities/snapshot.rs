//! Membership snapshot - last known roster of every managed group

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::value_objects::{GroupId, UserId};

/// Last known roster per group
///
/// A group's entry is only ever replaced as a whole. Diffing against a
/// freshly fetched roster yields the members who left since the last pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MembershipSnapshot {
    groups: HashMap<GroupId, HashSet<UserId>>,
}

impl MembershipSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from `(group_id, user_id)` rows
    pub fn from_rows(rows: impl IntoIterator<Item = (GroupId, UserId)>) -> Self {
        let mut groups: HashMap<GroupId, HashSet<UserId>> = HashMap::new();
        for (group_id, user_id) in rows {
            groups.entry(group_id).or_default().insert(user_id);
        }
        Self { groups }
    }

    /// Members of one group, if the group was ever recorded
    pub fn members(&self, group_id: GroupId) -> Option<&HashSet<UserId>> {
        self.groups.get(&group_id)
    }

    /// Whether the group has ever been recorded
    pub fn contains_group(&self, group_id: GroupId) -> bool {
        self.groups.contains_key(&group_id)
    }

    /// Replace one group's roster wholesale
    pub fn replace(&mut self, group_id: GroupId, members: HashSet<UserId>) {
        self.groups.insert(group_id, members);
    }

    /// `before - live` for one group, sorted for stable output
    ///
    /// A group with no previous snapshot yields no departures.
    pub fn departed(&self, group_id: GroupId, live: &HashSet<UserId>) -> Vec<UserId> {
        let mut departed: Vec<UserId> = self
            .groups
            .get(&group_id)
            .map(|before| before.difference(live).copied().collect())
            .unwrap_or_default();
        departed.sort_unstable();
        departed
    }

    /// `live - before` for one group, sorted for stable output
    pub fn arrived(&self, group_id: GroupId, live: &HashSet<UserId>) -> Vec<UserId> {
        let empty = HashSet::new();
        let before = self.groups.get(&group_id).unwrap_or(&empty);
        let mut arrived: Vec<UserId> = live.difference(before).copied().collect();
        arrived.sort_unstable();
        arrived
    }

    /// Groups a user currently appears in
    pub fn groups_of(&self, user_id: UserId) -> BTreeSet<GroupId> {
        self.groups
            .iter()
            .filter(|(_, members)| members.contains(&user_id))
            .map(|(group_id, _)| *group_id)
            .collect()
    }

    /// Users present in more than one group, with the groups they are in
    pub fn multi_group_members(&self) -> BTreeMap<UserId, BTreeSet<GroupId>> {
        let mut by_user: BTreeMap<UserId, BTreeSet<GroupId>> = BTreeMap::new();
        for (group_id, members) in &self.groups {
            for user_id in members {
                by_user.entry(*user_id).or_default().insert(*group_id);
            }
        }
        by_user.retain(|_, groups| groups.len() > 1);
        by_user
    }

    /// Number of recorded groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
