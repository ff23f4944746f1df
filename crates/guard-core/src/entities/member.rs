//! Group member and stranger profile as reported by the gateway

use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// Role of a member inside a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Admin,
    #[default]
    #[serde(other)]
    Member,
}

impl MemberRole {
    /// Owners and admins may run moderation commands
    #[inline]
    pub fn is_manager(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

/// One entry of a live group roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub user_id: UserId,
    #[serde(default)]
    pub role: MemberRole,
}

impl GroupMember {
    /// Create a new GroupMember
    pub fn new(user_id: UserId, role: MemberRole) -> Self {
        Self { user_id, role }
    }
}

/// Public profile of an arbitrary account
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StrangerInfo {
    pub user_id: UserId,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub level: Option<u32>,
}

impl StrangerInfo {
    /// Account level, if the gateway actually knows it.
    ///
    /// A level of zero means the lookup came back empty.
    pub fn known_level(&self) -> Option<u32> {
        self.level.filter(|level| *level > 0)
    }
}
