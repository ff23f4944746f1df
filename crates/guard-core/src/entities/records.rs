//! Join and quit records kept by the record store
//!
//! Both are write-once rows. They are only ever counted, never updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::{GroupId, UserId};

/// One admitted (or administratively recorded) join
///
/// The same `(user_id, group_id)` pair may appear many times; quota checks
/// count rows, not distinct pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRecord {
    pub user_id: UserId,
    pub group_id: GroupId,
    pub join_time: DateTime<Utc>,
}

impl JoinRecord {
    /// Create a JoinRecord stamped with the current time
    pub fn now(user_id: UserId, group_id: GroupId) -> Self {
        Self {
            user_id,
            group_id,
            join_time: Utc::now(),
        }
    }
}

/// How a member left a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuitType {
    /// Removed by an operator
    Kick,
    /// Left voluntarily
    Leave,
}

impl QuitType {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kick => "kick",
            Self::Leave => "leave",
        }
    }

    /// Parse the storage representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "kick" => Some(Self::Kick),
            "leave" => Some(Self::Leave),
            _ => None,
        }
    }
}

impl fmt::Display for QuitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One departure from a managed group, unique per `(user_id, group_id, quit_time)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuitRecord {
    pub user_id: UserId,
    pub group_id: GroupId,
    pub quit_time: DateTime<Utc>,
    pub quit_type: QuitType,
}

impl QuitRecord {
    /// Create a QuitRecord stamped with the current time
    pub fn now(user_id: UserId, group_id: GroupId, quit_type: QuitType) -> Self {
        Self {
            user_id,
            group_id,
            quit_time: Utc::now(),
            quit_type,
        }
    }
}

/// Kick and leave counts over a quit history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuitTally {
    pub kicks: u32,
    pub leaves: u32,
}

impl QuitTally {
    /// Count kicks and voluntary leaves separately
    pub fn from_records(records: &[QuitRecord]) -> Self {
        records.iter().fold(Self::default(), |mut tally, record| {
            match record.quit_type {
                QuitType::Kick => tally.kicks += 1,
                QuitType::Leave => tally.leaves += 1,
            }
            tally
        })
    }
}
