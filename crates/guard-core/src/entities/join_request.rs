//! Join request entity - an application to enter a managed group

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::{GroupId, UserId};

/// Kind of group request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestSubType {
    /// The user applied to join by themselves
    Add,
    /// A member invited the user
    Invite,
}

impl RequestSubType {
    /// Wire representation, echoed back unchanged when answering the request
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Invite => "invite",
        }
    }

    /// Parse the wire representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add" => Some(Self::Add),
            "invite" => Some(Self::Invite),
            _ => None,
        }
    }
}

impl fmt::Display for RequestSubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pending join request
///
/// `flag` is the opaque token the gateway needs to approve or reject this
/// request. It is carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub flag: String,
    pub sub_type: RequestSubType,
    pub group_id: GroupId,
    pub user_id: UserId,
    pub comment: String,
}

impl JoinRequest {
    /// Create a new JoinRequest
    pub fn new(
        flag: impl Into<String>,
        sub_type: RequestSubType,
        group_id: GroupId,
        user_id: UserId,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            flag: flag.into(),
            sub_type,
            group_id,
            user_id,
            comment: comment.into(),
        }
    }

    /// Whether the applicant left any text to audit
    #[inline]
    pub fn has_comment(&self) -> bool {
        !self.comment.trim().is_empty()
    }

    /// Whether the gateway gave us a token to answer with
    #[inline]
    pub fn has_flag(&self) -> bool {
        !self.flag.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_comment_counts_as_empty() {
        let request = JoinRequest::new(
            "flag-1",
            RequestSubType::Add,
            GroupId::new(1),
            UserId::new(2),
            "   \n",
        );
        assert!(!request.has_comment());
        assert!(request.has_flag());
    }

    #[test]
    fn test_sub_type_wire_names() {
        assert_eq!(RequestSubType::Add.as_str(), "add");
        assert_eq!(RequestSubType::Invite.to_string(), "invite");
        let parsed: RequestSubType = serde_json::from_str("\"invite\"").unwrap();
        assert_eq!(parsed, RequestSubType::Invite);
        assert_eq!(RequestSubType::parse("add"), Some(RequestSubType::Add));
        assert_eq!(RequestSubType::parse("kick"), None);
    }
}
