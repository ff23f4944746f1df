//! Group events - payloads pushed by the gateway to the webhook
//!
//! The first discriminant is `post_type`; each variant then carries its own
//! second-level discriminant (`notice_type`, `request_type`, `message_type`)
//! plus an optional `sub_type`. Events are built per inbound call and never
//! persisted.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::value_objects::{GroupId, UserId};

/// All inbound event kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "post_type", rename_all = "snake_case")]
pub enum GroupEvent {
    Notice(NoticeEvent),
    Request(RequestEvent),
    Message(MessageEvent),
    /// Heartbeats, lifecycle events and anything newer than this build
    #[serde(other)]
    Other,
}

impl GroupEvent {
    /// Top-level discriminant as seen on the wire
    pub fn post_type(&self) -> &'static str {
        match self {
            Self::Notice(_) => "notice",
            Self::Request(_) => "request",
            Self::Message(_) => "message",
            Self::Other => "other",
        }
    }

    /// Group the event is scoped to, if any
    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            Self::Notice(e) => e.group_id,
            Self::Request(e) => e.group_id,
            Self::Message(e) => e.group_id,
            Self::Other => None,
        }
    }

    /// User the event is about, if any
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Notice(e) => e.user_id,
            Self::Request(e) => Some(e.user_id),
            Self::Message(e) => Some(e.user_id),
            Self::Other => None,
        }
    }
}

impl Validate for GroupEvent {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            Self::Notice(e) => e.validate(),
            Self::Request(e) => e.validate(),
            Self::Message(e) => e.validate(),
            Self::Other => Ok(()),
        }
    }
}

/// Notice event (membership changes and the like)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NoticeEvent {
    #[validate(length(min = 1, max = 64))]
    pub notice_type: String,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "validate_group_id"))]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub operator_id: Option<UserId>,
}

/// Request event (join applications, invitations, friend requests)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequestEvent {
    #[validate(length(min = 1, max = 64))]
    pub request_type: String,
    #[serde(default)]
    pub sub_type: String,
    #[serde(default)]
    #[validate(custom(function = "validate_group_id"))]
    pub group_id: Option<GroupId>,
    #[validate(custom(function = "validate_user_id"))]
    pub user_id: UserId,
    #[serde(default)]
    #[validate(length(max = 4096))]
    pub comment: String,
    #[serde(default)]
    #[validate(length(max = 512))]
    pub flag: String,
}

/// Message event
///
/// `message` is either a plain string or an array of segments
/// (`{"type": "at", "data": {"qq": "..."}}`, `{"type": "text", ...}`).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MessageEvent {
    #[validate(length(min = 1, max = 64))]
    pub message_type: String,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "validate_group_id"))]
    pub group_id: Option<GroupId>,
    #[validate(custom(function = "validate_user_id"))]
    pub user_id: UserId,
    #[serde(default)]
    pub message: serde_json::Value,
    #[serde(default)]
    pub raw_message: String,
}

fn validate_group_id(group_id: &GroupId) -> Result<(), ValidationError> {
    if group_id.into_inner() <= 0 {
        return Err(ValidationError::new("group_id_not_positive"));
    }
    Ok(())
}

fn validate_user_id(user_id: &UserId) -> Result<(), ValidationError> {
    if user_id.into_inner() <= 0 {
        return Err(ValidationError::new("user_id_not_positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_join_request() {
        let event: GroupEvent = serde_json::from_value(json!({
            "time": 1_700_000_000,
            "self_id": 3952567836_i64,
            "post_type": "request",
            "request_type": "group",
            "sub_type": "add",
            "group_id": 1011978245,
            "user_id": 123456,
            "comment": "季梓虞",
            "flag": "1700000000123"
        }))
        .unwrap();

        assert_eq!(event.post_type(), "request");
        assert_eq!(event.group_id(), Some(GroupId::new(1_011_978_245)));
        assert!(event.validate().is_ok());
        match event {
            GroupEvent::Request(request) => {
                assert_eq!(request.flag, "1700000000123");
                assert_eq!(request.sub_type, "add");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_post_type_is_other() {
        let event: GroupEvent = serde_json::from_value(json!({
            "post_type": "meta_event",
            "meta_event_type": "heartbeat"
        }))
        .unwrap();
        assert!(matches!(event, GroupEvent::Other));
        assert_eq!(event.group_id(), None);
    }

    #[test]
    fn test_validation_rejects_non_positive_user() {
        let event: GroupEvent = serde_json::from_value(json!({
            "post_type": "request",
            "request_type": "group",
            "group_id": 1,
            "user_id": 0
        }))
        .unwrap();
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_missing_discriminant_fails() {
        let result: Result<GroupEvent, _> = serde_json::from_value(json!({"group_id": 1}));
        assert!(result.is_err());
    }

    #[test]
    fn test_segment_message() {
        let event: GroupEvent = serde_json::from_value(json!({
            "post_type": "message",
            "message_type": "group",
            "group_id": 10,
            "user_id": 20,
            "message": [
                {"type": "at", "data": {"qq": "3952567836"}},
                {"type": "text", "data": {"text": " clear-joins 42"}}
            ]
        }))
        .unwrap();
        match event {
            GroupEvent::Message(message) => assert!(message.message.is_array()),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
