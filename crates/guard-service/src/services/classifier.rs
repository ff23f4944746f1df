//! Event classifier
//!
//! Maps a decoded [`GroupEvent`] to the single handler that should see it.
//! Pure function of the event and the group configuration; no I/O.

use guard_common::GroupsConfig;
use guard_core::entities::{JoinRequest, QuitType, RequestSubType};
use guard_core::events::{GroupEvent, MessageEvent, NoticeEvent, RequestEvent};
use guard_core::value_objects::{GroupId, UserId};

/// Where an event goes next
#[derive(Debug, Clone)]
pub enum Route {
    /// Group join application or invitation
    JoinRequest(JoinRequest),
    /// A user became a member
    MemberJoined {
        group_id: GroupId,
        user_id: UserId,
        operator_id: Option<UserId>,
    },
    /// A user left or was removed
    MemberLeft {
        group_id: GroupId,
        user_id: UserId,
        quit_type: QuitType,
    },
    /// The bot itself was removed from a group
    BotRemoved { group_id: GroupId },
    /// Group chat message, candidate for an admin command
    GroupMessage(MessageEvent),
    /// Scoped to a group the bot does not administer
    Unmanaged(GroupId),
    /// Nothing to do
    Ignored(&'static str),
}

impl Route {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinRequest(_) => "join_request",
            Self::MemberJoined { .. } => "member_joined",
            Self::MemberLeft { .. } => "member_left",
            Self::BotRemoved { .. } => "bot_removed",
            Self::GroupMessage(_) => "group_message",
            Self::Unmanaged(_) => "unmanaged",
            Self::Ignored(_) => "ignored",
        }
    }
}

/// Classify an inbound event
pub fn classify(event: &GroupEvent, groups: &GroupsConfig) -> Route {
    if let Some(group_id) = event.group_id() {
        if !groups.accepts_events_from(group_id) {
            return Route::Unmanaged(group_id);
        }
    }

    match event {
        GroupEvent::Request(request) => classify_request(request, groups),
        GroupEvent::Notice(notice) => classify_notice(notice),
        GroupEvent::Message(message) => classify_message(message),
        GroupEvent::Other => Route::Ignored("unhandled post type"),
    }
}

fn classify_request(request: &RequestEvent, groups: &GroupsConfig) -> Route {
    if request.request_type != "group" {
        return Route::Ignored("not a group request");
    }
    let Some(group_id) = request.group_id else {
        return Route::Ignored("group request without group");
    };
    // Applications to the admin group itself are left to humans
    if !groups.is_managed(group_id) {
        return Route::Ignored("request for admin group");
    }
    let Some(sub_type) = RequestSubType::parse(&request.sub_type) else {
        return Route::Ignored("unknown request sub type");
    };

    Route::JoinRequest(JoinRequest::new(
        request.flag.clone(),
        sub_type,
        group_id,
        request.user_id,
        request.comment.clone(),
    ))
}

fn classify_notice(notice: &NoticeEvent) -> Route {
    let (Some(group_id), Some(user_id)) = (notice.group_id, notice.user_id) else {
        return Route::Ignored("notice without group or user");
    };
    let sub_type = notice.sub_type.as_deref().unwrap_or_default();

    match notice.notice_type.as_str() {
        "group_increase" => match sub_type {
            "approve" | "invite" => Route::MemberJoined {
                group_id,
                user_id,
                operator_id: notice.operator_id,
            },
            _ => Route::Ignored("unknown increase sub type"),
        },
        "group_decrease" => match sub_type {
            "leave" => Route::MemberLeft {
                group_id,
                user_id,
                quit_type: QuitType::Leave,
            },
            "kick" => Route::MemberLeft {
                group_id,
                user_id,
                quit_type: QuitType::Kick,
            },
            "kick_me" => Route::BotRemoved { group_id },
            _ => Route::Ignored("unknown decrease sub type"),
        },
        _ => Route::Ignored("unhandled notice type"),
    }
}

fn classify_message(message: &MessageEvent) -> Route {
    if message.message_type == "group" && message.group_id.is_some() {
        Route::GroupMessage(message.clone())
    } else {
        Route::Ignored("not a group message")
    }
}
