//! Event payloads as the gateway sends them

use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique flags
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

fn envelope(post_type: &str, mut body: Value) -> Value {
    body["time"] = json!(1_700_000_000);
    body["self_id"] = json!(10_000);
    body["post_type"] = json!(post_type);
    body
}

/// Application to join `group_id`
pub fn join_request(group_id: i64, user_id: i64, comment: &str) -> Value {
    envelope(
        "request",
        json!({
            "request_type": "group",
            "sub_type": "add",
            "group_id": group_id,
            "user_id": user_id,
            "comment": comment,
            "flag": format!("flag-{}", unique_suffix()),
        }),
    )
}

/// Member joined notice
pub fn member_joined(group_id: i64, user_id: i64, operator_id: i64) -> Value {
    envelope(
        "notice",
        json!({
            "notice_type": "group_increase",
            "sub_type": "approve",
            "group_id": group_id,
            "user_id": user_id,
            "operator_id": operator_id,
        }),
    )
}

/// Member left (`leave`) or removed (`kick`) notice
pub fn member_left(group_id: i64, user_id: i64, sub_type: &str) -> Value {
    envelope(
        "notice",
        json!({
            "notice_type": "group_decrease",
            "sub_type": sub_type,
            "group_id": group_id,
            "user_id": user_id,
            "operator_id": if sub_type == "kick" { 42 } else { user_id },
        }),
    )
}

/// Group message mentioning the bot, followed by `text`
pub fn command_message(group_id: i64, user_id: i64, bot_id: i64, text: &str) -> Value {
    envelope(
        "message",
        json!({
            "message_type": "group",
            "sub_type": "normal",
            "group_id": group_id,
            "user_id": user_id,
            "message": [
                {"type": "at", "data": {"qq": bot_id.to_string()}},
                {"type": "text", "data": {"text": format!(" {text}")}},
            ],
            "raw_message": format!("[CQ:at,qq={bot_id}] {text}"),
        }),
    )
}

/// Lifecycle heartbeat
pub fn heartbeat() -> Value {
    envelope(
        "meta_event",
        json!({"meta_event_type": "heartbeat", "interval": 5000}),
    )
}
