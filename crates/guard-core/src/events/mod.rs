//! Inbound gateway events

mod group_event;

pub use group_event::{GroupEvent, MessageEvent, NoticeEvent, RequestEvent};
