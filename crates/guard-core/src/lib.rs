//! # guard-core
//!
//! Domain layer for the group admission bot: identifiers, join/quit records,
//! the membership snapshot, inbound gateway events, and the ports the
//! application layer depends on (record store repositories, the messaging
//! gateway and the language model).
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    AuditDecision, GroupMember, JoinRecord, JoinRequest, MemberRole, MembershipSnapshot,
    QuitRecord, QuitType, RequestSubType, StrangerInfo,
};
pub use error::DomainError;
pub use events::{GroupEvent, MessageEvent, NoticeEvent, RequestEvent};
pub use traits::{
    GatewayClient, GatewayResult, JoinRecordRepository, LanguageModel, LlmResult,
    MembershipRepository, QuitRecordRepository, RepoResult,
};
pub use value_objects::{GroupId, IdParseError, UserId};
