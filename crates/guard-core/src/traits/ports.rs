//! Outbound collaborator ports
//!
//! The messaging gateway and the language model are external systems; the
//! application layer only sees these traits. Implementations own their own
//! transport, retries and backoff.

use async_trait::async_trait;

use crate::entities::{GroupMember, RequestSubType, StrangerInfo};
use crate::error::DomainError;
use crate::value_objects::{GroupId, UserId};

/// Result type for gateway calls
pub type GatewayResult<T> = Result<T, DomainError>;

/// Result type for language model calls
pub type LlmResult<T> = Result<T, DomainError>;

/// Messaging gateway (the bot's protocol endpoint)
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Live roster of a group
    async fn get_group_member_list(&self, group_id: GroupId) -> GatewayResult<Vec<GroupMember>>;

    /// One member of a group, including their role
    async fn get_group_member_info(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> GatewayResult<GroupMember>;

    /// Public profile of any account (level lookup)
    async fn get_stranger_info(&self, user_id: UserId) -> GatewayResult<StrangerInfo>;

    /// Answer a join request. `reason` is only sent when rejecting.
    async fn set_group_add_request(
        &self,
        flag: &str,
        sub_type: RequestSubType,
        approve: bool,
        reason: Option<&str>,
    ) -> GatewayResult<()>;

    /// Post a text message to a group, optionally mentioning one user first
    async fn send_group_msg(
        &self,
        group_id: GroupId,
        mention: Option<UserId>,
        text: &str,
    ) -> GatewayResult<()>;
}

/// Language model used for content audits and free text
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Structured completion constrained by a JSON schema
    async fn chat_json(
        &self,
        message: &str,
        schema: &serde_json::Value,
        system_prompt: &str,
    ) -> LlmResult<serde_json::Value>;

    /// Plain text completion
    async fn chat(&self, prompt: &str) -> LlmResult<String>;
}
