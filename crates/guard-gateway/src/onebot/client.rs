//! HTTP client for the gateway's action endpoints
//!
//! Every action is a `POST {base_url}/{action}` with a JSON body and the
//! access token as a bearer credential.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use guard_common::GatewayConfig;
use guard_core::entities::{GroupMember, RequestSubType, StrangerInfo};
use guard_core::error::DomainError;
use guard_core::traits::{GatewayClient, GatewayResult};
use guard_core::value_objects::{GroupId, UserId};

use super::envelope::Envelope;

const MAX_ERROR_BODY: usize = 200;

/// OneBot v11 gateway client
#[derive(Debug, Clone)]
pub struct OneBotClient {
    base_url: String,
    access_token: Option<String>,
    http: reqwest::Client,
}

impl OneBotClient {
    /// Build a client from gateway configuration
    pub fn new(config: &GatewayConfig) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DomainError::InternalError(format!("gateway http client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
            http,
        })
    }

    /// Invoke one action and return its envelope
    async fn call(&self, action: &'static str, params: Value) -> GatewayResult<Envelope> {
        let url = format!("{}/{action}", self.base_url);
        let mut request = self.http.post(&url).json(&params);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DomainError::Timeout(format!("gateway action {action}"))
            } else {
                DomainError::gateway(action, e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            warn!(action, %status, "Gateway returned HTTP error");
            return Err(DomainError::gateway(action, format!("HTTP {status}: {body}")));
        }

        let envelope = response
            .json::<Envelope>()
            .await
            .map_err(|e| DomainError::gateway(action, format!("invalid envelope: {e}")))?;

        debug!(action, status = %envelope.status, retcode = envelope.retcode, "Gateway action completed");
        Ok(envelope)
    }
}

/// Message segments for a group post, with an optional leading mention
pub fn message_segments(mention: Option<UserId>, text: &str) -> Value {
    let mut segments = Vec::with_capacity(2);
    if let Some(user_id) = mention {
        segments.push(json!({"type": "at", "data": {"qq": user_id.to_string()}}));
        segments.push(json!({"type": "text", "data": {"text": format!(" {text}")}}));
    } else {
        segments.push(json!({"type": "text", "data": {"text": text}}));
    }
    Value::Array(segments)
}

#[async_trait]
impl GatewayClient for OneBotClient {
    #[instrument(skip(self))]
    async fn get_group_member_list(&self, group_id: GroupId) -> GatewayResult<Vec<GroupMember>> {
        const ACTION: &str = "get_group_member_list";
        self.call(ACTION, json!({"group_id": group_id, "no_cache": true}))
            .await?
            .decode(ACTION)
    }

    #[instrument(skip(self))]
    async fn get_group_member_info(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> GatewayResult<GroupMember> {
        const ACTION: &str = "get_group_member_info";
        let data = self
            .call(
                ACTION,
                json!({"group_id": group_id, "user_id": user_id, "no_cache": true}),
            )
            .await?
            .into_data(ACTION)?;

        if data.is_null() {
            return Err(DomainError::MemberNotFound);
        }
        serde_json::from_value(data)
            .map_err(|e| DomainError::gateway(ACTION, format!("unexpected payload: {e}")))
    }

    #[instrument(skip(self))]
    async fn get_stranger_info(&self, user_id: UserId) -> GatewayResult<StrangerInfo> {
        const ACTION: &str = "get_stranger_info";
        self.call(ACTION, json!({"user_id": user_id, "no_cache": true}))
            .await?
            .decode(ACTION)
    }

    #[instrument(skip(self, flag))]
    async fn set_group_add_request(
        &self,
        flag: &str,
        sub_type: RequestSubType,
        approve: bool,
        reason: Option<&str>,
    ) -> GatewayResult<()> {
        const ACTION: &str = "set_group_add_request";
        let mut params = json!({
            "flag": flag,
            "sub_type": sub_type.as_str(),
            "approve": approve,
        });
        if let (false, Some(reason)) = (approve, reason.filter(|r| !r.is_empty())) {
            params["reason"] = Value::String(reason.to_string());
        }

        self.call(ACTION, params).await?.into_data(ACTION)?;
        Ok(())
    }

    #[instrument(skip(self, text), fields(len = text.len()))]
    async fn send_group_msg(
        &self,
        group_id: GroupId,
        mention: Option<UserId>,
        text: &str,
    ) -> GatewayResult<()> {
        const ACTION: &str = "send_group_msg";
        let params = json!({
            "group_id": group_id,
            "message": message_segments(mention, text),
        });

        self.call(ACTION, params).await?.into_data(ACTION)?;
        Ok(())
    }
}
