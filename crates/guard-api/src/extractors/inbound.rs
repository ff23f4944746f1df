//! Inbound gateway event extractor
//!
//! Checks, in order: JSON content type, the `X-Self-ID` header, a JSON
//! object body that decodes and validates as a [`GroupEvent`], and finally
//! that the sending bot account is allow-listed.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRef, FromRequest, Request},
    http::{header, HeaderMap},
};
use guard_common::AppError;
use guard_core::events::GroupEvent;
use guard_core::value_objects::UserId;
use serde_json::Value;
use validator::Validate;

use crate::response::ApiError;
use crate::state::AppState;

/// Header carrying the bot account the gateway speaks for
pub const SELF_ID_HEADER: &str = "x-self-id";

/// A checked event from an allow-listed bot account
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub self_id: UserId,
    pub event: GroupEvent,
}

#[async_trait]
impl<S> FromRequest<S> for InboundEvent
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        require_json(req.headers())?;
        let self_id = read_self_id(req.headers())?;

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::invalid_body(e.to_string()))?;
        let event = decode_event(&body)?;

        let app_state = AppState::from_ref(state);
        if !app_state.config().groups.is_bot(self_id) {
            return Err(AppError::SenderNotAllowed(self_id.to_string()).into());
        }

        Ok(Self { self_id, event })
    }
}

fn require_json(headers: &HeaderMap) -> Result<(), ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    if essence.eq_ignore_ascii_case("application/json") {
        Ok(())
    } else {
        Err(AppError::UnsupportedContentType(content_type.to_string()).into())
    }
}

fn read_self_id(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let raw = headers
        .get(SELF_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AppError::MissingHeader("X-Self-ID"))?;
    UserId::parse(raw)
        .map_err(|_| AppError::InvalidInput(format!("X-Self-ID is not an account id: {raw}")).into())
}

fn decode_event(body: &[u8]) -> Result<GroupEvent, ApiError> {
    if body.is_empty() {
        return Err(ApiError::invalid_body("empty body"));
    }
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ApiError::invalid_body(e.to_string()))?;
    match &value {
        Value::Object(map) if !map.is_empty() => {}
        _ => return Err(ApiError::invalid_body("body must be a non-empty JSON object")),
    }

    let event: GroupEvent =
        serde_json::from_value(value).map_err(|e| ApiError::invalid_body(e.to_string()))?;
    event.validate()?;
    Ok(event)
}
