//! Response envelope shared by every gateway action

use serde::Deserialize;
use serde_json::Value;

use guard_core::error::DomainError;

/// `{status, retcode, data}` wrapper around every action result
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub status: String,
    #[serde(default)]
    pub retcode: i64,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub wording: Option<String>,
}

impl Envelope {
    /// Whether the gateway reported success
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Unwrap the payload, failing unless `status == "ok"`
    pub fn into_data(self, action: &'static str) -> Result<Value, DomainError> {
        if self.is_ok() {
            return Ok(self.data);
        }

        let detail = self
            .wording
            .or(self.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "no message".to_string());
        Err(DomainError::gateway(
            action,
            format!("status={} retcode={} {detail}", self.status, self.retcode),
        ))
    }

    /// Unwrap and decode the payload
    pub fn decode<T>(self, action: &'static str) -> Result<T, DomainError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let data = self.into_data(action)?;
        serde_json::from_value(data)
            .map_err(|e| DomainError::gateway(action, format!("unexpected payload: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guard_core::entities::GroupMember;
    use serde_json::json;

    fn envelope(value: Value) -> Envelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_ok_envelope_yields_data() {
        let env = envelope(json!({"status": "ok", "retcode": 0, "data": [{"user_id": 1, "role": "admin"}]}));
        let members: Vec<GroupMember> = env.decode("get_group_member_list").unwrap();
        assert_eq!(members.len(), 1);
        assert!(members[0].role.is_manager());
    }

    #[test]
    fn test_failed_status_is_error_even_with_data() {
        let env = envelope(json!({"status": "failed", "retcode": 100, "data": null, "wording": "no such group"}));
        let err = env.into_data("get_group_member_list").unwrap_err();
        assert_eq!(err.code(), "GATEWAY_ERROR");
        assert!(err.to_string().contains("no such group"));
        assert!(err.to_string().contains("get_group_member_list"));
    }

    #[test]
    fn test_async_status_is_not_ok() {
        let env = envelope(json!({"status": "async", "retcode": 1}));
        assert!(!env.is_ok());
    }

    #[test]
    fn test_payload_shape_mismatch_is_gateway_error() {
        let env = envelope(json!({"status": "ok", "retcode": 0, "data": {"unexpected": true}}));
        let err = env.decode::<Vec<GroupMember>>("get_group_member_list").unwrap_err();
        assert!(err.is_collaborator());
    }
}
