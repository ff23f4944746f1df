//! Verdict returned by the content auditor

use serde::{Deserialize, Serialize};

/// Result of auditing a join comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditDecision {
    pub agreed: bool,
    #[serde(default)]
    pub reason: String,
}

impl AuditDecision {
    pub fn agreed() -> Self {
        Self {
            agreed: true,
            reason: String::new(),
        }
    }

    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            agreed: false,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_is_optional() {
        let decision: AuditDecision = serde_json::from_str(r#"{"agreed": true}"#).unwrap();
        assert_eq!(decision, AuditDecision::agreed());
    }
}
