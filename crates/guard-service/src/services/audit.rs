//! Audit service
//!
//! Content audit and free-text generation, both routed through the
//! [`CallGate`](super::call_gate::CallGate).

use serde_json::{json, Value};
use tracing::{debug, instrument};

use guard_core::entities::AuditDecision;
use guard_core::DomainError;

use super::call_gate::CallKey;
use super::context::ServiceContext;

/// Structured output the auditor must produce
pub fn audit_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "agreed": {"type": "boolean"},
            "reason": {"type": "string"}
        },
        "required": ["agreed"]
    })
}

/// Audit service
pub struct AuditService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuditService<'a> {
    /// Create a new AuditService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Judge an application text; identical texts are only judged once
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub async fn audit(&self, text: &str) -> Result<AuditDecision, DomainError> {
        let schema = audit_schema();
        let prompt = &self.ctx.config().admission.audit_system_prompt;
        let key = CallKey::new(text, &schema, prompt.as_str());

        let value = self
            .ctx
            .call_gate()
            .execute(key, true, self.ctx.llm().chat_json(text, &schema, prompt))
            .await?;

        let decision: AuditDecision = serde_json::from_value(value)
            .map_err(|e| DomainError::MalformedLlmOutput(e.to_string()))?;
        debug!(agreed = decision.agreed, "Audit verdict");
        Ok(decision)
    }

    /// Generate free text, never cached
    #[instrument(skip_all)]
    pub async fn compose(&self, prompt: &str) -> Result<String, DomainError> {
        let key = CallKey::text(prompt);
        let llm = self.ctx.llm();

        let value = self
            .ctx
            .call_gate()
            .execute(key, false, async move { llm.chat(prompt).await.map(Value::String) })
            .await?;

        match value {
            Value::String(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(DomainError::MalformedLlmOutput("empty text completion".into())),
        }
    }
}
