//! OpenAI-compatible chat-completions client
//!
//! Structured calls ask for a JSON object and check the reply against the
//! schema's `required` keys. Transport failures, 429 and 5xx responses are
//! retried with exponential backoff; everything else fails immediately.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use guard_common::LlmConfig;
use guard_core::error::DomainError;
use guard_core::traits::{LanguageModel, LlmResult};

const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Outcome of one attempt
enum Attempt {
    Done(String),
    Retry(DomainError),
    Fail(DomainError),
}

/// Chat-completions language model client
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    endpoint: String,
    api_key: Option<String>,
    model: String,
    max_retries: u32,
    backoff: Duration,
    http: reqwest::Client,
}

impl ChatCompletionsClient {
    /// Build a client from model configuration
    pub fn new(config: &LlmConfig) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DomainError::InternalError(format!("llm http client: {e}")))?;

        Ok(Self {
            endpoint: config.endpoint.trim().to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: config.model.clone(),
            max_retries: config.max_retries,
            backoff: LlmConfig::RETRY_BACKOFF,
            http,
        })
    }

    /// Override the first retry delay (doubles per attempt)
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn delay_for(&self, retry: u32) -> Duration {
        LlmConfig::backoff_delay(self.backoff, retry)
    }

    async fn complete(&self, request: &ChatRequest<'_>) -> LlmResult<String> {
        let mut retry = 0;
        loop {
            match self.attempt(request).await {
                Attempt::Done(content) => return Ok(content),
                Attempt::Fail(err) => return Err(err),
                Attempt::Retry(err) if retry >= self.max_retries => return Err(err),
                Attempt::Retry(err) => {
                    let delay = self.delay_for(retry);
                    warn!(error = %err, retry = retry + 1, ?delay, "Language model call failed, retrying");
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
            }
        }
    }

    async fn attempt(&self, request: &ChatRequest<'_>) -> Attempt {
        let mut builder = self.http.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Attempt::Retry(DomainError::Timeout("language model request".into()))
            }
            Err(e) => return Attempt::Retry(DomainError::LlmError(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            let err = DomainError::LlmError(format!("HTTP {status}: {body}"));
            return if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                Attempt::Retry(err)
            } else {
                Attempt::Fail(err)
            };
        }

        let parsed = match response.json::<ChatResponse>().await {
            Ok(parsed) => parsed,
            Err(e) => return Attempt::Retry(DomainError::LlmError(format!("invalid response: {e}"))),
        };

        match parsed.choices.into_iter().next().and_then(|c| c.message.content) {
            Some(content) => Attempt::Done(content),
            None => Attempt::Fail(DomainError::MalformedLlmOutput("empty completion".into())),
        }
    }
}

/// Parse a completion as a JSON object and check the schema's required keys
///
/// Tolerates a fenced code block around the object.
pub fn extract_json(content: &str, schema: &Value) -> LlmResult<Value> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let value: Value = serde_json::from_str(body)
        .map_err(|e| DomainError::MalformedLlmOutput(format!("not JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| DomainError::MalformedLlmOutput("expected a JSON object".into()))?;

    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);
    for key in required {
        if !object.contains_key(key) {
            return Err(DomainError::MalformedLlmOutput(format!(
                "missing required field `{key}`"
            )));
        }
    }

    Ok(value)
}

#[async_trait]
impl LanguageModel for ChatCompletionsClient {
    #[instrument(skip_all, fields(model = %self.model, len = message.len()))]
    async fn chat_json(
        &self,
        message: &str,
        schema: &Value,
        system_prompt: &str,
    ) -> LlmResult<Value> {
        let system = format!(
            "{system_prompt}\n\nReply with a single JSON object that matches this JSON schema:\n{schema}"
        );
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: message,
                },
            ],
            response_format: Some(json!({"type": "json_object"})),
        };

        let content = self.complete(&request).await?;
        debug!(reply_len = content.len(), "Structured completion received");
        extract_json(&content, schema)
    }

    #[instrument(skip_all, fields(model = %self.model, len = prompt.len()))]
    async fn chat(&self, prompt: &str) -> LlmResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: None,
        };

        let content = self.complete(&request).await?;
        Ok(content.trim().to_string())
    }
}
