//! # guard-gateway
//!
//! HTTP implementations of the outbound ports defined in `guard-core`:
//!
//! - [`OneBotClient`] talks to the messaging gateway's action API
//! - [`ChatCompletionsClient`] talks to an OpenAI-compatible model endpoint

pub mod llm;
pub mod onebot;

pub use llm::ChatCompletionsClient;
pub use onebot::{Envelope, OneBotClient};
