//! Language model client

mod client;

pub use client::{extract_json, ChatCompletionsClient};
