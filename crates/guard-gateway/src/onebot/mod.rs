//! OneBot v11 action API client

mod client;
mod envelope;

pub use client::{message_segments, OneBotClient};
pub use envelope::Envelope;
