//! Axum extractors for request handling

mod inbound;

pub use inbound::{InboundEvent, SELF_ID_HEADER};
