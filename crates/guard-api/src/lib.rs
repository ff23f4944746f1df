//! # guard-api
//!
//! Webhook ingress built with Axum: the gateway posts every event here, the
//! request is checked and acknowledged, and the event is handled on its own
//! task.

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{create_app, create_app_state, run, run_server, spawn_reconciliation};
pub use state::AppState;
