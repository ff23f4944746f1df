//! Route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{health, webhook};
use crate::state::AppState;

/// Webhook routes; the gateway may be configured with either path
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", post(webhook::receive_event))
        .route("/onebot", post(webhook::receive_event))
}

/// Health check routes (exported separately to bypass rate limiting)
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
}
