//! Webhook handler
//!
//! Acknowledges an accepted event immediately and handles it on its own
//! task; the response never carries a decision.

use axum::{extract::State, http::StatusCode};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::extractors::InboundEvent;
use crate::state::AppState;

/// Receive one gateway event
///
/// POST /
/// POST /onebot
pub async fn receive_event(
    State(state): State<AppState>,
    InboundEvent { self_id, event }: InboundEvent,
) -> StatusCode {
    let span = info_span!(
        "event",
        event_id = %Uuid::new_v4(),
        post_type = event.post_type(),
        self_id = %self_id,
    );

    let dispatcher = state.dispatcher().clone();
    tokio::spawn(
        async move {
            dispatcher.dispatch(event).await;
        }
        .instrument(span),
    );

    StatusCode::OK
}
