//! Event dispatcher - classifies an inbound event and runs its handler
//!
//! Runs detached from the webhook response; every failure ends here as a
//! log line.

use std::sync::Arc;

use tracing::{debug, error, instrument, warn};

use guard_core::events::GroupEvent;

use super::admission::{AdmissionService, Decision};
use super::classifier::{classify, Route};
use super::context::ServiceContext;
use super::error::ServiceError;
use super::notices::NoticeService;

/// Routes events to the admission chain, notice hooks and commands
#[derive(Clone)]
pub struct EventDispatcher {
    ctx: Arc<ServiceContext>,
}

impl EventDispatcher {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }

    /// Handle one event to completion; returns the route it took
    #[instrument(skip_all, fields(post_type = event.post_type()))]
    pub async fn dispatch(&self, event: GroupEvent) -> Route {
        let route = classify(&event, &self.ctx.config().groups);
        debug!(route = route.kind(), "Event classified");

        match &route {
            Route::JoinRequest(request) => {
                let decision = AdmissionService::new(&self.ctx).handle(request).await;
                if let Decision::Escalate(reason) = decision {
                    debug!(reason = %reason, "Request left for human review");
                }
            }
            Route::MemberJoined {
                group_id,
                user_id,
                operator_id,
            } => {
                if let Err(e) = NoticeService::new(&self.ctx)
                    .member_joined(*group_id, *user_id, *operator_id)
                    .await
                {
                    error!(%group_id, %user_id, error = %e, "Join bookkeeping failed");
                }
            }
            Route::MemberLeft {
                group_id,
                user_id,
                quit_type,
            } => {
                if let Err(e) = NoticeService::new(&self.ctx)
                    .member_left(*group_id, *user_id, *quit_type)
                    .await
                {
                    error!(%group_id, %user_id, error = %e, "Departure bookkeeping failed");
                }
            }
            Route::BotRemoved { group_id } => NoticeService::new(&self.ctx).bot_removed(*group_id),
            Route::GroupMessage(message) => {
                match self.ctx.commands().dispatch(&self.ctx, message).await {
                    Ok(_) => {}
                    Err(e @ (ServiceError::PermissionDenied { .. } | ServiceError::Validation(_))) => {
                        warn!(error = %e, "Command refused");
                    }
                    Err(e) => error!(error = %e, "Command failed"),
                }
            }
            Route::Unmanaged(group_id) => debug!(%group_id, "Event for unmanaged group dropped"),
            Route::Ignored(why) => debug!(reason = *why, "Event ignored"),
        }

        route
    }
}
