//! Notice service - keeps the record store in step with membership notices

use tracing::{info, instrument, warn};

use guard_core::entities::{JoinRecord, QuitRecord, QuitType};
use guard_core::value_objects::{GroupId, UserId};
use guard_core::DomainError;

use super::audit::AuditService;
use super::context::ServiceContext;

/// Notice service
pub struct NoticeService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> NoticeService<'a> {
    /// Create a new NoticeService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// A user became a member
    ///
    /// The snapshot gains the member. Joins approved by a human (any operator
    /// that is not the bot) are counted here; bot approvals were counted when
    /// the request was approved.
    #[instrument(skip(self))]
    pub async fn member_joined(
        &self,
        group_id: GroupId,
        user_id: UserId,
        operator_id: Option<UserId>,
    ) -> Result<(), DomainError> {
        {
            let _roster = self.ctx.roster_guard(group_id).await;
            self.ctx.membership_repo().add_member(group_id, user_id).await?;
        }

        let by_bot = operator_id.is_some_and(|op| self.ctx.config().groups.is_bot(op));
        if !by_bot {
            self.ctx
                .join_repo()
                .insert(&JoinRecord::now(user_id, group_id))
                .await?;
        }
        info!(%group_id, %user_id, by_bot, "Member joined");

        if self.ctx.config().welcome.enabled {
            self.welcome(group_id, user_id).await;
        }
        Ok(())
    }

    /// A user left or was removed
    #[instrument(skip(self))]
    pub async fn member_left(
        &self,
        group_id: GroupId,
        user_id: UserId,
        quit_type: QuitType,
    ) -> Result<(), DomainError> {
        let _roster = self.ctx.roster_guard(group_id).await;
        self.ctx
            .membership_repo()
            .record_departure(&QuitRecord::now(user_id, group_id, quit_type))
            .await?;
        info!(%group_id, %user_id, %quit_type, "Member left");
        Ok(())
    }

    /// The bot itself was removed
    pub fn bot_removed(&self, group_id: GroupId) {
        warn!(%group_id, "Bot was removed from a managed group");
    }

    async fn welcome(&self, group_id: GroupId, user_id: UserId) {
        let prompt = &self.ctx.config().welcome.prompt;
        let text = match AuditService::new(self.ctx).compose(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Welcome text generation failed");
                return;
            }
        };

        if let Err(e) = self
            .ctx
            .bounded(
                "welcome message",
                self.ctx.gateway().send_group_msg(group_id, Some(user_id), &text),
            )
            .await
        {
            warn!(error = %e, "Welcome message not delivered");
        }
    }
}
