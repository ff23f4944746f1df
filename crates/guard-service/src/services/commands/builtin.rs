//! Built-in moderation commands

use async_trait::async_trait;
use tracing::info;

use guard_core::entities::JoinRecord;

use super::{Command, Invocation};
use crate::services::context::ServiceContext;
use crate::services::error::ServiceResult;
use crate::services::reconciler::ReconcilerService;

/// Forget a user's join history
pub struct ClearJoinsCommand;

#[async_trait]
impl Command for ClearJoinsCommand {
    fn name(&self) -> &'static str {
        "clear-joins"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["清空次数"]
    }

    async fn execute(&self, ctx: &ServiceContext, invocation: &Invocation) -> ServiceResult<String> {
        let target = invocation.target_user("clear-joins <user_id>")?;
        let deleted = ctx.join_repo().delete_by_user(target).await?;
        info!(target = %target, deleted, "Join history cleared");
        Ok(format!("Cleared {deleted} join record(s) of {target}."))
    }
}

/// Exhaust a user's join quota so every future request is rejected
pub struct BlockCommand;

#[async_trait]
impl Command for BlockCommand {
    fn name(&self) -> &'static str {
        "block"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["永久踢出"]
    }

    async fn execute(&self, ctx: &ServiceContext, invocation: &Invocation) -> ServiceResult<String> {
        let target = invocation.target_user("block <user_id>")?;
        let copies = ctx.config().admission.max_joins.saturating_add(1);
        ctx.join_repo()
            .insert_many(&JoinRecord::now(target, invocation.group_id), copies)
            .await?;
        info!(target = %target, copies, "User blocked");
        Ok(format!("{target} can no longer join managed groups."))
    }
}

/// List users present in more than one managed group
pub struct MultiGroupCommand;

#[async_trait]
impl Command for MultiGroupCommand {
    fn name(&self) -> &'static str {
        "multi-group"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["计算同时在多个群的人"]
    }

    async fn execute(&self, ctx: &ServiceContext, _invocation: &Invocation) -> ServiceResult<String> {
        let groups = &ctx.config().groups;
        let snapshot = ctx.membership_repo().load_snapshot().await?;

        let lines: Vec<String> = snapshot
            .multi_group_members()
            .into_iter()
            .filter_map(|(user, in_groups)| {
                let managed: Vec<String> = in_groups
                    .into_iter()
                    .filter(|g| groups.is_managed(*g))
                    .map(|g| g.to_string())
                    .collect();
                (managed.len() > 1).then(|| format!("{user}: {}", managed.join(", ")))
            })
            .collect();

        if lines.is_empty() {
            Ok("Nobody is in more than one managed group.".to_string())
        } else {
            Ok(format!(
                "{} user(s) in more than one managed group:\n{}",
                lines.len(),
                lines.join("\n")
            ))
        }
    }
}

/// Run a reconciliation pass now
pub struct ReconcileCommand;

#[async_trait]
impl Command for ReconcileCommand {
    fn name(&self) -> &'static str {
        "reconcile"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["同步成员"]
    }

    async fn execute(&self, ctx: &ServiceContext, _invocation: &Invocation) -> ServiceResult<String> {
        let report = ReconcilerService::new(ctx).reconcile_all().await;
        Ok(report.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guard_core::value_objects::{GroupId, UserId};

    use crate::services::error::ServiceError;
    use crate::testing::{test_config, TestHarness, GROUP_A, GROUP_B, SUPER_ADMIN};

    fn invocation(args: &[&str]) -> Invocation {
        Invocation {
            group_id: GROUP_A,
            user_id: SUPER_ADMIN,
            args: args.iter().map(|a| (*a).to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_clear_joins_reports_count() {
        let harness = TestHarness::new(test_config()).await;
        let target = UserId::new(5000);
        harness
            .ctx
            .join_repo()
            .insert_many(&JoinRecord::now(target, GROUP_A), 3)
            .await
            .unwrap();

        let reply = ClearJoinsCommand
            .execute(&harness.ctx, &invocation(&["5000"]))
            .await
            .unwrap();

        assert!(reply.contains("Cleared 3"));
        assert_eq!(harness.ctx.join_repo().count_by_user(target).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_joins_requires_user() {
        let harness = TestHarness::new(test_config()).await;

        let err = ClearJoinsCommand
            .execute(&harness.ctx, &invocation(&["someone"]))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_block_exceeds_quota() {
        let harness = TestHarness::new(test_config()).await;
        let target = UserId::new(5001);

        BlockCommand
            .execute(&harness.ctx, &invocation(&["5001"]))
            .await
            .unwrap();

        let max_joins = i64::from(harness.ctx.config().admission.max_joins);
        assert_eq!(
            harness.ctx.join_repo().count_by_user(target).await.unwrap(),
            max_joins + 1
        );
    }

    #[tokio::test]
    async fn test_multi_group_lists_managed_overlap_only() {
        let harness = TestHarness::new(test_config()).await;
        let members = harness.ctx.membership_repo();
        members.add_member(GROUP_A, UserId::new(1)).await.unwrap();
        members.add_member(GROUP_B, UserId::new(1)).await.unwrap();
        members.add_member(GROUP_A, UserId::new(2)).await.unwrap();
        members.add_member(GroupId::new(999), UserId::new(2)).await.unwrap();

        let reply = MultiGroupCommand
            .execute(&harness.ctx, &invocation(&[]))
            .await
            .unwrap();

        assert!(reply.starts_with("1 user(s)"));
        assert!(reply.contains("1: 1, 2"));
    }

    #[tokio::test]
    async fn test_reconcile_replies_with_report() {
        let harness = TestHarness::new(test_config()).await;
        harness.gateway.set_roster(GROUP_A, &[UserId::new(1)]);
        harness.gateway.set_roster(GROUP_B, &[]);

        let reply = ReconcileCommand
            .execute(&harness.ctx, &invocation(&[]))
            .await
            .unwrap();

        assert_eq!(reply, "reconciled 2 group(s), 0 departure(s) recorded");
    }
}
