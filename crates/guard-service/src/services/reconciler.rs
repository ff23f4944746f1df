//! Membership reconciler
//!
//! Diffs each managed group's live roster against the stored snapshot,
//! records a `leave` for every user that disappeared and replaces the
//! stored roster. A group whose roster cannot be fetched keeps its old
//! snapshot until the next pass.

use std::collections::HashSet;
use std::fmt;

use chrono::Utc;
use futures::future::join_all;
use tracing::{info, instrument, warn};

use guard_core::value_objects::{GroupId, UserId};
use guard_core::DomainError;

use super::context::ServiceContext;

/// Outcome for one successfully reconciled group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReconcile {
    pub group_id: GroupId,
    pub departed: Vec<UserId>,
    pub live: usize,
}

/// Outcome of one pass across all managed groups
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub groups: Vec<GroupReconcile>,
    pub failed: Vec<GroupId>,
}

impl ReconcileReport {
    /// Total departures recorded in this pass
    pub fn departed_total(&self) -> usize {
        self.groups.iter().map(|g| g.departed.len()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reconciled {} group(s), {} departure(s) recorded",
            self.groups.len(),
            self.departed_total()
        )?;
        if !self.failed.is_empty() {
            let failed: Vec<String> = self.failed.iter().map(ToString::to_string).collect();
            write!(f, ", failed: {}", failed.join(", "))?;
        }
        Ok(())
    }
}

/// Reconciler service
pub struct ReconcilerService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ReconcilerService<'a> {
    /// Create a new ReconcilerService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Reconcile every managed group
    ///
    /// Passes never overlap; a pass started while another runs waits for it.
    /// Rosters are fetched concurrently, store writes are one transaction
    /// per group.
    #[instrument(skip(self))]
    pub async fn reconcile_all(&self) -> ReconcileReport {
        let _pass = self.ctx.reconcile_guard().await;
        let managed = self.ctx.config().groups.managed.clone();

        let outcomes = join_all(managed.iter().map(|&g| self.reconcile_one(g))).await;

        let mut report = ReconcileReport::default();
        for (group_id, outcome) in managed.into_iter().zip(outcomes) {
            match outcome {
                Ok(group) => report.groups.push(group),
                Err(e) => {
                    warn!(%group_id, error = %e, "Group skipped this pass");
                    report.failed.push(group_id);
                }
            }
        }

        info!(
            groups = report.groups.len(),
            departed = report.departed_total(),
            failed = report.failed.len(),
            "Reconciliation pass finished"
        );
        report
    }

    /// Reconcile a single group
    pub async fn reconcile_group(&self, group_id: GroupId) -> Result<GroupReconcile, DomainError> {
        let _pass = self.ctx.reconcile_guard().await;
        self.reconcile_one(group_id).await
    }

    async fn reconcile_one(&self, group_id: GroupId) -> Result<GroupReconcile, DomainError> {
        // Notices for this group wait until the new snapshot is stored
        let _roster = self.ctx.roster_guard(group_id).await;
        let roster = self
            .ctx
            .bounded(
                "group member list",
                self.ctx.gateway().get_group_member_list(group_id),
            )
            .await?;
        let live: HashSet<UserId> = roster.into_iter().map(|m| m.user_id).collect();

        let departed = self
            .ctx
            .membership_repo()
            .reconcile_group(group_id, &live, Utc::now())
            .await?;

        if !departed.is_empty() {
            info!(%group_id, departed = departed.len(), "Departures detected");
        }
        Ok(GroupReconcile {
            group_id,
            departed,
            live: live.len(),
        })
    }
}
