//! Admission decision chain
//!
//! A join request is evaluated by an ordered, short-circuiting list of
//! rules. Each rule passes, rejects or escalates; the first non-pass
//! outcome is terminal. A rule that errors escalates, so a broken rule can
//! never approve on its own.

use std::fmt;

use tracing::{error, info, instrument, warn};

use guard_core::entities::{JoinRecord, JoinRequest, QuitTally};
use guard_core::DomainError;

use super::audit::AuditService;
use super::context::ServiceContext;

pub const REASON_MISSING_FLAG: &str = "missing approval token";
pub const REASON_EMPTY_COMMENT: &str = "empty comment";
pub const REASON_LEVEL_LOOKUP: &str = "level lookup failed";
pub const REASON_LEVEL_TOO_LOW: &str = "level too low";
pub const REASON_MEMBER_ELSEWHERE: &str = "already a member elsewhere";
pub const REASON_TOO_MANY_KICKS: &str = "too many kicks";
pub const REASON_TOO_MANY_LEAVES: &str = "too many voluntary leaves";
pub const REASON_JOIN_LIMIT: &str = "join limit exceeded";
pub const REASON_AUDIT_REFUSED: &str = "content audit refused";

/// Result of one rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Pass,
    Reject(String),
    Escalate(String),
}

/// Final decision for a join request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject(String),
    Escalate(String),
}

impl Decision {
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Approve => None,
            Self::Reject(reason) | Self::Escalate(reason) => Some(reason),
        }
    }
}

/// Rules in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    ApprovalToken,
    Comment,
    Level,
    CrossGroup,
    QuitHistory,
    JoinQuota,
    ContentAudit,
}

impl Rule {
    pub const CHAIN: [Rule; 7] = [
        Rule::ApprovalToken,
        Rule::Comment,
        Rule::Level,
        Rule::CrossGroup,
        Rule::QuitHistory,
        Rule::JoinQuota,
        Rule::ContentAudit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ApprovalToken => "approval_token",
            Self::Comment => "comment",
            Self::Level => "level",
            Self::CrossGroup => "cross_group",
            Self::QuitHistory => "quit_history",
            Self::JoinQuota => "join_quota",
            Self::ContentAudit => "content_audit",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Admission service
pub struct AdmissionService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AdmissionService<'a> {
    /// Create a new AdmissionService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Decide and act on a join request
    ///
    /// Approve and reject answer the request through the gateway; escalate
    /// notifies the admin group and leaves the request pending. If the
    /// gateway cannot take the decided action, the request is escalated.
    #[instrument(skip(self, request), fields(group_id = %request.group_id, user_id = %request.user_id, sub_type = %request.sub_type))]
    pub async fn handle(&self, request: &JoinRequest) -> Decision {
        let decision = self.evaluate(request).await;

        match &decision {
            Decision::Approve => {
                if let Err(e) = self.answer(request, true, None).await {
                    error!(error = %e, "Approve call failed");
                    self.escalate(request, &format!("approval failed: {e}")).await;
                    return Decision::Escalate(format!("approval failed: {e}"));
                }
                if let Err(e) = self
                    .ctx
                    .join_repo()
                    .insert(&JoinRecord::now(request.user_id, request.group_id))
                    .await
                {
                    error!(error = %e, "Approved but join record was not stored");
                }
                info!(group_id = %request.group_id, user_id = %request.user_id, "Join request approved");
            }
            Decision::Reject(reason) => {
                if let Err(e) = self.answer(request, false, Some(reason)).await {
                    error!(error = %e, reason = %reason, "Reject call failed");
                    self.escalate(request, &format!("rejection failed ({reason}): {e}"))
                        .await;
                    return Decision::Escalate(format!("rejection failed ({reason}): {e}"));
                }
                info!(group_id = %request.group_id, user_id = %request.user_id, reason = %reason, "Join request rejected");
            }
            Decision::Escalate(reason) => {
                self.escalate(request, reason).await;
                info!(group_id = %request.group_id, user_id = %request.user_id, reason = %reason, "Join request escalated");
            }
        }

        decision
    }

    /// Run the rule chain without acting on the result
    pub async fn evaluate(&self, request: &JoinRequest) -> Decision {
        for rule in Rule::CHAIN {
            match self.check(rule, request).await {
                Ok(RuleOutcome::Pass) => {}
                Ok(RuleOutcome::Reject(reason)) => return Decision::Reject(reason),
                Ok(RuleOutcome::Escalate(reason)) => return Decision::Escalate(reason),
                Err(e) => {
                    error!(rule = %rule, error = %e, "Admission rule failed");
                    return Decision::Escalate(format!("{rule} check failed: {e}"));
                }
            }
        }
        Decision::Approve
    }

    async fn check(&self, rule: Rule, request: &JoinRequest) -> Result<RuleOutcome, DomainError> {
        match rule {
            Rule::ApprovalToken => Ok(Self::check_flag(request)),
            Rule::Comment => Ok(Self::check_comment(request)),
            Rule::Level => self.check_level(request).await,
            Rule::CrossGroup => self.check_cross_group(request).await,
            Rule::QuitHistory => self.check_quit_history(request).await,
            Rule::JoinQuota => self.check_join_quota(request).await,
            Rule::ContentAudit => self.check_content(request).await,
        }
    }

    fn check_flag(request: &JoinRequest) -> RuleOutcome {
        if request.has_flag() {
            RuleOutcome::Pass
        } else {
            RuleOutcome::Escalate(REASON_MISSING_FLAG.into())
        }
    }

    fn check_comment(request: &JoinRequest) -> RuleOutcome {
        if request.has_comment() {
            RuleOutcome::Pass
        } else {
            RuleOutcome::Escalate(REASON_EMPTY_COMMENT.into())
        }
    }

    async fn check_level(&self, request: &JoinRequest) -> Result<RuleOutcome, DomainError> {
        let admission = &self.ctx.config().admission;
        if !admission.enable_level_check {
            return Ok(RuleOutcome::Pass);
        }

        let info = self
            .ctx
            .bounded("stranger info lookup", self.ctx.gateway().get_stranger_info(request.user_id))
            .await;
        let level = match info {
            Ok(info) => info.known_level(),
            Err(e) => {
                warn!(error = %e, "Level lookup failed");
                None
            }
        };

        Ok(match level {
            None => RuleOutcome::Escalate(REASON_LEVEL_LOOKUP.into()),
            Some(level) if level < admission.min_join_level => {
                RuleOutcome::Reject(REASON_LEVEL_TOO_LOW.into())
            }
            Some(_) => RuleOutcome::Pass,
        })
    }

    async fn check_cross_group(&self, request: &JoinRequest) -> Result<RuleOutcome, DomainError> {
        let groups = &self.ctx.config().groups;
        let elsewhere = self
            .ctx
            .membership_repo()
            .groups_of(request.user_id)
            .await?
            .into_iter()
            .any(|g| g != request.group_id && groups.is_managed(g));

        Ok(if elsewhere {
            RuleOutcome::Reject(REASON_MEMBER_ELSEWHERE.into())
        } else {
            RuleOutcome::Pass
        })
    }

    async fn check_quit_history(&self, request: &JoinRequest) -> Result<RuleOutcome, DomainError> {
        let history = self.ctx.quit_repo().find_by_user(request.user_id).await?;
        if history.is_empty() {
            return Ok(RuleOutcome::Pass);
        }

        let admission = &self.ctx.config().admission;
        let tally = QuitTally::from_records(&history);
        Ok(if tally.kicks >= admission.max_kick_count {
            RuleOutcome::Reject(REASON_TOO_MANY_KICKS.into())
        } else if tally.leaves >= admission.max_leave_count {
            RuleOutcome::Reject(REASON_TOO_MANY_LEAVES.into())
        } else {
            RuleOutcome::Pass
        })
    }

    async fn check_join_quota(&self, request: &JoinRequest) -> Result<RuleOutcome, DomainError> {
        let joins = self.ctx.join_repo().count_by_user(request.user_id).await?;
        Ok(if joins >= i64::from(self.ctx.config().admission.max_joins) {
            RuleOutcome::Reject(REASON_JOIN_LIMIT.into())
        } else {
            RuleOutcome::Pass
        })
    }

    async fn check_content(&self, request: &JoinRequest) -> Result<RuleOutcome, DomainError> {
        let decision = AuditService::new(self.ctx).audit(&request.comment).await?;
        Ok(if decision.agreed {
            RuleOutcome::Pass
        } else if decision.reason.trim().is_empty() {
            RuleOutcome::Reject(REASON_AUDIT_REFUSED.into())
        } else {
            RuleOutcome::Reject(decision.reason)
        })
    }

    async fn answer(
        &self,
        request: &JoinRequest,
        approve: bool,
        reason: Option<&str>,
    ) -> Result<(), DomainError> {
        self.ctx
            .bounded(
                "join request answer",
                self.ctx
                    .gateway()
                    .set_group_add_request(&request.flag, request.sub_type, approve, reason),
            )
            .await
    }

    /// Post the request to the admin group for a human decision
    async fn escalate(&self, request: &JoinRequest, reason: &str) {
        let Some(admin_group) = self.ctx.config().groups.admin_group_id else {
            warn!(reason = %reason, "No admin group configured; escalation only logged");
            return;
        };

        let comment = if request.has_comment() {
            request.comment.trim()
        } else {
            "(none)"
        };
        let text = format!(
            "Join request needs review\ngroup: {}\nuser: {}\ntype: {}\nreason: {reason}\ncomment: {comment}",
            request.group_id, request.user_id, request.sub_type
        );

        if let Err(e) = self
            .ctx
            .bounded(
                "admin notification",
                self.ctx.gateway().send_group_msg(admin_group, None, &text),
            )
            .await
        {
            error!(error = %e, admin_group = %admin_group, "Escalation notice failed");
        }
    }
}
