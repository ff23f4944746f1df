//! Service context - dependency container for services
//!
//! Holds the record store repositories, the outbound collaborators, the
//! shared call gate and the loaded configuration.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

use guard_common::AppConfig;
use guard_core::traits::{
    GatewayClient, JoinRecordRepository, LanguageModel, MembershipRepository,
    QuitRecordRepository,
};
use guard_core::value_objects::GroupId;
use guard_core::DomainError;
use guard_db::{
    SqliteJoinRecordRepository, SqliteMembershipRepository, SqlitePool,
    SqliteQuitRecordRepository,
};

use super::call_gate::CallGate;
use super::commands::CommandRegistry;
use super::error::{ServiceError, ServiceResult};

/// Service context containing all dependencies
///
/// Cloning is cheap; every field is shared.
#[derive(Clone)]
pub struct ServiceContext {
    // Database pool
    pool: SqlitePool,

    // Repositories
    join_repo: Arc<dyn JoinRecordRepository>,
    quit_repo: Arc<dyn QuitRecordRepository>,
    membership_repo: Arc<dyn MembershipRepository>,

    // Collaborators
    gateway: Arc<dyn GatewayClient>,
    llm: Arc<dyn LanguageModel>,

    // Shared components
    call_gate: Arc<CallGate>,
    commands: Arc<CommandRegistry>,
    reconcile_lock: Arc<Mutex<()>>,
    roster_locks: Arc<RosterLocks>,

    config: Arc<AppConfig>,
}

/// One lock per group, serializing writes to that group's stored roster
#[derive(Debug, Default)]
struct RosterLocks {
    inner: Mutex<HashMap<GroupId, Arc<Mutex<()>>>>,
}

impl RosterLocks {
    async fn lock_group(&self, group_id: GroupId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(group_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

impl ServiceContext {
    /// Create a new service context with all dependencies
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: SqlitePool,
        join_repo: Arc<dyn JoinRecordRepository>,
        quit_repo: Arc<dyn QuitRecordRepository>,
        membership_repo: Arc<dyn MembershipRepository>,
        gateway: Arc<dyn GatewayClient>,
        llm: Arc<dyn LanguageModel>,
        call_gate: Arc<CallGate>,
        commands: Arc<CommandRegistry>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            pool,
            join_repo,
            quit_repo,
            membership_repo,
            gateway,
            llm,
            call_gate,
            commands,
            reconcile_lock: Arc::new(Mutex::new(())),
            roster_locks: Arc::new(RosterLocks::default()),
            config,
        }
    }

    // === Database Pool ===

    /// Get the SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check that the record store answers
    pub async fn ping(&self) -> ServiceResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| ServiceError::Domain(DomainError::DatabaseError(e.to_string())))?;
        Ok(())
    }

    // === Repositories ===

    /// Get the join record repository
    pub fn join_repo(&self) -> &dyn JoinRecordRepository {
        self.join_repo.as_ref()
    }

    /// Get the quit record repository
    pub fn quit_repo(&self) -> &dyn QuitRecordRepository {
        self.quit_repo.as_ref()
    }

    /// Get the membership snapshot repository
    pub fn membership_repo(&self) -> &dyn MembershipRepository {
        self.membership_repo.as_ref()
    }

    // === Collaborators ===

    /// Get the messaging gateway client
    pub fn gateway(&self) -> &dyn GatewayClient {
        self.gateway.as_ref()
    }

    /// Get the language model
    pub fn llm(&self) -> &dyn LanguageModel {
        self.llm.as_ref()
    }

    /// Run one gateway call under the configured time bound
    pub async fn bounded<T, F>(&self, what: &'static str, call: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        tokio::time::timeout(self.config.gateway.timeout(), call)
            .await
            .map_err(|_| DomainError::Timeout(what.to_string()))?
    }

    // === Shared Components ===

    /// Get the call gate in front of the language model
    pub fn call_gate(&self) -> &CallGate {
        self.call_gate.as_ref()
    }

    /// Get the admin command registry
    pub fn commands(&self) -> &CommandRegistry {
        self.commands.as_ref()
    }

    /// Serialize reconciliation passes
    pub async fn reconcile_guard(&self) -> MutexGuard<'_, ()> {
        self.reconcile_lock.lock().await
    }

    /// Exclusive access to one group's stored roster
    ///
    /// Held by a reconciliation from roster fetch to snapshot swap, and by
    /// notice bookkeeping while it edits the snapshot.
    pub async fn roster_guard(&self, group_id: GroupId) -> OwnedMutexGuard<()> {
        self.roster_locks.lock_group(group_id).await
    }

    // === Configuration ===

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        self.config.as_ref()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("pool", &"SqlitePool")
            .field("repositories", &"...")
            .field("collaborators", &"...")
            .field("managed_groups", &self.config.groups.managed)
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
///
/// Repositories default to the SQLite implementations over `pool`; the
/// call gate defaults to one built from `config.call_gate`.
#[derive(Default)]
pub struct ServiceContextBuilder {
    pool: Option<SqlitePool>,
    join_repo: Option<Arc<dyn JoinRecordRepository>>,
    quit_repo: Option<Arc<dyn QuitRecordRepository>>,
    membership_repo: Option<Arc<dyn MembershipRepository>>,
    gateway: Option<Arc<dyn GatewayClient>>,
    llm: Option<Arc<dyn LanguageModel>>,
    call_gate: Option<Arc<CallGate>>,
    commands: Option<Arc<CommandRegistry>>,
    config: Option<Arc<AppConfig>>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool(mut self, pool: SqlitePool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn join_repo(mut self, repo: Arc<dyn JoinRecordRepository>) -> Self {
        self.join_repo = Some(repo);
        self
    }

    pub fn quit_repo(mut self, repo: Arc<dyn QuitRecordRepository>) -> Self {
        self.quit_repo = Some(repo);
        self
    }

    pub fn membership_repo(mut self, repo: Arc<dyn MembershipRepository>) -> Self {
        self.membership_repo = Some(repo);
        self
    }

    pub fn gateway(mut self, gateway: Arc<dyn GatewayClient>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn llm(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn call_gate(mut self, gate: Arc<CallGate>) -> Self {
        self.call_gate = Some(gate);
        self
    }

    pub fn commands(mut self, commands: Arc<CommandRegistry>) -> Self {
        self.commands = Some(commands);
        self
    }

    pub fn config(mut self, config: Arc<AppConfig>) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        let pool = self
            .pool
            .ok_or_else(|| ServiceError::validation("pool is required"))?;
        let config = self
            .config
            .ok_or_else(|| ServiceError::validation("config is required"))?;
        let gateway = self
            .gateway
            .ok_or_else(|| ServiceError::validation("gateway is required"))?;
        let llm = self
            .llm
            .ok_or_else(|| ServiceError::validation("llm is required"))?;

        let join_repo = self
            .join_repo
            .unwrap_or_else(|| Arc::new(SqliteJoinRecordRepository::new(pool.clone())));
        let quit_repo = self
            .quit_repo
            .unwrap_or_else(|| Arc::new(SqliteQuitRecordRepository::new(pool.clone())));
        let membership_repo = self
            .membership_repo
            .unwrap_or_else(|| Arc::new(SqliteMembershipRepository::new(pool.clone())));
        let call_gate = self
            .call_gate
            .unwrap_or_else(|| Arc::new(CallGate::from_config(&config.call_gate)));
        let commands = self
            .commands
            .unwrap_or_else(|| Arc::new(CommandRegistry::with_builtins()));

        Ok(ServiceContext::new(
            pool,
            join_repo,
            quit_repo,
            membership_repo,
            gateway,
            llm,
            call_gate,
            commands,
            config,
        ))
    }
}
