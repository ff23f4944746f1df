//! In-process fakes for the gateway and the language model
//!
//! Both record every call so tests can assert on what the pipeline did.
//! Enabled for this crate's tests and, through the `testing` feature, for
//! downstream integration tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use guard_common::{AppConfig, Environment};
use guard_core::entities::{GroupMember, MemberRole, RequestSubType, StrangerInfo};
use guard_core::traits::{GatewayClient, GatewayResult, LanguageModel, LlmResult};
use guard_core::value_objects::{GroupId, UserId};
use guard_core::DomainError;
use guard_db::{create_pool, init_schema, DatabaseConfig, SqlitePool};

use crate::services::{ServiceContext, ServiceContextBuilder};

pub const GROUP_A: GroupId = GroupId::new(1);
pub const GROUP_B: GroupId = GroupId::new(2);
pub const ADMIN_GROUP: GroupId = GroupId::new(900);
pub const BOT_ID: UserId = UserId::new(10_000);
pub const SUPER_ADMIN: UserId = UserId::new(42);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Configuration used across the test suites
///
/// Two managed groups, an admin group, one bot and one super admin.
/// The call gate interval is one millisecond.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.app.env = Environment::Development;
    config.database.url = "sqlite::memory:".into();
    config.gateway.timeout_secs = 2;
    config.llm.timeout_secs = 2;
    config.llm.max_retries = 0;
    config.call_gate.requests_per_minute = 60_000;
    config.call_gate.call_timeout_secs = 5;
    config.groups.managed = vec![GROUP_A, GROUP_B];
    config.groups.admin_group_id = Some(ADMIN_GROUP);
    config.groups.admin_ids = vec![SUPER_ADMIN];
    config.groups.bot_ids = vec![BOT_ID];
    config.admission.enable_level_check = false;
    config.admission.max_joins = 2;
    config.admission.max_kick_count = 1;
    config.admission.max_leave_count = 3;
    config
}

// ============================================================================
// Gateway
// ============================================================================

/// A recorded `set_group_add_request` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAnswer {
    pub flag: String,
    pub sub_type: RequestSubType,
    pub approve: bool,
    pub reason: Option<String>,
}

/// A recorded `send_group_msg` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub group_id: GroupId,
    pub mention: Option<UserId>,
    pub text: String,
}

#[derive(Debug, Default)]
struct GatewayState {
    rosters: HashMap<GroupId, Vec<UserId>>,
    broken_rosters: HashSet<GroupId>,
    roster_delay: Option<Duration>,
    levels: HashMap<UserId, Option<u32>>,
    roles: HashMap<(GroupId, UserId), MemberRole>,
    failing: HashSet<&'static str>,
    answers: Vec<RecordedAnswer>,
    messages: Vec<SentMessage>,
}

/// Scripted gateway
#[derive(Debug, Default)]
pub struct FakeGateway {
    state: Mutex<GatewayState>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_roster(&self, group_id: GroupId, members: &[UserId]) {
        let mut state = lock(&self.state);
        state.broken_rosters.remove(&group_id);
        state.rosters.insert(group_id, members.to_vec());
    }

    /// Roster fetches for this group fail until `set_roster` is called again
    pub fn fail_roster(&self, group_id: GroupId) {
        lock(&self.state).broken_rosters.insert(group_id);
    }

    /// Every later roster fetch sleeps this long before reading the roster
    pub fn delay_roster(&self, delay: Duration) {
        lock(&self.state).roster_delay = Some(delay);
    }

    pub fn set_level(&self, user_id: UserId, level: Option<u32>) {
        lock(&self.state).levels.insert(user_id, level);
    }

    pub fn set_role(&self, group_id: GroupId, user_id: UserId, role: MemberRole) {
        lock(&self.state).roles.insert((group_id, user_id), role);
    }

    /// Every later call of `action` fails
    pub fn fail_action(&self, action: &'static str) {
        lock(&self.state).failing.insert(action);
    }

    pub fn answers(&self) -> Vec<RecordedAnswer> {
        lock(&self.state).answers.clone()
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        lock(&self.state).messages.clone()
    }

    fn check(&self, action: &'static str) -> GatewayResult<()> {
        if lock(&self.state).failing.contains(action) {
            return Err(DomainError::gateway(action, "scripted failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl GatewayClient for FakeGateway {
    async fn get_group_member_list(&self, group_id: GroupId) -> GatewayResult<Vec<GroupMember>> {
        self.check("get_group_member_list")?;
        let delay = lock(&self.state).roster_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = lock(&self.state);
        if state.broken_rosters.contains(&group_id) {
            return Err(DomainError::gateway("get_group_member_list", "roster unavailable"));
        }
        let roster = state
            .rosters
            .get(&group_id)
            .ok_or_else(|| DomainError::gateway("get_group_member_list", "unknown group"))?;
        Ok(roster
            .iter()
            .map(|&user_id| {
                let role = state
                    .roles
                    .get(&(group_id, user_id))
                    .copied()
                    .unwrap_or_default();
                GroupMember::new(user_id, role)
            })
            .collect())
    }

    async fn get_group_member_info(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> GatewayResult<GroupMember> {
        self.check("get_group_member_info")?;
        let role = lock(&self.state)
            .roles
            .get(&(group_id, user_id))
            .copied()
            .ok_or(DomainError::MemberNotFound)?;
        Ok(GroupMember::new(user_id, role))
    }

    async fn get_stranger_info(&self, user_id: UserId) -> GatewayResult<StrangerInfo> {
        self.check("get_stranger_info")?;
        let level = lock(&self.state).levels.get(&user_id).copied().flatten();
        Ok(StrangerInfo {
            user_id,
            nickname: format!("user-{user_id}"),
            level,
        })
    }

    async fn set_group_add_request(
        &self,
        flag: &str,
        sub_type: RequestSubType,
        approve: bool,
        reason: Option<&str>,
    ) -> GatewayResult<()> {
        self.check("set_group_add_request")?;
        lock(&self.state).answers.push(RecordedAnswer {
            flag: flag.to_string(),
            sub_type,
            approve,
            reason: reason.map(str::to_string),
        });
        Ok(())
    }

    async fn send_group_msg(
        &self,
        group_id: GroupId,
        mention: Option<UserId>,
        text: &str,
    ) -> GatewayResult<()> {
        self.check("send_group_msg")?;
        lock(&self.state).messages.push(SentMessage {
            group_id,
            mention,
            text: text.to_string(),
        });
        Ok(())
    }
}

// ============================================================================
// Language model
// ============================================================================

#[derive(Debug, Clone)]
enum Reply {
    Json(Value),
    Text(String),
    Error(String),
}

#[derive(Debug, Default)]
struct LlmState {
    replies: VecDeque<Reply>,
    json_calls: Vec<String>,
    text_calls: Vec<String>,
}

/// Scripted language model
///
/// Replies are consumed in order. With nothing queued, audits agree and
/// chats answer with a fixed greeting.
#[derive(Debug, Default)]
pub struct FakeLanguageModel {
    state: Mutex<LlmState>,
}

impl FakeLanguageModel {
    pub const DEFAULT_TEXT: &'static str = "Welcome!";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, value: Value) {
        lock(&self.state).replies.push_back(Reply::Json(value));
    }

    pub fn push_text(&self, text: &str) {
        lock(&self.state).replies.push_back(Reply::Text(text.to_string()));
    }

    pub fn push_error(&self, message: &str) {
        lock(&self.state).replies.push_back(Reply::Error(message.to_string()));
    }

    /// Messages passed to `chat_json`, in call order
    pub fn json_calls(&self) -> Vec<String> {
        lock(&self.state).json_calls.clone()
    }

    /// Prompts passed to `chat`, in call order
    pub fn text_calls(&self) -> Vec<String> {
        lock(&self.state).text_calls.clone()
    }
}

#[async_trait]
impl LanguageModel for FakeLanguageModel {
    async fn chat_json(
        &self,
        message: &str,
        _schema: &Value,
        _system_prompt: &str,
    ) -> LlmResult<Value> {
        let mut state = lock(&self.state);
        state.json_calls.push(message.to_string());
        match state.replies.pop_front() {
            None => Ok(json!({"agreed": true, "reason": ""})),
            Some(Reply::Json(value)) => Ok(value),
            Some(Reply::Text(text)) => Err(DomainError::MalformedLlmOutput(text)),
            Some(Reply::Error(message)) => Err(DomainError::LlmError(message)),
        }
    }

    async fn chat(&self, prompt: &str) -> LlmResult<String> {
        let mut state = lock(&self.state);
        state.text_calls.push(prompt.to_string());
        match state.replies.pop_front() {
            None => Ok(Self::DEFAULT_TEXT.to_string()),
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Json(value)) => Ok(value.to_string()),
            Some(Reply::Error(message)) => Err(DomainError::LlmError(message)),
        }
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A service context over an in-memory store and the fakes
pub struct TestHarness {
    pub ctx: ServiceContext,
    pub gateway: Arc<FakeGateway>,
    pub llm: Arc<FakeLanguageModel>,
    pub pool: SqlitePool,
}

impl TestHarness {
    /// Build a harness; panics if the in-memory store cannot be created
    pub async fn new(config: AppConfig) -> Self {
        let pool = create_pool(&DatabaseConfig::in_memory())
            .await
            .unwrap_or_else(|e| panic!("in-memory pool: {e}"));
        init_schema(&pool)
            .await
            .unwrap_or_else(|e| panic!("schema bootstrap: {e}"));

        let gateway = Arc::new(FakeGateway::new());
        let llm = Arc::new(FakeLanguageModel::new());
        let ctx = ServiceContextBuilder::new()
            .pool(pool.clone())
            .gateway(gateway.clone())
            .llm(llm.clone())
            .config(Arc::new(config))
            .build()
            .unwrap_or_else(|e| panic!("service context: {e}"));

        Self {
            ctx,
            gateway,
            llm,
            pool,
        }
    }
}
