//! Admin commands
//!
//! A group message that opens by mentioning a bot account followed by text
//! is read as `<command> [args]` (or `<command>：<args>`). Commands live in
//! a [`CommandRegistry`] populated once at startup, keyed by name and by
//! every alias.

mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use guard_common::GroupsConfig;
use guard_core::events::MessageEvent;
use guard_core::value_objects::{GroupId, UserId};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

pub use builtin::{BlockCommand, ClearJoinsCommand, MultiGroupCommand, ReconcileCommand};

// ============================================================================
// Parsing
// ============================================================================

/// A command line addressed to the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
}

impl ParsedCommand {
    /// Parse a message body, `None` when it is not addressed to a bot
    ///
    /// Accepts the segment array form and the plain string form with a
    /// leading `[CQ:at,qq=<id>]` code. Mentions after the command text are
    /// appended to the arguments as user ids.
    pub fn parse(message: &Value, groups: &GroupsConfig) -> Option<Self> {
        match message {
            Value::Array(segments) => Self::from_segments(segments, groups),
            Value::String(raw) => Self::from_cq_string(raw, groups),
            _ => None,
        }
    }

    fn from_segments(segments: &[Value], groups: &GroupsConfig) -> Option<Self> {
        let (first, rest) = segments.split_first()?;
        let bot = segment_mention(first)?;
        if !groups.is_bot(bot) {
            return None;
        }

        let mut text = String::new();
        let mut mentions = Vec::new();
        for segment in rest {
            match segment.get("type").and_then(Value::as_str) {
                Some("text") => {
                    if let Some(t) = segment.pointer("/data/text").and_then(Value::as_str) {
                        text.push_str(t);
                        text.push(' ');
                    }
                }
                Some("at") => {
                    if let Some(user) = segment_mention(segment) {
                        mentions.push(user.to_string());
                    }
                }
                _ => {}
            }
        }

        let mut command = Self::from_text(&text)?;
        command.args.extend(mentions);
        Some(command)
    }

    fn from_cq_string(raw: &str, groups: &GroupsConfig) -> Option<Self> {
        let rest = raw.trim_start().strip_prefix("[CQ:at,qq=")?;
        let (id, text) = rest.split_once(']')?;
        let bot = UserId::parse(id).ok()?;
        if !groups.is_bot(bot) {
            return None;
        }
        Self::from_text(text)
    }

    /// Split `<command> [args]` or `<command>：<args>`
    pub fn from_text(text: &str) -> Option<Self> {
        let text = text.trim();
        let (name, rest) = match text.find(|c: char| c.is_whitespace() || c == ':' || c == '：') {
            Some(at) => {
                let sep_len = text[at..].chars().next().map_or(1, char::len_utf8);
                (&text[..at], &text[at + sep_len..])
            }
            None => (text, ""),
        };
        if name.is_empty() {
            return None;
        }

        let args = rest
            .split(|c: char| c.is_whitespace() || c == ',' || c == '，')
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();
        Some(Self {
            name: name.to_lowercase(),
            args,
        })
    }
}

fn segment_mention(segment: &Value) -> Option<UserId> {
    if segment.get("type").and_then(Value::as_str) != Some("at") {
        return None;
    }
    match segment.pointer("/data/qq")? {
        Value::String(s) => UserId::parse(s).ok(),
        Value::Number(n) => n.as_i64().map(UserId::new),
        _ => None,
    }
}

// ============================================================================
// Commands
// ============================================================================

/// One command call
#[derive(Debug, Clone)]
pub struct Invocation {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub args: Vec<String>,
}

impl Invocation {
    /// First argument as a user id
    pub fn target_user(&self, usage: &str) -> ServiceResult<UserId> {
        self.args
            .first()
            .and_then(|arg| UserId::parse(arg).ok())
            .filter(|user| user.into_inner() > 0)
            .ok_or_else(|| ServiceError::validation(format!("usage: {usage}")))
    }
}

/// An admin command; the returned text is replied to the sender
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    async fn execute(&self, ctx: &ServiceContext, invocation: &Invocation) -> ServiceResult<String>;
}

/// Commands by name and alias
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the moderation commands
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ClearJoinsCommand));
        registry.register(Arc::new(BlockCommand));
        registry.register(Arc::new(MultiGroupCommand));
        registry.register(Arc::new(ReconcileCommand));
        registry
    }

    /// Add a command under its name and aliases; later registrations win
    pub fn register(&mut self, command: Arc<dyn Command>) {
        for alias in command.aliases() {
            self.commands.insert(alias.to_lowercase(), Arc::clone(&command));
        }
        self.commands.insert(command.name().to_lowercase(), command);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(&name.to_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run the command carried by a group message, if any
    ///
    /// Returns the executed command name. Denials and failures are replied
    /// in the group and returned as errors.
    #[instrument(skip(self, ctx, message), fields(group_id = ?message.group_id, user_id = %message.user_id))]
    pub async fn dispatch(
        &self,
        ctx: &ServiceContext,
        message: &MessageEvent,
    ) -> ServiceResult<Option<&'static str>> {
        let Some(group_id) = message.group_id else {
            return Ok(None);
        };
        let Some(parsed) = ParsedCommand::parse(&message.message, &ctx.config().groups) else {
            return Ok(None);
        };
        let Some(command) = self.get(&parsed.name) else {
            info!(command = %parsed.name, "Unknown command ignored");
            return Ok(None);
        };

        let invocation = Invocation {
            group_id,
            user_id: message.user_id,
            args: parsed.args,
        };

        if !is_authorized(ctx, group_id, message.user_id).await? {
            warn!(command = command.name(), "Command denied");
            reply(ctx, &invocation, "You are not allowed to run this command.").await;
            return Err(ServiceError::permission_denied(command.name()));
        }

        debug!(command = command.name(), args = ?invocation.args, "Running command");
        match command.execute(ctx, &invocation).await {
            Ok(text) => {
                reply(ctx, &invocation, &text).await;
                info!(command = command.name(), "Command executed");
                Ok(Some(command.name()))
            }
            Err(e) => {
                reply(ctx, &invocation, &format!("Command failed: {e}")).await;
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("CommandRegistry")
            .field("commands", &names)
            .finish()
    }
}

/// Super admins anywhere, owners and admins of the group
async fn is_authorized(ctx: &ServiceContext, group_id: GroupId, user_id: UserId) -> ServiceResult<bool> {
    if ctx.config().groups.is_super_admin(user_id) {
        return Ok(true);
    }
    let member = ctx
        .bounded(
            "group member info",
            ctx.gateway().get_group_member_info(group_id, user_id),
        )
        .await;
    match member {
        Ok(member) => Ok(member.role.is_manager()),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn reply(ctx: &ServiceContext, invocation: &Invocation, text: &str) {
    if let Err(e) = ctx
        .bounded(
            "command reply",
            ctx.gateway()
                .send_group_msg(invocation.group_id, Some(invocation.user_id), text),
        )
        .await
    {
        warn!(error = %e, "Command reply not delivered");
    }
}
