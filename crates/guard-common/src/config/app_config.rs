//! Application configuration structs
//!
//! Loads configuration from an optional TOML file and `GUARD__`-prefixed
//! environment variables (e.g. `GUARD__GROUPS__MANAGED=1,2,3`).

use std::time::Duration;

use config::{Config, Environment as EnvSource, File, FileFormat};
use guard_core::{GroupId, UserId};
use serde::Deserialize;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "group-guard.toml";

/// Environment variable overriding the config file path
pub const CONFIG_PATH_VAR: &str = "GUARD_CONFIG";

/// Keys that are parsed as comma-separated lists when set from the environment
const LIST_KEYS: [&str; 3] = ["groups.managed", "groups.admin_ids", "groups.bot_ids"];

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub llm: LlmConfig,
    pub call_gate: CallGateConfig,
    pub groups: GroupsConfig,
    pub admission: AdmissionConfig,
    pub welcome: WelcomeConfig,
    pub reconcile: ReconcileConfig,
    pub rate_limit: RateLimitConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            env: Environment::default(),
        }
    }
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Webhook listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Record store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Messaging gateway HTTP API
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            access_token: None,
            timeout_secs: default_gateway_timeout(),
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Chat-completions endpoint used for audits and free text
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: None,
            model: default_llm_model(),
            timeout_secs: default_llm_timeout(),
            max_retries: default_llm_retries(),
        }
    }
}

impl LlmConfig {
    /// First retry delay; doubles per retry
    pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);
    /// Ceiling on one retry delay
    pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(10);

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay before retry number `retry` (0-based) when the first delay is `first`
    pub fn backoff_delay(first: Duration, retry: u32) -> Duration {
        first
            .saturating_mul(2u32.saturating_pow(retry))
            .min(Self::MAX_RETRY_BACKOFF.max(first))
    }

    /// Longest one call can take with every retry spent
    pub fn retry_budget(&self) -> Duration {
        let attempts = self.timeout().saturating_mul(self.max_retries.saturating_add(1));
        (0..self.max_retries).fold(attempts, |total, retry| {
            total.saturating_add(Self::backoff_delay(Self::RETRY_BACKOFF, retry))
        })
    }
}

/// Shared limiter in front of every language model call
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CallGateConfig {
    pub requests_per_minute: u32,
    pub call_timeout_secs: u64,
}

impl Default for CallGateConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

impl CallGateConfig {
    /// Minimum spacing between two underlying calls (`60 / rpm` seconds)
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs_f64(60.0 / f64::from(self.requests_per_minute.max(1)))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// Groups the bot administers and the accounts it trusts
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GroupsConfig {
    pub managed: Vec<GroupId>,
    pub admin_group_id: Option<GroupId>,
    pub admin_ids: Vec<UserId>,
    pub bot_ids: Vec<UserId>,
}

impl GroupsConfig {
    /// Whether the group is one the bot administers
    pub fn is_managed(&self, group_id: GroupId) -> bool {
        self.managed.contains(&group_id)
    }

    /// Managed groups plus the admin group
    pub fn accepts_events_from(&self, group_id: GroupId) -> bool {
        self.is_managed(group_id) || self.admin_group_id == Some(group_id)
    }

    pub fn is_bot(&self, user_id: UserId) -> bool {
        self.bot_ids.contains(&user_id)
    }

    pub fn is_super_admin(&self, user_id: UserId) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

/// Thresholds for the join request rules
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    pub enable_level_check: bool,
    pub min_join_level: u32,
    pub max_joins: u32,
    pub max_kick_count: u32,
    pub max_leave_count: u32,
    pub audit_system_prompt: String,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            enable_level_check: false,
            min_join_level: 0,
            max_joins: default_max_joins(),
            max_kick_count: default_max_kick_count(),
            max_leave_count: default_max_leave_count(),
            audit_system_prompt: default_audit_prompt(),
        }
    }
}

/// Welcome message for new members
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WelcomeConfig {
    pub enabled: bool,
    pub prompt: String,
}

impl Default for WelcomeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            prompt: default_welcome_prompt(),
        }
    }
}

/// Periodic reconciliation; a startup pass always runs
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub interval_secs: u64,
}

impl ReconcileConfig {
    /// Cadence of the background pass, `None` when disabled
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }
}

/// Ingress flood guard
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst: default_burst(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "group-guard".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_database_url() -> String {
    "sqlite://group-guard.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_gateway_timeout() -> u64 {
    10
}

fn default_llm_endpoint() -> String {
    "https://api.deepseek.com/chat/completions".to_string()
}

fn default_llm_model() -> String {
    "deepseek-chat".to_string()
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_llm_retries() -> u32 {
    3
}

fn default_requests_per_minute() -> u32 {
    10
}

fn default_call_timeout() -> u64 {
    150
}

fn default_max_joins() -> u32 {
    2
}

fn default_max_kick_count() -> u32 {
    1
}

fn default_max_leave_count() -> u32 {
    3
}

fn default_audit_prompt() -> String {
    "You review applications to join a chat group. Decide whether the application text \
     meets the group's entry requirement. If it does not, give a short reason that does \
     not reveal the expected answer."
        .to_string()
}

fn default_welcome_prompt() -> String {
    "Write a short welcome message for a new group member. Remind them to read every \
     group announcement and to follow the group rules; breaking them means removal."
        .to_string()
}

fn default_requests_per_second() -> u32 {
    50
}

fn default_burst() -> u32 {
    100
}

impl AppConfig {
    /// Load configuration from the config file and environment variables
    ///
    /// The file path comes from `GUARD_CONFIG`, falling back to
    /// `group-guard.toml`; a missing file is not an error.
    ///
    /// # Errors
    /// Returns an error if a source cannot be parsed or a value is invalid
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());

        let mut env = EnvSource::with_prefix("GUARD")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .try_parsing(true);
        for key in LIST_KEYS {
            env = env.with_list_parse_key(key);
        }

        let settings = Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(env)
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        Self::from_settings(settings)
    }

    /// Parse configuration from TOML text (no environment overrides)
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: Config) -> Result<Self, ConfigError> {
        let config: Self = settings
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde defaults cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.call_gate.requests_per_minute == 0 {
            return Err(ConfigError::InvalidValue(
                "call_gate.requests_per_minute",
                "must be greater than zero".into(),
            ));
        }
        let budget = self.llm.retry_budget();
        if self.call_gate.call_timeout() < budget {
            return Err(ConfigError::InvalidValue(
                "call_gate.call_timeout_secs",
                format!(
                    "{}s is shorter than the language model retry budget of {}s",
                    self.call_gate.call_timeout_secs,
                    budget.as_secs()
                ),
            ));
        }
        if self.groups.bot_ids.is_empty() {
            return Err(ConfigError::InvalidValue(
                "groups.bot_ids",
                "at least one bot account is required".into(),
            ));
        }
        if self.admission.max_joins == 0 {
            return Err(ConfigError::InvalidValue(
                "admission.max_joins",
                "must be greater than zero".into(),
            ));
        }
        if self.admission.max_kick_count == 0 || self.admission.max_leave_count == 0 {
            return Err(ConfigError::InvalidValue(
                "admission.max_kick_count/max_leave_count",
                "must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
