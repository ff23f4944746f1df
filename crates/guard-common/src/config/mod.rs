//! Configuration structs

mod app_config;

pub use app_config::{
    AdmissionConfig, AppConfig, AppSettings, CallGateConfig, ConfigError, DatabaseConfig,
    Environment, GatewayConfig, GroupsConfig, LlmConfig, RateLimitConfig, ReconcileConfig,
    ServerConfig, WelcomeConfig,
};
