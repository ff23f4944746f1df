//! Subscriber installation
//!
//! `RUST_LOG` always wins over the preset level, so a deployment can turn
//! on `guard_service=debug` without a rebuild.

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

use crate::config::Environment;

/// Output settings for the process-wide subscriber
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Fallback level when `RUST_LOG` is unset
    pub level: Level,
    /// One JSON object per line instead of the human format
    pub json: bool,
    /// Emit span open/close lines (noisy; event spans are per webhook call)
    pub span_events: bool,
    /// Source locations on every line
    pub file_line: bool,
    pub thread_names: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::for_environment(Environment::Staging)
    }
}

impl TracingConfig {
    /// Pick the preset matching the deployment environment
    #[must_use]
    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Development => Self {
                level: Level::DEBUG,
                json: false,
                span_events: false,
                file_line: true,
                thread_names: true,
            },
            Environment::Staging => Self {
                level: Level::INFO,
                json: false,
                span_events: false,
                file_line: true,
                thread_names: false,
            },
            Environment::Production => Self {
                level: Level::INFO,
                json: true,
                span_events: false,
                file_line: false,
                thread_names: false,
            },
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.to_string()))
    }
}

/// Install the global subscriber with the default preset
pub fn try_init_tracing() -> Result<(), TracingError> {
    try_init_tracing_with_config(TracingConfig::default())
}

/// Install the global subscriber
///
/// Fails instead of panicking when a subscriber is already installed, so
/// tests and embedders can call it freely.
pub fn try_init_tracing_with_config(config: TracingConfig) -> Result<(), TracingError> {
    install(&config).map_err(|_| TracingError::AlreadyInitialized)
}

fn install(config: &TracingConfig) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(config.filter());
    let layer = fmt::layer()
        .with_file(config.file_line)
        .with_line_number(config.file_line)
        .with_thread_names(config.thread_names)
        .with_span_events(config.span_events());

    if config.json {
        registry
            .with(layer.json().with_current_span(true))
            .try_init()
    } else {
        registry.with(layer).try_init()
    }
}

/// Subscriber installation errors
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}
