//! Group guard entry point
//!
//! Run with:
//! ```bash
//! cargo run -p guard-api
//! ```
//!
//! Configuration is loaded from `group-guard.toml` and `GUARD__*`
//! environment variables.

use guard_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        env = ?config.app.env,
        address = %config.server.address(),
        managed_groups = config.groups.managed.len(),
        "Configuration loaded"
    );

    if let Err(e) = guard_api::run(config).await {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}
