//! Server setup and initialization
//!
//! Wires the record store, the collaborators and the service context,
//! starts reconciliation and serves the webhook.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use guard_common::{AppConfig, AppError};
use guard_db::{create_pool, init_schema};
use guard_gateway::{ChatCompletionsClient, OneBotClient};
use guard_service::{ReconcilerService, ServiceContext, ServiceContextBuilder};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::middleware::{apply_middleware, apply_rate_limit};
use crate::routes::{create_router, health_routes};
use crate::state::AppState;

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let webhook = apply_rate_limit(create_router(), &state.config().rate_limit);
    let router = webhook.merge(health_routes());
    apply_middleware(router).with_state(state)
}

/// Initialize all dependencies and create AppState
pub async fn create_app_state(config: AppConfig) -> Result<AppState, AppError> {
    info!(url = %config.database.url, "Opening record store...");
    let pool = create_pool(&guard_db::DatabaseConfig::from(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    init_schema(&pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("Record store ready");

    let gateway = Arc::new(OneBotClient::new(&config.gateway)?);
    let llm = Arc::new(ChatCompletionsClient::new(&config.llm)?);

    let service_context = ServiceContextBuilder::new()
        .pool(pool)
        .gateway(gateway)
        .llm(llm)
        .config(Arc::new(config))
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    Ok(AppState::new(service_context))
}

/// Run one reconciliation pass now, then keep reconciling on the
/// configured cadence (if any)
pub fn spawn_reconciliation(ctx: Arc<ServiceContext>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let report = ReconcilerService::new(&ctx).reconcile_all().await;
        info!(%report, "Startup reconciliation finished");

        let Some(period) = ctx.config().reconcile.interval() else {
            return;
        };
        info!(?period, "Periodic reconciliation enabled");

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let report = ReconcilerService::new(&ctx).reconcile_all().await;
            if !report.is_clean() {
                warn!(%report, "Reconciliation pass incomplete");
            }
        }
    })
}

/// Run the HTTP server until Ctrl-C
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    info!("Webhook listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .server
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid listen address: {e}")))?;

    let state = create_app_state(config).await?;
    let reconciliation = spawn_reconciliation(state.shared_context());

    let app = create_app(state);
    let served = run_server(app, addr).await;

    reconciliation.abort();
    served
}
