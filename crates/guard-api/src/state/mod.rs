//! Application state
//!
//! Holds the service context and the event dispatcher shared by handlers.

use std::sync::Arc;

use guard_common::AppConfig;
use guard_service::{EventDispatcher, ServiceContext};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Service context containing all dependencies
    service_context: Arc<ServiceContext>,
    /// Runs accepted events off the request path
    dispatcher: EventDispatcher,
}

impl AppState {
    /// Create a new AppState
    pub fn new(service_context: ServiceContext) -> Self {
        Self::from_shared(Arc::new(service_context))
    }

    /// Create an AppState around an already shared context
    pub fn from_shared(service_context: Arc<ServiceContext>) -> Self {
        Self {
            dispatcher: EventDispatcher::new(Arc::clone(&service_context)),
            service_context,
        }
    }

    /// Get the service context
    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    /// Shared handle to the service context, for background tasks
    pub fn shared_context(&self) -> Arc<ServiceContext> {
        Arc::clone(&self.service_context)
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        self.service_context.config()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service_context", &"ServiceContext")
            .field("dispatcher", &"EventDispatcher")
            .finish()
    }
}
