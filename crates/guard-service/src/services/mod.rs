//! Business logic services
//!
//! Every service borrows the [`ServiceContext`] for the duration of one
//! operation; long-lived tasks hold the context behind an `Arc`.

pub mod admission;
pub mod audit;
pub mod call_gate;
pub mod classifier;
pub mod commands;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod notices;
pub mod reconciler;

// Re-export all services for convenience
pub use admission::{AdmissionService, Decision, Rule, RuleOutcome};
pub use audit::AuditService;
pub use call_gate::{CallGate, CallKey};
pub use classifier::{classify, Route};
pub use commands::{Command, CommandRegistry, Invocation, ParsedCommand};
pub use context::{ServiceContext, ServiceContextBuilder};
pub use dispatcher::EventDispatcher;
pub use error::{ServiceError, ServiceResult};
pub use notices::NoticeService;
pub use reconciler::{GroupReconcile, ReconcileReport, ReconcilerService};
