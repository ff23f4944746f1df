//! # guard-service
//!
//! Application layer: the call gate in front of the language model, the
//! admission decision chain, membership reconciliation, event
//! classification and the admin command registry.

pub mod services;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use services::{
    classify, AdmissionService, AuditService, CallGate, CallKey, CommandRegistry, Decision,
    EventDispatcher, GroupReconcile, NoticeService, ReconcileReport, ReconcilerService, Route,
    RuleOutcome, ServiceContext, ServiceContextBuilder, ServiceError, ServiceResult,
};
