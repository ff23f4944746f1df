//! Integration test utilities for the group guard
//!
//! Starts the real webhook app on an ephemeral port over an in-memory
//! record store and in-process fakes of the gateway and language model.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
