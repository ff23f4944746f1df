//! # guard-db
//!
//! Record store implementing the repository traits with SQLite via SQLx.
//!
//! ## Overview
//!
//! This crate provides SQLite implementations for the repository traits
//! defined in `guard-core`. It handles:
//!
//! - Connection pool management and schema bootstrap
//! - Database models with SQLx `FromRow` derives
//! - Model → entity mappers
//! - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use guard_db::pool::{create_pool, init_schema, DatabaseConfig};
//! use guard_db::repositories::SqliteJoinRecordRepository;
//! use guard_core::traits::JoinRecordRepository;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::in_memory()).await?;
//!     init_schema(&pool).await?;
//!     let joins = SqliteJoinRecordRepository::new(pool);
//!
//!     // Use the repository...
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, init_schema, DatabaseConfig, SqlitePool};
pub use repositories::{
    SqliteJoinRecordRepository, SqliteMembershipRepository, SqliteQuitRecordRepository,
};
