//! `PostgreSQL` connection provider for the entwine entity mapper.
//!
//! The mapping core is synchronous and driver-agnostic. This crate plugs a
//! `sqlx` pool into it: [`PostgresPool`] owns the async pool and applies
//! generated DDL, and [`PostgresProvider`] hands blocking connections to an
//! [`entwine_core::EntityManager`].
//!
//! ```text
//! EntityManager --(sync)--> PostgresProvider --(block_on)--> PgPool
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`provider`] -- The blocking [`entwine_core::ConnectionProvider`]
//! - [`error`] -- Pool setup errors

mod convert;
pub mod error;
pub mod postgres;
pub mod provider;

// Re-export primary types for convenience.
pub use error::PostgresError;
pub use postgres::{PostgresConfig, PostgresPool};
pub use provider::PostgresProvider;
