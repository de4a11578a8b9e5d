//! The connection seam.
//!
//! The mapping core is synchronous and knows nothing about drivers. It
//! asks a [`ConnectionProvider`] for a [`Connection`] at the start of each
//! operation and drops it at the end, on success and on error alike.

use std::sync::Arc;

use entwine_sql::{Dialect, Statement};
use entwine_types::{Row, Value};

use crate::error::{DbError, ProviderError};

/// A borrowed database connection. Dropping it returns it to its provider.
pub trait Connection: Send {
    /// Run a statement returning rows.
    fn query(&mut self, statement: &Statement) -> Result<Vec<Row>, DbError>;

    /// Run a statement returning an affected-row count.
    fn execute(&mut self, statement: &Statement) -> Result<u64, DbError>;

    /// Run an insert and return the generated value of `pk_field`.
    fn insert_returning(&mut self, statement: &Statement, pk_field: &str) -> Result<Value, DbError>;
}

/// Hands out connections and names the dialect they speak.
pub trait ConnectionProvider: Send + Sync + core::fmt::Debug {
    /// The SQL dialect of every connection this provider returns.
    fn dialect(&self) -> Arc<dyn Dialect>;

    /// Borrow a connection.
    fn connection(&self) -> Result<Box<dyn Connection>, ProviderError>;
}
