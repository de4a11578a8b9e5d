//! Blocking connection provider over an async `sqlx` pool.
//!
//! The mapping core calls its [`Connection`] synchronously. Each call here
//! drives the pool future to completion on the runtime the provider was
//! created on, moving off the async worker with `block_in_place` when the
//! caller is itself running inside that runtime.

use std::future::Future;
use std::sync::Arc;

use entwine_core::{Connection, ConnectionProvider, DbError, ProviderError};
use entwine_sql::{Dialect, PostgresDialect, Statement};
use entwine_types::{Row, Value};
use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, PgPool, Postgres};
use tokio::runtime::Handle;
use tracing::trace;

use crate::convert::{bind, decode_row, prepare};
use crate::error::{acquire_error, statement_error};

/// Run a future to completion from synchronous code.
fn block_on<F: Future>(runtime: &Handle, future: F) -> F::Output {
    if Handle::try_current().is_ok() {
        tokio::task::block_in_place(|| runtime.block_on(future))
    } else {
        runtime.block_on(future)
    }
}

/// A [`ConnectionProvider`] handing out pooled `PostgreSQL` connections.
///
/// Calls made from inside the runtime need its multi-threaded flavor.
#[derive(Debug, Clone)]
pub struct PostgresProvider {
    pool: PgPool,
    runtime: Handle,
}

impl PostgresProvider {
    /// Wrap a pool, blocking on `runtime` for every statement.
    pub const fn new(pool: PgPool, runtime: Handle) -> Self {
        Self { pool, runtime }
    }
}

impl ConnectionProvider for PostgresProvider {
    fn dialect(&self) -> Arc<dyn Dialect> {
        Arc::new(PostgresDialect)
    }

    fn connection(&self) -> Result<Box<dyn Connection>, ProviderError> {
        let conn = block_on(&self.runtime, self.pool.acquire()).map_err(|e| acquire_error(&e))?;
        trace!(idle = self.pool.num_idle(), "connection acquired");
        Ok(Box::new(PostgresConnection {
            conn: Some(conn),
            runtime: self.runtime.clone(),
        }))
    }
}

/// One checked-out connection. Returned to the pool on drop.
struct PostgresConnection {
    conn: Option<PoolConnection<Postgres>>,
    runtime: Handle,
}

impl PostgresConnection {
    fn fetch(&mut self, statement: &Statement) -> Result<Vec<Row>, DbError> {
        let (sql, params) = prepare(statement);
        let runtime = self.runtime.clone();
        let conn = self.live(&statement.sql)?;
        let rows = block_on(&runtime, async {
            params
                .into_iter()
                .fold(sqlx::query(&sql), bind)
                .fetch_all(&mut *conn)
                .await
        })
        .map_err(|e| statement_error(&statement.sql, &e))?;
        rows.iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| statement_error(&statement.sql, &e))
    }

    fn live(&mut self, sql: &str) -> Result<&mut PgConnection, DbError> {
        self.conn.as_deref_mut().ok_or_else(|| DbError::Statement {
            sql: sql.to_owned(),
            message: "connection already released".into(),
        })
    }
}

impl Connection for PostgresConnection {
    fn query(&mut self, statement: &Statement) -> Result<Vec<Row>, DbError> {
        self.fetch(statement)
    }

    fn execute(&mut self, statement: &Statement) -> Result<u64, DbError> {
        let (sql, params) = prepare(statement);
        let runtime = self.runtime.clone();
        let conn = self.live(&statement.sql)?;
        let result = block_on(&runtime, async {
            params
                .into_iter()
                .fold(sqlx::query(&sql), bind)
                .execute(&mut *conn)
                .await
        })
        .map_err(|e| statement_error(&statement.sql, &e))?;
        Ok(result.rows_affected())
    }

    fn insert_returning(&mut self, statement: &Statement, pk_field: &str) -> Result<Value, DbError> {
        self.fetch(statement)?
            .first()
            .and_then(|row| row.get(pk_field))
            .filter(|value| !value.is_null())
            .cloned()
            .ok_or_else(|| DbError::NoGeneratedKey {
                sql: statement.sql.clone(),
            })
    }
}

impl Drop for PostgresConnection {
    fn drop(&mut self) {
        // Returning a connection to the pool spawns onto the runtime.
        let _guard = self.runtime.enter();
        drop(self.conn.take());
    }
}
