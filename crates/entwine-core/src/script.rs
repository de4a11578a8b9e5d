//! An in-memory [`ConnectionProvider`] answering statements from a
//! closure.
//!
//! Used by the tests and doctests of this crate and useful to downstream
//! code that wants to exercise entities without a database. Every
//! statement is recorded, so tests can assert what was sent.

use std::sync::Arc;

use entwine_sql::{Dialect, Statement};
use entwine_types::{Row, Value};
use parking_lot::Mutex;

use crate::error::{DbError, ProviderError};
use crate::provider::{Connection, ConnectionProvider};

/// What a scripted statement yields.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Result rows.
    Rows(Vec<Row>),
    /// An affected-row count.
    Affected(u64),
    /// A generated key.
    Key(Value),
    /// A driver failure with this message.
    Fail(String),
}

type Handler = dyn Fn(&Statement) -> Response + Send + Sync;

/// A provider whose connections answer every statement through a handler.
#[derive(Clone)]
pub struct ScriptedProvider {
    dialect: Arc<dyn Dialect>,
    handler: Arc<Handler>,
    log: Arc<Mutex<Vec<Statement>>>,
    available: bool,
}

impl core::fmt::Debug for ScriptedProvider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScriptedProvider")
            .field("dialect", &self.dialect.name())
            .field("statements", &self.log.lock().len())
            .field("available", &self.available)
            .finish_non_exhaustive()
    }
}

impl ScriptedProvider {
    /// A provider answering through `handler`.
    pub fn new(
        dialect: impl Dialect + 'static,
        handler: impl Fn(&Statement) -> Response + Send + Sync + 'static,
    ) -> Self {
        Self {
            dialect: Arc::new(dialect),
            handler: Arc::new(handler),
            log: Arc::new(Mutex::new(Vec::new())),
            available: true,
        }
    }

    /// A provider that never hands out a connection.
    pub fn unavailable(dialect: impl Dialect + 'static) -> Self {
        Self {
            available: false,
            ..Self::new(dialect, |_| Response::Affected(0))
        }
    }

    /// Every statement run so far, in order.
    pub fn statements(&self) -> Vec<Statement> {
        self.log.lock().clone()
    }

    /// The `SELECT` statements run so far.
    pub fn selects(&self) -> Vec<Statement> {
        self.log
            .lock()
            .iter()
            .filter(|s| s.is_select())
            .cloned()
            .collect()
    }

    /// How many statements began with `prefix`.
    pub fn count_matching(&self, prefix: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|s| s.sql.starts_with(prefix))
            .count()
    }

    /// Forget the recorded statements.
    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

impl ConnectionProvider for ScriptedProvider {
    fn dialect(&self) -> Arc<dyn Dialect> {
        Arc::clone(&self.dialect)
    }

    fn connection(&self) -> Result<Box<dyn Connection>, ProviderError> {
        if !self.available {
            return Err(ProviderError::NoConnection {
                reason: "scripted provider is unavailable".to_owned(),
            });
        }
        Ok(Box::new(ScriptedConnection {
            handler: Arc::clone(&self.handler),
            log: Arc::clone(&self.log),
        }))
    }
}

struct ScriptedConnection {
    handler: Arc<Handler>,
    log: Arc<Mutex<Vec<Statement>>>,
}

impl ScriptedConnection {
    fn answer(&self, statement: &Statement) -> Result<Response, DbError> {
        self.log.lock().push(statement.clone());
        match (self.handler)(statement) {
            Response::Fail(message) => Err(DbError::Statement {
                sql: statement.sql.clone(),
                message,
            }),
            response => Ok(response),
        }
    }
}

impl Connection for ScriptedConnection {
    fn query(&mut self, statement: &Statement) -> Result<Vec<Row>, DbError> {
        Ok(match self.answer(statement)? {
            Response::Rows(rows) => rows,
            Response::Affected(_) | Response::Key(_) | Response::Fail(_) => Vec::new(),
        })
    }

    fn execute(&mut self, statement: &Statement) -> Result<u64, DbError> {
        Ok(match self.answer(statement)? {
            Response::Affected(count) => count,
            Response::Rows(rows) => u64::try_from(rows.len()).unwrap_or(u64::MAX),
            Response::Key(_) => 1,
            Response::Fail(_) => 0,
        })
    }

    fn insert_returning(&mut self, statement: &Statement, pk_field: &str) -> Result<Value, DbError> {
        let key = match self.answer(statement)? {
            Response::Key(value) => Some(value),
            Response::Rows(rows) => rows.first().and_then(|row| row.get(pk_field)).cloned(),
            Response::Affected(_) | Response::Fail(_) => None,
        };
        key.ok_or_else(|| DbError::NoGeneratedKey {
            sql: statement.sql.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use entwine_sql::AnsiDialect;

    use super::*;

    #[test]
    fn statements_are_recorded_in_order() {
        let provider = ScriptedProvider::new(AnsiDialect, |statement| {
            if statement.is_select() {
                Response::Rows(vec![Row::new().with("id", 1_i64)])
            } else {
                Response::Affected(2)
            }
        });
        let mut connection = provider.connection().unwrap();

        let rows = connection.query(&Statement::new("SELECT id FROM pen")).unwrap();
        assert_eq!(rows.len(), 1);
        let affected = connection.execute(&Statement::new("UPDATE pen SET deleted = 1")).unwrap();
        assert_eq!(affected, 2);

        assert_eq!(provider.statements().len(), 2);
        assert_eq!(provider.selects().len(), 1);
        assert_eq!(provider.count_matching("UPDATE"), 1);
        provider.clear();
        assert!(provider.statements().is_empty());
    }

    #[test]
    fn failures_carry_the_sql() {
        let provider = ScriptedProvider::new(AnsiDialect, |_| Response::Fail("boom".into()));
        let mut connection = provider.connection().unwrap();
        let error = connection.execute(&Statement::new("DELETE FROM pen")).unwrap_err();
        assert_eq!(
            error,
            DbError::Statement {
                sql: "DELETE FROM pen".into(),
                message: "boom".into(),
            }
        );
    }

    #[test]
    fn inserts_need_a_generated_key() {
        let provider = ScriptedProvider::new(AnsiDialect, |_| Response::Affected(1));
        let mut connection = provider.connection().unwrap();
        assert!(matches!(
            connection.insert_returning(&Statement::new("INSERT INTO pen (id) VALUES (DEFAULT)"), "id"),
            Err(DbError::NoGeneratedKey { .. })
        ));
    }

    #[test]
    fn unavailable_providers_refuse_connections() {
        let provider = ScriptedProvider::unavailable(AnsiDialect);
        assert!(matches!(
            provider.connection(),
            Err(ProviderError::NoConnection { .. })
        ));
    }
}
