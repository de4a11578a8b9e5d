//! Error types for the entity layer.
//!
//! [`EntityError`] is what every entity and manager operation returns. The
//! narrower errors ([`CodecError`], [`DbError`], [`ProviderError`]) are
//! raised by their own layers and convert into it with `?`.

use entwine_types::{PrimaryKey, ValueError, ValueKind};

/// Errors raised while converting values through a type codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// No codec is registered for the declared type.
    #[error("unrecognized type: {0}")]
    UnrecognizedType(ValueKind),

    /// A value does not fit the codec it was routed to.
    #[error("{value} is not a valid {kind}")]
    Mismatch {
        /// The codec's declared kind.
        kind: ValueKind,
        /// Rendered form of the offending value.
        value: String,
    },

    /// A URL column holds something that is not a URL.
    #[error("malformed URL `{value}`")]
    MalformedUrl {
        /// The offending text.
        value: String,
    },

    /// A result row lacks the column the codec was asked to decode.
    #[error("column {column} missing from result row")]
    MissingColumn {
        /// The missing column label.
        column: String,
    },

    /// A key or type conversion failed.
    #[error(transparent)]
    Value(#[from] ValueError),
}

/// A statement failed at the driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DbError {
    /// The database rejected or failed a statement.
    #[error("statement failed: {message} [sql={sql}]")]
    Statement {
        /// The SQL text that failed.
        sql: String,
        /// Driver message.
        message: String,
    },

    /// A statement returned no generated key.
    #[error("no generated key returned [sql={sql}]")]
    NoGeneratedKey {
        /// The SQL text of the insert.
        sql: String,
    },
}

/// The connection provider could not produce a connection.
///
/// Kept distinct from [`DbError`] so callers can tell a misconfigured
/// provider from a failed query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// No connection is available.
    #[error("no connection available: {reason}")]
    NoConnection {
        /// Why the provider failed.
        reason: String,
    },
}

/// Errors surfaced by entity handles and the entity manager.
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    /// A versioned save matched no row: someone else saved first.
    #[error("Stale object [entity={entity},id={key}]")]
    StaleObject {
        /// Entity type name.
        entity: String,
        /// Primary key of the stale handle.
        key: PrimaryKey,
    },

    /// A not-null field or parameter received null.
    #[error("null passed to not-null method {entity}.{method}")]
    NullConstraint {
        /// Entity type name.
        entity: String,
        /// Method name.
        method: String,
    },

    /// An argument does not match the declared parameter type.
    #[error("{entity}.{method} expects {expected}, got {got}")]
    ArgumentType {
        /// Entity type name.
        entity: String,
        /// Method name.
        method: String,
        /// Declared kind.
        expected: ValueKind,
        /// Variant name of the supplied value.
        got: &'static str,
    },

    /// The wrong number of arguments was supplied.
    #[error("{entity}.{method} takes {expected} argument(s), got {got}")]
    Arity {
        /// Entity type name.
        entity: String,
        /// Method name.
        method: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        got: usize,
    },

    /// The method is not part of the entity type.
    #[error("cannot handle method {entity}.{method}")]
    UnknownMethod {
        /// Entity type name.
        entity: String,
        /// Method name.
        method: String,
    },

    /// The entity type has not been registered.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    /// Persisting failed before any statement ran.
    #[error("persist failed: {0}")]
    Persist(String),

    /// An entity definition or relation mapping is inconsistent.
    #[error("schema error: {0}")]
    Schema(String),

    /// The connection provider failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A statement failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// A value could not be converted.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<ValueError> for EntityError {
    fn from(error: ValueError) -> Self {
        Self::Codec(CodecError::Value(error))
    }
}
