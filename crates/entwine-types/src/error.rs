//! Error types for value and key conversions.

use crate::ids::KeyKind;

/// Errors raised while converting between values, keys and type names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// A value cannot be used as a primary key of the requested kind.
    #[error("cannot convert {value} into a {kind} primary key")]
    KeyConversion {
        /// Rendered form of the offending value.
        value: String,
        /// The key kind that was requested.
        kind: KeyKind,
    },

    /// A database function name is not recognised.
    #[error("unknown database function: {0}")]
    UnknownFunction(String),

    /// A SQL type name is not recognised.
    #[error("unknown SQL type: {0}")]
    UnknownSqlType(String),
}
