//! Error types for SQL rendering and parsing.

/// Errors raised by the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SqlError {
    /// A field clause could not be parsed.
    #[error("cannot parse field clause `{clause}`: {reason}")]
    UnparseableField {
        /// The offending clause.
        clause: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A type name is not known to the dialect.
    #[error("dialect {dialect} has no type named {name}")]
    UnknownType {
        /// Dialect name.
        dialect: &'static str,
        /// The unknown type name.
        name: String,
    },

    /// A statement was not a `CREATE TABLE` statement.
    #[error("not a CREATE TABLE statement")]
    NotCreateTable,
}
