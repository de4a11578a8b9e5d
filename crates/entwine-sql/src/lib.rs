//! Dialect-aware SQL rendering for the entwine entity mapper.
//!
//! Everything in this crate is a pure function from an abstract
//! description to SQL text. Nothing here talks to a database.
//!
//! # Modules
//!
//! - [`ddl`] -- Table, field and foreign-key descriptors plus [`Literal`].
//! - [`dialect`] -- The [`Dialect`] trait and the ANSI, `PostgreSQL` and
//!   `MySQL` renderers.
//! - [`query`] -- The abstract [`Query`] descriptor consumed by
//!   [`Dialect::render_query`].
//! - [`select`] -- A structured [`Select`] model used to build relation
//!   traversal statements (including `UNION` sub-selects) without string
//!   concatenation.
//! - [`statement`] -- [`Statement`], SQL text with positional parameters.
//! - [`parse`] -- A parser for rendered field clauses, used to check that
//!   DDL rendering round-trips.
//! - [`error`] -- [`SqlError`].

pub mod ddl;
pub mod dialect;
pub mod error;
pub mod parse;
pub mod query;
pub mod select;
pub mod statement;

pub use ddl::{DdlField, DdlForeignKey, DdlTable, Literal};
pub use dialect::{AnsiDialect, Dialect, MySqlDialect, PostgresDialect, TableResolver};
pub use error::SqlError;
pub use parse::{parse_create_table, parse_field_clause};
pub use query::{Query, QueryTarget};
pub use select::{ColumnRef, Condition, Join, Select, SelectItem, Source};
pub use statement::Statement;
