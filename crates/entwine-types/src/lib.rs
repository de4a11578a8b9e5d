//! Shared type definitions for the entwine entity mapper.
//!
//! This crate is the leaf of the workspace. It defines the dynamic value
//! model that flows between entity handles, the type codec registry and
//! the connection layer, along with entity identity and the logical SQL
//! type table used by the dialect renderers.
//!
//! # Modules
//!
//! - [`value`] -- [`Value`] (a decoded column or argument) and [`ValueKind`]
//!   (the declared logical type of a field).
//! - [`ids`] -- [`PrimaryKey`], [`KeyKind`] and [`EntityRef`] (entity identity).
//! - [`sql_type`] -- [`SqlType`] and [`DatabaseFunction`].
//! - [`row`] -- [`Row`], a single result row keyed by column label.
//! - [`error`] -- [`ValueError`].

pub mod error;
pub mod ids;
pub mod row;
pub mod sql_type;
pub mod value;

pub use error::ValueError;
pub use ids::{EntityRef, KeyKind, PrimaryKey};
pub use row::Row;
pub use sql_type::{DatabaseFunction, SqlType};
pub use value::{Value, ValueKind};
