//! Entity dispatch, caching and relation traversal for the entwine entity
//! mapper.
//!
//! An [`EntityManager`] owns the registered entity types, a connection
//! provider and the caches. It hands out [`Entity`] handles, one per live
//! `(type, key)` identity. Method calls on a handle are dispatched through
//! the type's classified method table: field reads are served from the
//! handle's cache layer or a single-column `SELECT`, writes are staged
//! until [`Entity::save`], and relation accessors run one of four
//! statement shapes whose results are cached across handles.
//!
//! # Modules
//!
//! - [`cache`] -- Per-handle value caches ([`CacheLayer`], [`RamCache`])
//! - [`codec`] -- Value conversion per declared type ([`TypeCodec`], [`CodecRegistry`])
//! - [`config`] -- Manager settings and the YAML mapping file ([`ManagerConfig`], [`MapperConfig`])
//! - [`definition`] -- Declarative entity definitions ([`EntityDefinition`], [`MethodShape`], [`Tag`])
//! - [`descriptor`] -- Classified entity types ([`EntityType`], [`Operation`])
//! - [`error`] -- Error types for every layer ([`EntityError`])
//! - [`listener`] -- Property change notification
//! - [`manager`] -- The [`EntityManager`]: registration, create, find, delete
//! - [`naming`] -- Table, column and discriminator naming
//! - [`provider`] -- The [`ConnectionProvider`] seam
//! - [`proxy`] -- [`Entity`] handles and method dispatch
//! - [`registry`] -- Registered types and hierarchy queries
//! - [`relations`] -- The cross-entity relation result cache
//! - [`schema`] -- `CREATE TABLE` generation from registered types
//! - [`script`] -- An in-memory provider answering from a closure

pub mod cache;
pub mod codec;
pub mod config;
pub mod definition;
pub mod descriptor;
pub mod error;
pub mod listener;
pub mod manager;
pub mod naming;
pub mod provider;
pub mod proxy;
pub mod registry;
mod relation;
pub mod relations;
pub mod schema;
pub mod script;

// Re-export primary types at crate root for convenience.
pub use cache::{Cache, CacheLayer, RamCache};
pub use codec::{CodecRegistry, TypeCodec};
pub use config::{ConfigError, ManagerConfig, MapperConfig};
pub use definition::{EntityDefinition, KeyDefinition, MethodShape, ReturnShape, Tag};
pub use descriptor::{EntityType, Operation, RelationKind};
pub use error::{CodecError, DbError, EntityError, ProviderError};
pub use listener::{PropertyChangeEvent, PropertyChangeListener};
pub use manager::{EntityManager, EntityManagerBuilder};
pub use naming::{DefaultTypeMapper, NameResolver, PolymorphicTypeMapper, SnakeCaseResolver};
pub use provider::{Connection, ConnectionProvider};
pub use proxy::{Argument, Entity, Outcome};
pub use script::{Response, ScriptedProvider};
