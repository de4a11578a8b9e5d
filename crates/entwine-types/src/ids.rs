//! Entity identity.
//!
//! An entity is addressed by its type name and primary key. Equality and
//! hashing of [`EntityRef`] are defined over exactly that pair, which is
//! what the dispatch layer relies on when it interns handles and keys
//! relation caches.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValueError;
use crate::value::{Value, ValueKind};

/// The declared kind of a primary key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// Signed integer key (usually auto-incremented).
    #[default]
    Integer,
    /// Text key.
    String,
    /// UUID key.
    Uuid,
}

impl KeyKind {
    /// The logical value kind used to encode and decode keys of this kind.
    pub const fn value_kind(self) -> ValueKind {
        match self {
            Self::Integer => ValueKind::Integer,
            Self::String => ValueKind::String,
            Self::Uuid => ValueKind::Uuid,
        }
    }
}

impl core::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Integer => f.write_str("integer"),
            Self::String => f.write_str("string"),
            Self::Uuid => f.write_str("uuid"),
        }
    }
}

/// A primary key value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    /// Integer key.
    Int(i64),
    /// Text key.
    Text(String),
    /// UUID key.
    Uuid(Uuid),
}

impl PrimaryKey {
    /// The kind of this key.
    pub const fn kind(&self) -> KeyKind {
        match self {
            Self::Int(_) => KeyKind::Integer,
            Self::Text(_) => KeyKind::String,
            Self::Uuid(_) => KeyKind::Uuid,
        }
    }

    /// Convert a decoded column value into a key of the given kind.
    ///
    /// Integer keys accept integral text; text keys accept any scalar
    /// rendered through [`Display`](core::fmt::Display).
    pub fn from_value(value: &Value, kind: KeyKind) -> Result<Self, ValueError> {
        let fail = || ValueError::KeyConversion {
            value: value.to_string(),
            kind,
        };

        match (kind, value) {
            (KeyKind::Integer, Value::Int(i)) => Ok(Self::Int(*i)),
            (KeyKind::Integer, Value::Text(s)) => s.trim().parse().map(Self::Int).map_err(|_e| fail()),
            (KeyKind::Integer, Value::Decimal(d)) => {
                rust_decimal::prelude::ToPrimitive::to_i64(d).map(Self::Int).ok_or_else(fail)
            }
            (KeyKind::Uuid, Value::Uuid(u)) => Ok(Self::Uuid(*u)),
            (KeyKind::Uuid, Value::Text(s)) => Uuid::parse_str(s).map(Self::Uuid).map_err(|_e| fail()),
            (KeyKind::String, Value::Text(s)) => Ok(Self::Text(s.clone())),
            (KeyKind::String, Value::Int(_) | Value::Uuid(_)) => Ok(Self::Text(value.to_string())),
            (_, Value::Entity(entity)) if entity.key().kind() == kind => Ok(entity.key().clone()),
            _ => Err(fail()),
        }
    }
}

impl core::fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
            Self::Uuid(u) => write!(f, "{u}"),
        }
    }
}

impl From<i64> for PrimaryKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PrimaryKey {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for PrimaryKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for PrimaryKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Uuid> for PrimaryKey {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<PrimaryKey> for Value {
    fn from(key: PrimaryKey) -> Self {
        match key {
            PrimaryKey::Int(i) => Self::Int(i),
            PrimaryKey::Text(s) => Self::Text(s),
            PrimaryKey::Uuid(u) => Self::Uuid(u),
        }
    }
}

/// Identity of a single entity: its type name and primary key.
///
/// The type name is shared (`Arc<str>`) because every handle, cache key
/// and relation result carries one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    entity_type: Arc<str>,
    key: PrimaryKey,
}

impl EntityRef {
    /// Create an identity from a type name and key.
    pub fn new(entity_type: impl Into<Arc<str>>, key: impl Into<PrimaryKey>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }

    /// The entity type name.
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// The shared entity type name.
    pub const fn entity_type_arc(&self) -> &Arc<str> {
        &self.entity_type
    }

    /// The primary key.
    pub const fn key(&self) -> &PrimaryKey {
        &self.key
    }
}

impl core::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}#{}", self.entity_type, self.key)
    }
}
