//! The dynamic value model.
//!
//! [`Value`] is what flows through entity accessors and mutators, what the
//! cache layer stores, what statements bind positionally and what result
//! rows yield. [`ValueKind`] is the declared logical type of a field and is
//! the key the type codec registry dispatches on.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::EntityRef;

/// Declared logical type of an entity field or method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// `bool`.
    Boolean,
    /// 16-bit integer.
    Short,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    Long,
    /// Single-precision float.
    Float,
    /// Double-precision float.
    Double,
    /// Fixed-point decimal.
    Decimal,
    /// Text.
    String,
    /// A URL stored as text.
    Url,
    /// Binary large object. Never cached.
    Bytes,
    /// Calendar date.
    Date,
    /// Date and time without zone.
    Timestamp,
    /// UUID.
    Uuid,
    /// Reference to another entity type, stored as its primary key.
    Entity(String),
}

impl ValueKind {
    /// The referenced entity type, if this kind is an entity reference.
    pub fn entity_type(&self) -> Option<&str> {
        match self {
            Self::Entity(name) => Some(name),
            _ => None,
        }
    }
}

impl core::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Boolean => f.write_str("boolean"),
            Self::Short => f.write_str("short"),
            Self::Integer => f.write_str("integer"),
            Self::Long => f.write_str("long"),
            Self::Float => f.write_str("float"),
            Self::Double => f.write_str("double"),
            Self::Decimal => f.write_str("decimal"),
            Self::String => f.write_str("string"),
            Self::Url => f.write_str("url"),
            Self::Bytes => f.write_str("bytes"),
            Self::Date => f.write_str("date"),
            Self::Timestamp => f.write_str("timestamp"),
            Self::Uuid => f.write_str("uuid"),
            Self::Entity(name) => write!(f, "entity<{name}>"),
        }
    }
}

/// A single dynamically-typed value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// SQL `NULL`, or "explicitly set to null" in the cache layer.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Any integer width.
    Int(i64),
    /// Any float width.
    Float(f64),
    /// Fixed-point decimal.
    Decimal(Decimal),
    /// Text (also URLs).
    Text(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time.
    Timestamp(NaiveDateTime),
    /// UUID.
    Uuid(Uuid),
    /// Reference to another entity.
    Entity(EntityRef),
}

impl Value {
    /// Whether this is [`Value::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, used in diagnostics.
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Date(_) => "date",
            Self::Timestamp(_) => "timestamp",
            Self::Uuid(_) => "uuid",
            Self::Entity(_) => "entity",
        }
    }

    /// Whether this value is an instance of the declared kind.
    ///
    /// `Null` is an instance of every kind. Entity values match only the
    /// exact entity type; polymorphic assignability is decided by the
    /// entity registry, which knows the type hierarchy.
    pub fn matches(&self, kind: &ValueKind) -> bool {
        match (self, kind) {
            (Self::Null, _)
            | (Self::Bool(_), ValueKind::Boolean)
            | (Self::Int(_), ValueKind::Short | ValueKind::Integer | ValueKind::Long)
            | (Self::Float(_), ValueKind::Float | ValueKind::Double)
            | (Self::Decimal(_), ValueKind::Decimal)
            | (Self::Text(_), ValueKind::String | ValueKind::Url)
            | (Self::Bytes(_), ValueKind::Bytes)
            | (Self::Date(_), ValueKind::Date)
            | (Self::Timestamp(_), ValueKind::Timestamp)
            | (Self::Uuid(_), ValueKind::Uuid) => true,
            (Self::Entity(entity), ValueKind::Entity(name)) => entity.entity_type() == name,
            _ => false,
        }
    }

    /// The integer payload, if any.
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The boolean payload, if any.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The text payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The entity reference, if any.
    pub const fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            Self::Entity(entity) => Some(entity),
            _ => None,
        }
    }
}

impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Text(s) => f.write_str(s),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Date(d) => write!(f, "{d}"),
            Self::Timestamp(t) => write!(f, "{t}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Entity(e) => write!(f, "{e}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<EntityRef> for Value {
    fn from(value: EntityRef) -> Self {
        Self::Entity(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn null_matches_every_kind() {
        for kind in [ValueKind::Boolean, ValueKind::Bytes, ValueKind::Entity("Person".into())] {
            assert!(Value::Null.matches(&kind));
        }
    }

    #[test]
    fn integers_match_all_integer_widths() {
        let v = Value::from(5_i32);
        assert!(v.matches(&ValueKind::Short));
        assert!(v.matches(&ValueKind::Long));
        assert!(!v.matches(&ValueKind::String));
    }

    #[test]
    fn entity_values_match_their_exact_type() {
        let v = Value::from(EntityRef::new("Company", 1));
        assert!(v.matches(&ValueKind::Entity("Company".into())));
        assert!(!v.matches(&ValueKind::Entity("Person".into())));
    }

    #[test]
    fn optional_values_become_null() {
        let none: Option<&str> = None;
        assert_eq!(Value::from(none), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }

    #[test]
    fn value_kinds_deserialize_from_yaml() {
        let yaml = serde_yml::Deserializer::from_str("- string\n- entity: Company\n");
        let kinds: Vec<ValueKind> = serde_yml::with::singleton_map_recursive::deserialize(yaml).unwrap();
        assert_eq!(kinds, vec![ValueKind::String, ValueKind::Entity("Company".into())]);
    }
}
