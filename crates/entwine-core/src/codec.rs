//! The type codec registry.
//!
//! A [`TypeCodec`] knows how one logical [`ValueKind`] is stored: its
//! column type, how to pull it out of a result row, how to bind it to a
//! statement, whether decoded values may be cached, and how to read a
//! textual default. [`CodecRegistry`] maps kinds to codecs; entity-valued
//! kinds are served by an [`EntityCodec`] built from the referenced type's
//! key kind.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use entwine_sql::Statement;
use entwine_types::{EntityRef, KeyKind, PrimaryKey, Row, SqlType, Value, ValueKind};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use uuid::Uuid;

use crate::error::CodecError;

/// Conversion routines for one logical type.
pub trait TypeCodec: Send + Sync + core::fmt::Debug {
    /// The kind this codec handles.
    fn kind(&self) -> ValueKind;

    /// Column type used when generating schema.
    fn sql_type(&self) -> SqlType;

    /// Column precision used when generating schema, `0` for none.
    fn default_precision(&self) -> u32 {
        0
    }

    /// Pull the value of `column` out of `row`.
    fn decode(&self, row: &Row, column: &str) -> Result<Value, CodecError>;

    /// Bind `value` as the statement's next positional parameter.
    fn encode(&self, statement: &mut Statement, value: &Value) -> Result<(), CodecError>;

    /// Whether decoded values may be kept in an entity's cache layer.
    fn should_cache(&self) -> bool {
        true
    }

    /// Parse a textual default into a value of this kind.
    fn parse_default(&self, text: &str) -> Result<Value, CodecError>;
}

/// Codec for the built-in scalar kinds.
#[derive(Debug, Clone)]
pub struct ScalarCodec {
    kind: ValueKind,
}

impl ScalarCodec {
    /// Codec for a scalar kind. Entity kinds belong to [`EntityCodec`].
    pub const fn new(kind: ValueKind) -> Self {
        Self { kind }
    }

    fn mismatch(&self, value: &Value) -> CodecError {
        CodecError::Mismatch {
            kind: self.kind.clone(),
            value: value.to_string(),
        }
    }

    /// Coerce a driver value into this codec's canonical representation.
    fn coerce(&self, value: Value) -> Result<Value, CodecError> {
        let coerced = match (&self.kind, value) {
            (_, Value::Null) => Value::Null,
            (ValueKind::Boolean, Value::Bool(b)) => Value::Bool(b),
            (ValueKind::Boolean, Value::Int(i)) => Value::Bool(i != 0),
            (ValueKind::Short | ValueKind::Integer | ValueKind::Long, Value::Int(i)) => Value::Int(i),
            (ValueKind::Short | ValueKind::Integer | ValueKind::Long, Value::Bool(b)) => {
                Value::Int(i64::from(b))
            }
            (ValueKind::Float | ValueKind::Double, Value::Float(x)) => Value::Float(x),
            #[allow(clippy::cast_precision_loss)]
            (ValueKind::Float | ValueKind::Double, Value::Int(i)) => Value::Float(i as f64),
            (ValueKind::Decimal, Value::Decimal(d)) => Value::Decimal(d),
            (ValueKind::Decimal, Value::Int(i)) => Value::Decimal(Decimal::from(i)),
            (ValueKind::Decimal, Value::Float(x)) => {
                Value::Decimal(Decimal::from_f64(x).ok_or_else(|| self.mismatch(&Value::Float(x)))?)
            }
            (ValueKind::String, Value::Text(s)) => Value::Text(s),
            (ValueKind::Url, Value::Text(s)) => {
                validate_url(&s)?;
                Value::Text(s)
            }
            (ValueKind::Bytes, Value::Bytes(b)) => Value::Bytes(b),
            (ValueKind::Date, Value::Date(d)) => Value::Date(d),
            (ValueKind::Date, Value::Timestamp(ts)) => Value::Date(ts.date()),
            (ValueKind::Timestamp, Value::Timestamp(ts)) => Value::Timestamp(ts),
            (ValueKind::Timestamp, Value::Date(d)) => Value::Timestamp(d.and_time(NaiveTime::MIN)),
            (ValueKind::Uuid, Value::Uuid(u)) => Value::Uuid(u),
            (ValueKind::Uuid, Value::Text(s)) => {
                Value::Uuid(Uuid::parse_str(&s).map_err(|_e| self.mismatch(&Value::Text(s.clone())))?)
            }
            (_, other) => return Err(self.mismatch(&other)),
        };
        Ok(coerced)
    }
}

impl TypeCodec for ScalarCodec {
    fn kind(&self) -> ValueKind {
        self.kind.clone()
    }

    fn sql_type(&self) -> SqlType {
        match self.kind {
            ValueKind::Boolean => SqlType::Boolean,
            ValueKind::Short => SqlType::SmallInt,
            ValueKind::Integer => SqlType::Integer,
            ValueKind::Long => SqlType::BigInt,
            ValueKind::Float => SqlType::Real,
            ValueKind::Double => SqlType::Double,
            ValueKind::Decimal => SqlType::Decimal,
            ValueKind::String | ValueKind::Url | ValueKind::Uuid | ValueKind::Entity(_) => SqlType::VarChar,
            ValueKind::Bytes => SqlType::Blob,
            ValueKind::Date => SqlType::Date,
            ValueKind::Timestamp => SqlType::Timestamp,
        }
    }

    fn default_precision(&self) -> u32 {
        match self.kind {
            ValueKind::String | ValueKind::Url => 255,
            ValueKind::Uuid => 36,
            _ => 0,
        }
    }

    fn decode(&self, row: &Row, column: &str) -> Result<Value, CodecError> {
        let value = row.get(column).ok_or_else(|| CodecError::MissingColumn {
            column: column.to_owned(),
        })?;
        self.coerce(value.clone())
    }

    fn encode(&self, statement: &mut Statement, value: &Value) -> Result<(), CodecError> {
        statement.push(self.coerce(value.clone())?);
        Ok(())
    }

    fn should_cache(&self) -> bool {
        self.kind != ValueKind::Bytes
    }

    fn parse_default(&self, text: &str) -> Result<Value, CodecError> {
        let text = text.trim();
        let bad = || CodecError::Mismatch {
            kind: self.kind.clone(),
            value: text.to_owned(),
        };

        match self.kind {
            ValueKind::Boolean => text.parse().map(Value::Bool).map_err(|_e| bad()),
            ValueKind::Short | ValueKind::Integer | ValueKind::Long => {
                text.parse().map(Value::Int).map_err(|_e| bad())
            }
            ValueKind::Float | ValueKind::Double => text.parse().map(Value::Float).map_err(|_e| bad()),
            ValueKind::Decimal => text.parse().map(Value::Decimal).map_err(|_e| bad()),
            ValueKind::String => Ok(Value::Text(text.to_owned())),
            ValueKind::Url => {
                validate_url(text)?;
                Ok(Value::Text(text.to_owned()))
            }
            ValueKind::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|_e| bad()),
            ValueKind::Timestamp => NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .map(Value::Timestamp)
                .map_err(|_e| bad()),
            ValueKind::Uuid => Uuid::parse_str(text).map(Value::Uuid).map_err(|_e| bad()),
            ValueKind::Bytes | ValueKind::Entity(_) => Err(bad()),
        }
    }
}

/// A URL must carry a scheme followed by `:` and a non-empty remainder.
fn validate_url(text: &str) -> Result<(), CodecError> {
    let malformed = || CodecError::MalformedUrl {
        value: text.to_owned(),
    };
    let (scheme, rest) = text.split_once(':').ok_or_else(malformed)?;
    let scheme_ok = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if scheme_ok && !rest.is_empty() {
        Ok(())
    } else {
        Err(malformed())
    }
}

/// Codec for a reference to another entity, stored as its primary key.
#[derive(Debug, Clone)]
pub struct EntityCodec {
    entity_type: String,
    key_kind: KeyKind,
}

impl EntityCodec {
    /// Codec for references to `entity_type`, keyed by `key_kind`.
    pub fn new(entity_type: impl Into<String>, key_kind: KeyKind) -> Self {
        Self {
            entity_type: entity_type.into(),
            key_kind,
        }
    }
}

impl TypeCodec for EntityCodec {
    fn kind(&self) -> ValueKind {
        ValueKind::Entity(self.entity_type.clone())
    }

    fn sql_type(&self) -> SqlType {
        match self.key_kind {
            KeyKind::Integer => SqlType::Integer,
            KeyKind::String | KeyKind::Uuid => SqlType::VarChar,
        }
    }

    fn default_precision(&self) -> u32 {
        match self.key_kind {
            KeyKind::Integer => 0,
            KeyKind::String => 255,
            KeyKind::Uuid => 36,
        }
    }

    fn decode(&self, row: &Row, column: &str) -> Result<Value, CodecError> {
        let value = row.get(column).ok_or_else(|| CodecError::MissingColumn {
            column: column.to_owned(),
        })?;
        if value.is_null() {
            return Ok(Value::Null);
        }
        let key = PrimaryKey::from_value(value, self.key_kind)?;
        Ok(Value::Entity(EntityRef::new(self.entity_type.as_str(), key)))
    }

    fn encode(&self, statement: &mut Statement, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null => statement.push(Value::Null),
            Value::Entity(entity) => statement.push(Value::from(entity.key().clone())),
            other => statement.push(Value::from(PrimaryKey::from_value(other, self.key_kind)?)),
        }
        Ok(())
    }

    fn parse_default(&self, text: &str) -> Result<Value, CodecError> {
        let key = PrimaryKey::from_value(&Value::Text(text.trim().to_owned()), self.key_kind)?;
        Ok(Value::Entity(EntityRef::new(self.entity_type.as_str(), key)))
    }
}

/// Maps value kinds to codecs.
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    codecs: HashMap<ValueKind, Arc<dyn TypeCodec>>,
    entity_keys: HashMap<String, KeyKind>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecRegistry {
    /// A registry holding a codec for every built-in scalar kind.
    pub fn new() -> Self {
        let scalars = [
            ValueKind::Boolean,
            ValueKind::Short,
            ValueKind::Integer,
            ValueKind::Long,
            ValueKind::Float,
            ValueKind::Double,
            ValueKind::Decimal,
            ValueKind::String,
            ValueKind::Url,
            ValueKind::Bytes,
            ValueKind::Date,
            ValueKind::Timestamp,
            ValueKind::Uuid,
        ];

        let codecs = scalars
            .into_iter()
            .map(|kind| {
                let codec: Arc<dyn TypeCodec> = Arc::new(ScalarCodec::new(kind.clone()));
                (kind, codec)
            })
            .collect();

        Self {
            codecs,
            entity_keys: HashMap::new(),
        }
    }

    /// An empty registry. Every lookup fails until codecs are registered.
    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
            entity_keys: HashMap::new(),
        }
    }

    /// Register (or replace) the codec for its kind.
    pub fn register(&mut self, codec: Arc<dyn TypeCodec>) {
        self.codecs.insert(codec.kind(), codec);
    }

    /// Make references to `entity_type` resolvable.
    pub fn register_entity(&mut self, entity_type: impl Into<String>, key_kind: KeyKind) {
        self.entity_keys.insert(entity_type.into(), key_kind);
    }

    /// The key kind of a registered entity type.
    pub fn entity_key_kind(&self, entity_type: &str) -> Option<KeyKind> {
        self.entity_keys.get(entity_type).copied()
    }

    /// The codec for a kind.
    pub fn codec_for(&self, kind: &ValueKind) -> Result<Arc<dyn TypeCodec>, CodecError> {
        if let Some(codec) = self.codecs.get(kind) {
            return Ok(Arc::clone(codec));
        }
        match kind {
            ValueKind::Entity(entity_type) => self
                .entity_keys
                .get(entity_type)
                .map(|key_kind| Arc::new(EntityCodec::new(entity_type.as_str(), *key_kind)) as Arc<dyn TypeCodec>)
                .ok_or_else(|| CodecError::UnrecognizedType(kind.clone())),
            _ => Err(CodecError::UnrecognizedType(kind.clone())),
        }
    }

    /// The codec for an entity type's primary key.
    pub fn key_codec(&self, key_kind: KeyKind) -> Result<Arc<dyn TypeCodec>, CodecError> {
        self.codec_for(&key_kind.value_kind())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn booleans_accept_integer_columns() {
        let codec = ScalarCodec::new(ValueKind::Boolean);
        let row = Row::new().with("active", Value::Int(1));
        assert_eq!(codec.decode(&row, "active").unwrap(), Value::Bool(true));
    }

    #[test]
    fn bytes_are_never_cached() {
        let registry = CodecRegistry::new();
        assert!(!registry.codec_for(&ValueKind::Bytes).unwrap().should_cache());
        assert!(registry.codec_for(&ValueKind::String).unwrap().should_cache());
    }

    #[test]
    fn urls_are_validated() {
        let codec = ScalarCodec::new(ValueKind::Url);
        let good = Row::new().with("url", "http://www.google.com");
        let bad = Row::new().with("url", "not a url");
        assert!(codec.decode(&good, "url").is_ok());
        assert!(matches!(codec.decode(&bad, "url"), Err(CodecError::MalformedUrl { .. })));
    }

    #[test]
    fn missing_columns_are_reported() {
        let codec = ScalarCodec::new(ValueKind::String);
        assert_eq!(
            codec.decode(&Row::new(), "name"),
            Err(CodecError::MissingColumn { column: "name".into() })
        );
    }

    #[test]
    fn entity_codecs_require_registration() {
        let mut registry = CodecRegistry::new();
        let company = ValueKind::Entity("Company".into());
        assert_eq!(
            registry.codec_for(&company).unwrap_err(),
            CodecError::UnrecognizedType(company.clone())
        );

        registry.register_entity("Company", KeyKind::Integer);
        let codec = registry.codec_for(&company).unwrap();
        let row = Row::new().with("company_id", Value::Int(3));
        assert_eq!(
            codec.decode(&row, "company_id").unwrap(),
            Value::Entity(EntityRef::new("Company", 3))
        );

        let mut statement = Statement::default();
        codec
            .encode(&mut statement, &Value::Entity(EntityRef::new("Company", 3)))
            .unwrap();
        assert_eq!(statement.params, vec![Value::Int(3)]);
    }

    #[test]
    fn defaults_parse_per_kind() {
        let registry = CodecRegistry::new();
        let int = registry.codec_for(&ValueKind::Integer).unwrap();
        assert_eq!(int.parse_default("42").unwrap(), Value::Int(42));
        assert!(int.parse_default("forty-two").is_err());

        let url = registry.codec_for(&ValueKind::Url).unwrap();
        assert_eq!(
            url.parse_default("http://www.google.com").unwrap(),
            Value::Text("http://www.google.com".into())
        );
    }
}
