//! Abstract table descriptors consumed by the DDL renderer.
//!
//! A [`DdlTable`] is an ordered list of [`DdlField`]s plus zero or more
//! [`DdlForeignKey`]s. Field order is preserved verbatim in the rendered
//! `CREATE TABLE`. Normally exactly one field carries the primary-key flag;
//! composite keys are not modelled at this layer.

use entwine_types::{DatabaseFunction, SqlType, Value};

/// A literal in DDL: a concrete value or a function evaluated by the
/// database (`CURRENT_TIMESTAMP` and friends).
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// A concrete value.
    Value(Value),
    /// A named database function.
    Function(DatabaseFunction),
}

impl From<Value> for Literal {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<DatabaseFunction> for Literal {
    fn from(function: DatabaseFunction) -> Self {
        Self::Function(function)
    }
}

/// A single column definition.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct DdlField {
    /// Column name.
    pub name: String,
    /// Logical column type.
    pub sql_type: SqlType,
    /// Precision, `0` when unspecified.
    pub precision: u32,
    /// Scale, `0` when unspecified.
    pub scale: u32,
    /// Whether the column is `NOT NULL`.
    pub not_null: bool,
    /// Whether the column is `UNIQUE`.
    pub unique: bool,
    /// Whether the database generates the value.
    pub auto_increment: bool,
    /// Default value, ignored when `auto_increment` is set.
    pub default: Option<Literal>,
    /// Expression assigned on every update.
    pub on_update: Option<Literal>,
    /// Whether the column is (part of) the primary key.
    pub primary_key: bool,
}

impl DdlField {
    /// Create a nullable, non-unique column of the given type.
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            precision: 0,
            scale: 0,
            not_null: false,
            unique: false,
            auto_increment: false,
            default: None,
            on_update: None,
            primary_key: false,
        }
    }

    /// Set the precision.
    #[must_use]
    pub const fn precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    /// Set the scale.
    #[must_use]
    pub const fn scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    /// Mark the column `NOT NULL`.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Mark the column `UNIQUE`.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark the column as database-generated.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Mark the column as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Set the default value.
    #[must_use]
    pub fn default_value(mut self, default: impl Into<Literal>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the `ON UPDATE` expression.
    #[must_use]
    pub fn on_update(mut self, on_update: impl Into<Literal>) -> Self {
        self.on_update = Some(on_update.into());
        self
    }
}

/// A foreign key: `field` in this table references `foreign_field` in
/// `table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DdlForeignKey {
    /// Local column.
    pub field: String,
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub foreign_field: String,
}

impl DdlForeignKey {
    /// Create a foreign key descriptor.
    pub fn new(
        field: impl Into<String>,
        table: impl Into<String>,
        foreign_field: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            table: table.into(),
            foreign_field: foreign_field.into(),
        }
    }
}

/// A table: name, ordered fields and foreign keys.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DdlTable {
    /// Table name.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<DdlField>,
    /// Foreign keys.
    pub foreign_keys: Vec<DdlForeignKey>,
}

impl DdlTable {
    /// Create an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Append a field, builder style.
    #[must_use]
    pub fn field(mut self, field: DdlField) -> Self {
        self.fields.push(field);
        self
    }

    /// Append a foreign key, builder style.
    #[must_use]
    pub fn foreign_key(mut self, key: DdlForeignKey) -> Self {
        self.foreign_keys.push(key);
        self
    }

    /// Names of the primary-key fields, in field order.
    pub fn primary_keys(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.primary_key)
            .map(|f| f.name.as_str())
    }
}
