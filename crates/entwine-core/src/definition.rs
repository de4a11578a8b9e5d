//! Declarative entity definitions.
//!
//! An [`EntityDefinition`] describes an entity type the way its interface
//! would: a name, a primary key, an optional version field and a list of
//! [`MethodShape`]s. Each method carries the parameter kinds, a
//! [`ReturnShape`] and any [`Tag`]s that override the naming convention.
//! Definitions deserialize from YAML and can also be built in code:
//!
//! ```
//! use entwine_core::definition::{EntityDefinition, MethodShape, Tag};
//! use entwine_types::ValueKind;
//!
//! let person = EntityDefinition::new("Person")
//!     .method(MethodShape::getter("get_first_name", ValueKind::String))
//!     .method(MethodShape::setter("set_first_name", ValueKind::String).tag(Tag::NotNull))
//!     .method(MethodShape::many("get_pens", "Pen").tag(Tag::OneToMany { r#where: None }));
//! assert_eq!(person.methods.len(), 3);
//! ```

use entwine_types::{KeyKind, SqlType, ValueKind};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// A complete entity type definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Entity type name, e.g. `PersonSuit`.
    pub name: String,

    /// Explicit table name, bypassing the name resolver.
    #[serde(default)]
    pub table: Option<String>,

    /// Polymorphic base type this type is a variant of.
    #[serde(default)]
    pub extends: Option<String>,

    /// Whether this type is a polymorphic base. References to a
    /// polymorphic base carry a discriminator column.
    #[serde(default)]
    pub polymorphic: bool,

    /// Primary key.
    #[serde(default)]
    pub primary_key: KeyDefinition,

    /// Optimistic-concurrency version field.
    #[serde(default)]
    pub version: Option<VersionDefinition>,

    /// Fields fetched in bulk whenever this type is the target of a
    /// relation traversal. `*` selects every column.
    #[serde(default)]
    pub preload: Option<Vec<String>>,

    /// Methods.
    #[serde(default)]
    pub methods: Vec<MethodShape>,
}

impl EntityDefinition {
    /// A definition with an auto-increment integer `id` key and no methods.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            extends: None,
            polymorphic: false,
            primary_key: KeyDefinition::default(),
            version: None,
            preload: None,
            methods: Vec::new(),
        }
    }

    /// Parse a single definition from YAML, with the same enum syntax as
    /// a mapper file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the document is not a definition.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(crate::config::from_yaml(yaml)?)
    }

    /// Set the table name.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Declare this type a variant of a polymorphic base.
    #[must_use]
    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.extends = Some(base.into());
        self
    }

    /// Declare this type a polymorphic base.
    #[must_use]
    pub const fn polymorphic(mut self) -> Self {
        self.polymorphic = true;
        self
    }

    /// Set the primary key.
    #[must_use]
    pub fn primary_key(mut self, key: KeyDefinition) -> Self {
        self.primary_key = key;
        self
    }

    /// Add a version field with the given increment.
    #[must_use]
    pub fn version(mut self, field: impl Into<String>, increment: i64) -> Self {
        self.version = Some(VersionDefinition {
            field: field.into(),
            increment,
        });
        self
    }

    /// Set the preload field list.
    #[must_use]
    pub fn preload<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preload = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Add a method.
    #[must_use]
    pub fn method(mut self, method: MethodShape) -> Self {
        self.methods.push(method);
        self
    }
}

/// Primary key definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDefinition {
    /// Accessor method returning the key.
    #[serde(default = "default_key_method")]
    pub method: String,

    /// Column name. Defaults to the method name.
    #[serde(default)]
    pub field: Option<String>,

    /// Key type.
    #[serde(default)]
    pub kind: KeyKind,

    /// Whether the database generates keys.
    #[serde(default = "default_true")]
    pub auto_increment: bool,
}

impl Default for KeyDefinition {
    fn default() -> Self {
        Self {
            method: default_key_method(),
            field: None,
            kind: KeyKind::Integer,
            auto_increment: true,
        }
    }
}

impl KeyDefinition {
    /// A caller-assigned key of the given kind, read by `method`.
    pub fn assigned(method: impl Into<String>, kind: KeyKind) -> Self {
        Self {
            method: method.into(),
            field: None,
            kind,
            auto_increment: false,
        }
    }
}

fn default_key_method() -> String {
    "id".to_owned()
}

const fn default_true() -> bool {
    true
}

const fn default_increment() -> i64 {
    1
}

/// Optimistic-concurrency version field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDefinition {
    /// Column name. An accessor for this field must exist.
    pub field: String,

    /// Amount added on every save.
    #[serde(default = "default_increment")]
    pub increment: i64,
}

/// What a method returns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnShape {
    /// Nothing.
    #[default]
    Unit,
    /// A plain value of the given kind.
    Value(ValueKind),
    /// A single entity of the given type.
    Entity(String),
    /// Several entities of the given type.
    Entities(String),
}

/// Declarative overrides attached to a method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    /// Accessor for the named field.
    Accessor(String),
    /// Mutator for the named field.
    Mutator(String),
    /// One-to-one relation: the target holds a field referencing us.
    OneToOne {
        /// Extra predicate.
        #[serde(default)]
        r#where: Option<String>,
    },
    /// One-to-many relation.
    OneToMany {
        /// Extra predicate.
        #[serde(default)]
        r#where: Option<String>,
    },
    /// Many-to-many relation through a bridge type.
    ManyToMany {
        /// The bridge entity type.
        through: String,
        /// Extra predicate.
        #[serde(default)]
        r#where: Option<String>,
    },
    /// The field rejects null.
    NotNull,
    /// The field is never cached.
    Transient,
    /// The database assigns this expression on every update; never cached.
    OnUpdate(String),
    /// Column default, parsed by the field's codec.
    Default(String),
    /// The column is unique.
    Unique,
    /// The column is indexed.
    Indexed,
    /// Explicit column type.
    SqlType {
        /// Column type.
        ty: SqlType,
        /// Precision, `0` for the codec default.
        #[serde(default)]
        precision: u32,
        /// Scale.
        #[serde(default)]
        scale: u32,
    },
    /// The method is left out of generated schema.
    Ignore,
}

/// One method of an entity interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodShape {
    /// Method name.
    pub name: String,

    /// Parameter kinds.
    #[serde(default)]
    pub params: Vec<ValueKind>,

    /// Return shape.
    #[serde(default)]
    pub returns: ReturnShape,

    /// Override tags.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl MethodShape {
    /// A method with no parameters, returning nothing.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: ReturnShape::Unit,
            tags: Vec::new(),
        }
    }

    /// A no-argument method returning a value of `kind`.
    pub fn getter(name: impl Into<String>, kind: ValueKind) -> Self {
        let returns = match kind {
            ValueKind::Entity(entity_type) => ReturnShape::Entity(entity_type),
            other => ReturnShape::Value(other),
        };
        Self {
            returns,
            ..Self::new(name)
        }
    }

    /// A one-argument method returning nothing.
    pub fn setter(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            params: vec![kind],
            ..Self::new(name)
        }
    }

    /// A no-argument method returning a single entity.
    pub fn one(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            returns: ReturnShape::Entity(entity_type.into()),
            ..Self::new(name)
        }
    }

    /// A no-argument method returning several entities.
    pub fn many(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            returns: ReturnShape::Entities(entity_type.into()),
            ..Self::new(name)
        }
    }

    /// Attach a tag.
    #[must_use]
    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Whether the method carries a tag matching `predicate`.
    pub fn has_tag(&self, predicate: impl Fn(&Tag) -> bool) -> bool {
        self.tags.iter().any(predicate)
    }

    /// The kind of the value this method reads or writes: the return kind
    /// of a getter, the parameter kind of a setter.
    pub fn attribute_kind(&self) -> Option<ValueKind> {
        match (&self.returns, self.params.as_slice()) {
            (ReturnShape::Value(kind), []) | (ReturnShape::Unit, [kind]) => Some(kind.clone()),
            (ReturnShape::Entity(entity_type), []) => Some(ValueKind::Entity(entity_type.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PERSON: &str = r"
name: Person
preload: [first_name, last_name]
version:
  field: version
methods:
  - name: get_first_name
    returns: { value: string }
  - name: set_first_name
    params: [string]
    tags: [not_null]
  - name: get_url
    returns: { value: url }
    tags:
      - accessor: url
      - unique
  - name: get_pens
    returns: { entities: Pen }
    tags:
      - one_to_many: { where: deleted = 0 }
  - name: get_age
    returns: { value: integer }
    tags:
      - transient
      - sql_type: { ty: INTEGER, precision: 20 }
";

    #[test]
    fn definitions_deserialize_from_yaml() {
        let person = EntityDefinition::from_yaml(PERSON).unwrap();

        assert_eq!(person.name, "Person");
        assert_eq!(person.primary_key, KeyDefinition::default());
        assert_eq!(person.version.as_ref().unwrap().increment, 1);
        assert_eq!(person.preload.as_deref().unwrap(), ["first_name", "last_name"]);

        let setter = person.methods.get(1).unwrap();
        assert_eq!(setter.params, vec![ValueKind::String]);
        assert_eq!(setter.tags, vec![Tag::NotNull]);

        let pens = person.methods.get(3).unwrap();
        assert_eq!(pens.returns, ReturnShape::Entities("Pen".into()));
        assert_eq!(
            pens.tags,
            vec![Tag::OneToMany {
                r#where: Some("deleted = 0".into())
            }]
        );

        let age = person.methods.get(4).unwrap();
        assert!(age.has_tag(|t| matches!(t, Tag::SqlType { precision: 20, .. })));
    }

    #[test]
    fn attribute_kinds_follow_the_shape() {
        assert_eq!(
            MethodShape::getter("get_company", ValueKind::Entity("Company".into())).attribute_kind(),
            Some(ValueKind::Entity("Company".into()))
        );
        assert_eq!(
            MethodShape::setter("set_age", ValueKind::Integer).attribute_kind(),
            Some(ValueKind::Integer)
        );
        assert_eq!(MethodShape::many("get_pens", "Pen").attribute_kind(), None);
    }
}
