//! Entity type descriptors.
//!
//! Registering an [`EntityDefinition`] classifies every method once and
//! produces an [`EntityType`]: a method table mapping names to
//! [`Operation`]s and an ordered list of [`FieldDescriptor`]s whose
//! positions are the stable [`FieldIndex`]es used by the per-field lock
//! arena of each handle.
//!
//! Classification precedence, per method:
//!
//! 1. intrinsics (key accessor, `save`, listeners, `equals`, `hash_code`,
//!    `to_string`, `entity_type`)
//! 2. explicit `accessor`/`mutator` tags
//! 3. relation tags on an entity or entity-list return
//! 4. the naming convention: `set_x(v)` mutates, any other no-argument
//!    method returning a value reads
//!
//! Methods matching none of these are left out of the table; calling one
//! fails with [`EntityError::UnknownMethod`].

use std::collections::HashMap;

use entwine_types::{KeyKind, SqlType, ValueKind};

use crate::definition::{EntityDefinition, MethodShape, ReturnShape, Tag};
use crate::error::EntityError;
use crate::naming::NameResolver;

/// Position of a field within its entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldIndex(usize);

impl FieldIndex {
    /// The position.
    pub const fn get(self) -> usize {
        self.0
    }
}

/// Explicit column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnType {
    /// Column type.
    pub sql_type: SqlType,
    /// Precision, `0` for the codec default.
    pub precision: u32,
    /// Scale.
    pub scale: u32,
}

/// A persisted field, merged from its accessor and mutator.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct FieldDescriptor {
    /// Column name.
    pub name: String,
    /// Declared kind.
    pub kind: ValueKind,
    /// Discriminator column, used when `kind` references a polymorphic
    /// base.
    pub poly_column: Option<String>,
    /// Accessor method, if any.
    pub accessor: Option<String>,
    /// Mutator method, if any.
    pub mutator: Option<String>,
    /// Rejects null.
    pub not_null: bool,
    /// Never cached.
    pub transient: bool,
    /// Expression the database assigns on update. Such fields are never
    /// cached.
    pub on_update: Option<String>,
    /// Column default text.
    pub default: Option<String>,
    /// Unique column.
    pub unique: bool,
    /// Indexed column.
    pub indexed: bool,
    /// Explicit column type.
    pub column_type: Option<ColumnType>,
    /// Left out of generated schema.
    pub ignored: bool,
}

impl FieldDescriptor {
    const fn new(name: String, kind: ValueKind) -> Self {
        Self {
            name,
            kind,
            poly_column: None,
            accessor: None,
            mutator: None,
            not_null: false,
            transient: false,
            on_update: None,
            default: None,
            unique: false,
            indexed: false,
            column_type: None,
            ignored: false,
        }
    }

    fn merge_tags(&mut self, tags: &[Tag]) {
        for tag in tags {
            match tag {
                Tag::NotNull => self.not_null = true,
                Tag::Transient => self.transient = true,
                Tag::OnUpdate(expr) => self.on_update = Some(expr.clone()),
                Tag::Default(text) => self.default = Some(text.clone()),
                Tag::Unique => self.unique = true,
                Tag::Indexed => self.indexed = true,
                Tag::SqlType { ty, precision, scale } => {
                    self.column_type = Some(ColumnType {
                        sql_type: *ty,
                        precision: *precision,
                        scale: *scale,
                    });
                }
                Tag::Ignore => self.ignored = true,
                Tag::Accessor(_)
                | Tag::Mutator(_)
                | Tag::OneToOne { .. }
                | Tag::OneToMany { .. }
                | Tag::ManyToMany { .. } => {}
            }
        }
    }
}

/// Shape of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// A single target whose mapping field references us.
    OneToOne,
    /// Every target whose mapping field references us.
    OneToMany,
    /// Targets reached through rows of a bridge type.
    ManyToMany {
        /// The bridge type.
        through: String,
    },
}

/// A relation accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    /// Relation shape.
    pub kind: RelationKind,
    /// Target entity type.
    pub target: String,
    /// Extra raw predicate.
    pub predicate: Option<String>,
}

/// What a method does when called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Return the primary key.
    PrimaryKey,
    /// Persist dirty fields.
    Save,
    /// Return the entity type name.
    EntityType,
    /// Register a property change listener.
    AddListener,
    /// Remove a property change listener.
    RemoveListener,
    /// Identity comparison.
    Equals,
    /// Identity hash.
    HashCode,
    /// Human-readable description.
    Describe,
    /// Read a field.
    Get(FieldIndex),
    /// Write a field.
    Set(FieldIndex),
    /// Traverse a relation.
    Relation(RelationSpec),
}

/// A classified method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodEntry {
    /// The declared shape.
    pub shape: MethodShape,
    /// What calling it does.
    pub operation: Operation,
}

/// Primary key of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    /// Accessor method.
    pub method: String,
    /// Column name.
    pub field: String,
    /// Key kind.
    pub kind: KeyKind,
    /// Database-generated.
    pub auto_increment: bool,
}

/// Version field of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpec {
    /// Column name.
    pub field: String,
    /// Amount added on every save.
    pub increment: i64,
}

/// A registered entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityType {
    /// Type name.
    pub name: String,
    /// Table name.
    pub table: String,
    /// Polymorphic base, if this type is a variant.
    pub base: Option<String>,
    /// Whether this type is a polymorphic base.
    pub polymorphic: bool,
    /// Primary key.
    pub key: KeySpec,
    /// Version field.
    pub version: Option<VersionSpec>,
    /// Preload field list.
    pub preload: Option<Vec<String>>,
    fields: Vec<FieldDescriptor>,
    methods: HashMap<String, MethodEntry>,
}

const INTRINSICS: [(&str, Operation); 7] = [
    ("save", Operation::Save),
    ("entity_type", Operation::EntityType),
    ("add_property_change_listener", Operation::AddListener),
    ("remove_property_change_listener", Operation::RemoveListener),
    ("equals", Operation::Equals),
    ("hash_code", Operation::HashCode),
    ("to_string", Operation::Describe),
];

impl EntityType {
    /// Classify a definition.
    pub fn build(definition: &EntityDefinition, resolver: &dyn NameResolver) -> Result<Self, EntityError> {
        let key_method = &definition.primary_key.method;
        let key_field = definition.primary_key.field.clone().unwrap_or_else(|| {
            resolver.field_name(&MethodShape::getter(
                key_method.as_str(),
                definition.primary_key.kind.value_kind(),
            ))
        });

        let mut entity = Self {
            name: definition.name.clone(),
            table: definition
                .table
                .clone()
                .unwrap_or_else(|| resolver.table_name(&definition.name)),
            base: definition.extends.clone(),
            polymorphic: definition.polymorphic,
            key: KeySpec {
                method: key_method.clone(),
                field: key_field,
                kind: definition.primary_key.kind,
                auto_increment: definition.primary_key.auto_increment,
            },
            version: definition.version.as_ref().map(|v| VersionSpec {
                field: v.field.clone(),
                increment: v.increment,
            }),
            preload: definition.preload.clone(),
            fields: Vec::new(),
            methods: HashMap::new(),
        };

        entity.insert_method(MethodShape::new(key_method.as_str()), Operation::PrimaryKey);
        for (name, operation) in INTRINSICS {
            entity.insert_method(MethodShape::new(name), operation);
        }

        for method in &definition.methods {
            if let Some(operation) = entity.classify(method, resolver)? {
                entity.insert_method(method.clone(), operation);
            }
        }

        Ok(entity)
    }

    fn insert_method(&mut self, shape: MethodShape, operation: Operation) {
        self.methods
            .insert(shape.name.clone(), MethodEntry { shape, operation });
    }

    fn is_intrinsic(&self, name: &str) -> bool {
        name == self.key.method || INTRINSICS.iter().any(|(intrinsic, _)| *intrinsic == name)
    }

    fn classify(
        &mut self,
        method: &MethodShape,
        resolver: &dyn NameResolver,
    ) -> Result<Option<Operation>, EntityError> {
        if self.is_intrinsic(&method.name) {
            return Ok(None);
        }

        for tag in &method.tags {
            match tag {
                Tag::Mutator(name) => {
                    let index = self.field_for(method, name.clone(), resolver)?;
                    return Ok(Some(Operation::Set(index)));
                }
                Tag::Accessor(name) => {
                    let index = self.field_for(method, name.clone(), resolver)?;
                    return Ok(Some(Operation::Get(index)));
                }
                _ => {}
            }
        }

        for tag in &method.tags {
            let relation = match (tag, &method.returns) {
                (Tag::OneToOne { r#where }, ReturnShape::Entity(target)) => {
                    Some((RelationKind::OneToOne, target, r#where))
                }
                (Tag::OneToMany { r#where }, ReturnShape::Entities(target)) => {
                    Some((RelationKind::OneToMany, target, r#where))
                }
                (Tag::ManyToMany { through, r#where }, ReturnShape::Entities(target)) => Some((
                    RelationKind::ManyToMany {
                        through: through.clone(),
                    },
                    target,
                    r#where,
                )),
                _ => None,
            };
            if let Some((kind, target, predicate)) = relation {
                return Ok(Some(Operation::Relation(RelationSpec {
                    kind,
                    target: target.clone(),
                    predicate: predicate.clone().filter(|p| !p.trim().is_empty()),
                })));
            }
        }

        if method.attribute_kind().is_none() {
            return Ok(None);
        }
        let reads = method.params.is_empty();
        if !reads && !method.name.starts_with("set_") {
            return Ok(None);
        }
        let index = self.field_for(method, resolver.field_name(method), resolver)?;
        Ok(Some(if reads {
            Operation::Get(index)
        } else {
            Operation::Set(index)
        }))
    }

    /// Find or create the field a method reads or writes, merging the
    /// method's tags into it.
    fn field_for(
        &mut self,
        method: &MethodShape,
        name: String,
        resolver: &dyn NameResolver,
    ) -> Result<FieldIndex, EntityError> {
        let kind = method.attribute_kind().ok_or_else(|| {
            EntityError::Schema(format!(
                "{}.{} neither returns a value nor takes one",
                self.name, method.name
            ))
        })?;

        let position = self.fields.iter().position(|f| f.name == name).unwrap_or_else(|| {
            self.fields.push(FieldDescriptor::new(name, kind.clone()));
            self.fields.len().saturating_sub(1)
        });

        let entity_name = self.name.clone();
        let field = self
            .fields
            .get_mut(position)
            .ok_or_else(|| EntityError::Schema(format!("{entity_name}: field slot vanished")))?;

        if field.kind != kind {
            return Err(EntityError::Schema(format!(
                "{entity_name}.{} declares {} but {} uses {kind}",
                field.name, field.kind, method.name
            )));
        }

        if kind.entity_type().is_some() && field.poly_column.is_none() {
            field.poly_column = Some(resolver.poly_type_name(method));
        }
        if method.params.is_empty() {
            field.accessor.get_or_insert_with(|| method.name.clone());
        } else {
            field.mutator.get_or_insert_with(|| method.name.clone());
        }
        field.merge_tags(&method.tags);

        Ok(FieldIndex(position))
    }

    /// A method by name.
    pub fn method(&self, name: &str) -> Option<&MethodEntry> {
        self.methods.get(name)
    }

    /// Every classified method.
    pub fn methods(&self) -> impl Iterator<Item = &MethodEntry> {
        self.methods.values()
    }

    /// Fields in index order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// A field by index.
    pub fn field(&self, index: FieldIndex) -> Option<&FieldDescriptor> {
        self.fields.get(index.0)
    }

    /// The index of a field by column name.
    pub fn field_index(&self, name: &str) -> Option<FieldIndex> {
        self.fields.iter().position(|f| f.name == name).map(FieldIndex)
    }

    /// A field by column name.
    pub fn field_named(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::naming::SnakeCaseResolver;

    fn person() -> EntityDefinition {
        EntityDefinition::new("Person")
            .method(MethodShape::getter("get_first_name", ValueKind::String))
            .method(MethodShape::setter("set_first_name", ValueKind::String).tag(Tag::NotNull))
            .method(MethodShape::getter("get_url", ValueKind::Url).tag(Tag::Accessor("url".into())).tag(Tag::Unique))
            .method(MethodShape::setter("set_url", ValueKind::Url).tag(Tag::Mutator("url".into())))
            .method(MethodShape::getter("get_company", ValueKind::Entity("Company".into())))
            .method(MethodShape::setter("set_company", ValueKind::Entity("Company".into())))
            .method(MethodShape::getter("is_active", ValueKind::Boolean))
            .method(
                MethodShape::many("get_pens", "Pen").tag(Tag::OneToMany {
                    r#where: Some("deleted = 0".into()),
                }),
            )
            .method(MethodShape::many("get_suits", "Suit").tag(Tag::ManyToMany {
                through: "PersonSuit".into(),
                r#where: None,
            }))
            .method(MethodShape::many("get_untagged", "Pen"))
    }

    #[test]
    fn accessor_and_mutator_share_a_field() {
        let ty = EntityType::build(&person(), &SnakeCaseResolver).unwrap();

        let get = &ty.method("get_first_name").unwrap().operation;
        let set = &ty.method("set_first_name").unwrap().operation;
        assert_eq!(get, &Operation::Get(FieldIndex(0)));
        assert_eq!(set, &Operation::Set(FieldIndex(0)));

        let field = ty.field(FieldIndex(0)).unwrap();
        assert_eq!(field.name, "first_name");
        assert!(field.not_null);
        assert_eq!(field.accessor.as_deref(), Some("get_first_name"));
        assert_eq!(field.mutator.as_deref(), Some("set_first_name"));
    }

    #[test]
    fn explicit_tags_override_names() {
        let ty = EntityType::build(&person(), &SnakeCaseResolver).unwrap();
        let url = ty.field_named("url").unwrap();
        assert!(url.unique);
        assert_eq!(url.kind, ValueKind::Url);
    }

    #[test]
    fn entity_fields_reference_the_key_column() {
        let ty = EntityType::build(&person(), &SnakeCaseResolver).unwrap();
        let company = ty.field_named("company_id").unwrap();
        assert_eq!(company.kind, ValueKind::Entity("Company".into()));
        assert_eq!(company.poly_column.as_deref(), Some("company_type"));
    }

    #[test]
    fn relations_and_intrinsics_are_classified() {
        let ty = EntityType::build(&person(), &SnakeCaseResolver).unwrap();

        assert_eq!(ty.method("id").unwrap().operation, Operation::PrimaryKey);
        assert_eq!(ty.method("save").unwrap().operation, Operation::Save);
        assert_eq!(
            ty.method("get_pens").unwrap().operation,
            Operation::Relation(RelationSpec {
                kind: RelationKind::OneToMany,
                target: "Pen".into(),
                predicate: Some("deleted = 0".into()),
            })
        );
        assert!(matches!(
            ty.method("get_suits").unwrap().operation,
            Operation::Relation(RelationSpec {
                kind: RelationKind::ManyToMany { .. },
                ..
            })
        ));
        assert!(ty.method("get_untagged").is_none());
        assert_eq!(ty.table, "person");
        assert_eq!(ty.key.field, "id");
    }

    #[test]
    fn conflicting_kinds_are_rejected() {
        let definition = EntityDefinition::new("Broken")
            .method(MethodShape::getter("get_age", ValueKind::Integer))
            .method(MethodShape::setter("set_age", ValueKind::String));
        assert!(matches!(
            EntityType::build(&definition, &SnakeCaseResolver),
            Err(EntityError::Schema(_))
        ));
    }
}
