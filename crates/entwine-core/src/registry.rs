//! The set of registered entity types and the hierarchy queries relation
//! traversal needs.

use std::collections::HashMap;
use std::sync::Arc;

use entwine_types::{Value, ValueKind};

use crate::descriptor::{EntityType, FieldDescriptor};
use crate::error::EntityError;

/// Registered entity types by name.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    types: HashMap<String, Arc<EntityType>>,
}

impl EntityRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type, replacing any previous registration under its name.
    pub fn insert(&mut self, entity_type: EntityType) -> Arc<EntityType> {
        let entity_type = Arc::new(entity_type);
        self.types
            .insert(entity_type.name.clone(), Arc::clone(&entity_type));
        entity_type
    }

    /// A registered type.
    pub fn get(&self, name: &str) -> Result<Arc<EntityType>, EntityError> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| EntityError::UnknownEntityType(name.to_owned()))
    }

    /// Whether a type is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Every registered type.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<EntityType>> {
        self.types.values()
    }

    /// Whether a `candidate` can stand where `base` is declared: it is
    /// `base` or extends it, directly or transitively.
    pub fn is_assignable(&self, base: &str, candidate: &str) -> bool {
        let mut current = Some(candidate);
        // bounded by the number of types so a cyclic `extends` terminates
        for _ in 0..=self.types.len() {
            let Some(name) = current else {
                return false;
            };
            if name == base {
                return true;
            }
            current = self.types.get(name).and_then(|t| t.base.as_deref());
        }
        false
    }

    /// Whether a type is a polymorphic base.
    pub fn is_polymorphic(&self, name: &str) -> bool {
        self.types.get(name).is_some_and(|t| t.polymorphic)
    }

    /// The discriminator column of a field, if it references a polymorphic
    /// base.
    pub fn poly_column<'a>(&self, field: &'a FieldDescriptor) -> Option<&'a str> {
        field
            .kind
            .entity_type()
            .filter(|target| self.is_polymorphic(target))
            .and(field.poly_column.as_deref())
    }

    /// Columns of `from` whose declared type accepts `to`.
    pub fn mapping_fields(&self, from: &EntityType, to: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for field in from.fields().iter().filter(|f| self.accepts(f, to)) {
            if !names.contains(&field.name) {
                names.push(field.name.clone());
            }
        }
        names
    }

    fn accepts(&self, field: &FieldDescriptor, to: &str) -> bool {
        field
            .kind
            .entity_type()
            .is_some_and(|declared| self.is_assignable(declared, to))
    }

    /// Whether a cached value may be returned for a field of `kind`.
    /// Entity values fit any kind their type is assignable to.
    pub fn value_fits(&self, value: &Value, kind: &ValueKind) -> bool {
        match (value, kind) {
            (Value::Entity(entity), ValueKind::Entity(declared)) => {
                self.is_assignable(declared, entity.entity_type())
            }
            _ => value.matches(kind),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use entwine_types::EntityRef;

    use super::*;
    use crate::definition::{EntityDefinition, MethodShape};
    use crate::naming::SnakeCaseResolver;

    fn registry() -> EntityRegistry {
        let defs = [
            EntityDefinition::new("Address").polymorphic(),
            EntityDefinition::new("EmailAddress").extends("Address"),
            EntityDefinition::new("Company"),
            EntityDefinition::new("Person")
                .method(MethodShape::getter("get_company", ValueKind::Entity("Company".into())))
                .method(MethodShape::getter("get_employer", ValueKind::Entity("Company".into())))
                .method(MethodShape::getter("get_address", ValueKind::Entity("Address".into()))),
        ];
        let mut registry = EntityRegistry::new();
        for def in &defs {
            registry.insert(EntityType::build(def, &SnakeCaseResolver).unwrap());
        }
        registry
    }

    #[test]
    fn variants_are_assignable_to_their_base() {
        let registry = registry();
        assert!(registry.is_assignable("Address", "EmailAddress"));
        assert!(registry.is_assignable("Address", "Address"));
        assert!(!registry.is_assignable("EmailAddress", "Address"));
        assert!(!registry.is_assignable("Company", "Person"));
    }

    #[test]
    fn mapping_fields_follow_declared_types() {
        let registry = registry();
        let person = registry.get("Person").unwrap();
        assert_eq!(registry.mapping_fields(&person, "Company"), ["company_id", "employer_id"]);
        assert_eq!(registry.mapping_fields(&person, "EmailAddress"), ["address_id"]);
        assert!(registry.mapping_fields(&person, "Pen").is_empty());
    }

    #[test]
    fn only_polymorphic_references_have_discriminators() {
        let registry = registry();
        let person = registry.get("Person").unwrap();
        let address = person.field_named("address_id").unwrap();
        let company = person.field_named("company_id").unwrap();
        assert_eq!(registry.poly_column(address), Some("address_type"));
        assert_eq!(registry.poly_column(company), None);
    }

    #[test]
    fn variant_values_fit_base_fields() {
        let registry = registry();
        let email = Value::Entity(EntityRef::new("EmailAddress", 3));
        assert!(registry.value_fits(&email, &ValueKind::Entity("Address".into())));
        assert!(!registry.value_fits(&email, &ValueKind::Entity("Company".into())));
        assert!(!registry.value_fits(&Value::Int(3), &ValueKind::Entity("Company".into())));
    }
}
