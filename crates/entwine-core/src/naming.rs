//! Name resolution and polymorphic type mapping.
//!
//! Both are pluggable collaborators of the [`EntityManager`](crate::EntityManager).
//! The defaults follow Rust naming: `PersonSuit` lives in `person_suit`,
//! `get_company` reads the `company_id` column and its polymorphic
//! discriminator, if any, is `company_type`.

use std::collections::HashMap;

use convert_case::{Case, Casing};

use crate::definition::MethodShape;

/// Maps entity types and methods to table and column names.
pub trait NameResolver: Send + Sync + core::fmt::Debug {
    /// Table name for an entity type.
    fn table_name(&self, entity_type: &str) -> String;

    /// Column name for an accessor or mutator.
    fn field_name(&self, method: &MethodShape) -> String;

    /// Discriminator column name for a polymorphic entity-valued field.
    fn poly_type_name(&self, method: &MethodShape) -> String;
}

/// The default [`NameResolver`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCaseResolver;

impl SnakeCaseResolver {
    fn stem(method: &MethodShape) -> String {
        let name = method.name.as_str();
        ["get_", "set_", "is_"]
            .into_iter()
            .find_map(|prefix| name.strip_prefix(prefix))
            .filter(|rest| !rest.is_empty())
            .unwrap_or(name)
            .to_case(Case::Snake)
    }
}

impl NameResolver for SnakeCaseResolver {
    fn table_name(&self, entity_type: &str) -> String {
        entity_type.to_case(Case::Snake)
    }

    fn field_name(&self, method: &MethodShape) -> String {
        let stem = Self::stem(method);
        let references_entity = method
            .attribute_kind()
            .is_some_and(|kind| kind.entity_type().is_some());
        if references_entity {
            format!("{stem}_id")
        } else {
            stem
        }
    }

    fn poly_type_name(&self, method: &MethodShape) -> String {
        format!("{}_type", Self::stem(method))
    }
}

/// Maps concrete entity types to discriminator values and back.
pub trait PolymorphicTypeMapper: Send + Sync + core::fmt::Debug {
    /// Discriminator stored for a concrete type.
    fn convert(&self, entity_type: &str) -> String;

    /// Concrete type of a discriminator, given the polymorphic base the
    /// column refers to.
    fn invert(&self, base: &str, discriminator: &str) -> String;
}

/// The default [`PolymorphicTypeMapper`]: explicit mappings, falling back
/// to the type name itself.
#[derive(Debug, Clone, Default)]
pub struct DefaultTypeMapper {
    mappings: HashMap<String, String>,
}

impl DefaultTypeMapper {
    /// A mapper with no explicit mappings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `entity_type` as `discriminator`.
    #[must_use]
    pub fn with_mapping(mut self, entity_type: impl Into<String>, discriminator: impl Into<String>) -> Self {
        self.mappings.insert(entity_type.into(), discriminator.into());
        self
    }
}

impl PolymorphicTypeMapper for DefaultTypeMapper {
    fn convert(&self, entity_type: &str) -> String {
        self.mappings
            .get(entity_type)
            .cloned()
            .unwrap_or_else(|| entity_type.to_owned())
    }

    fn invert(&self, _base: &str, discriminator: &str) -> String {
        self.mappings
            .iter()
            .find(|(_, value)| value.as_str() == discriminator)
            .map_or_else(|| discriminator.to_owned(), |(entity_type, _)| entity_type.clone())
    }
}

#[cfg(test)]
mod tests {
    use entwine_types::ValueKind;

    use super::*;

    #[test]
    fn tables_are_snake_case() {
        assert_eq!(SnakeCaseResolver.table_name("PersonSuit"), "person_suit");
        assert_eq!(SnakeCaseResolver.table_name("Person"), "person");
    }

    #[test]
    fn fields_strip_accessor_prefixes() {
        let r = SnakeCaseResolver;
        assert_eq!(r.field_name(&MethodShape::getter("get_first_name", ValueKind::String)), "first_name");
        assert_eq!(r.field_name(&MethodShape::setter("set_first_name", ValueKind::String)), "first_name");
        assert_eq!(r.field_name(&MethodShape::getter("is_active", ValueKind::Boolean)), "active");
        assert_eq!(r.field_name(&MethodShape::getter("age", ValueKind::Integer)), "age");
    }

    #[test]
    fn entity_fields_get_an_id_suffix() {
        let getter = MethodShape::getter("get_company", ValueKind::Entity("Company".into()));
        assert_eq!(SnakeCaseResolver.field_name(&getter), "company_id");
        assert_eq!(SnakeCaseResolver.poly_type_name(&getter), "company_type");
    }

    #[test]
    fn mapper_falls_back_to_type_names() {
        let mapper = DefaultTypeMapper::new().with_mapping("EmailAddress", "email");
        assert_eq!(mapper.convert("EmailAddress"), "email");
        assert_eq!(mapper.convert("PostalAddress"), "PostalAddress");
        assert_eq!(mapper.invert("Address", "email"), "EmailAddress");
        assert_eq!(mapper.invert("Address", "PostalAddress"), "PostalAddress");
    }
}
