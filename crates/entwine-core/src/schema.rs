//! Schema generation from registered entity types.
//!
//! Each concrete type becomes a [`DdlTable`]: the key column first, then
//! every persisted field in declaration order. References to other types
//! become foreign keys unless the referenced type is a polymorphic base,
//! whose rows live in several tables; those fields get a discriminator
//! column instead. Polymorphic bases themselves have no table.

use entwine_sql::{DdlField, DdlForeignKey, DdlTable, Literal};
use entwine_types::{DatabaseFunction, SqlType};
use tracing::debug;

use crate::descriptor::{EntityType, FieldDescriptor};
use crate::error::EntityError;
use crate::manager::EntityManager;

/// Width of discriminator columns.
const DISCRIMINATOR_WIDTH: u32 = 127;

impl EntityManager {
    /// Table descriptors for the named types, in order.
    pub fn generate_schema(&self, types: &[&str]) -> Result<Vec<DdlTable>, EntityError> {
        let mut tables = Vec::with_capacity(types.len());
        for name in types {
            let entity_type = self.entity_type(name)?;
            if entity_type.polymorphic {
                debug!(entity = %entity_type.name, "skipping polymorphic base");
                continue;
            }
            tables.push(self.table_of(&entity_type)?);
        }
        Ok(tables)
    }

    /// `CREATE TABLE` statements for the named types, each followed by the
    /// dialect's auxiliary functions and triggers and an index per indexed
    /// field.
    pub fn render_schema(&self, types: &[&str]) -> Result<Vec<String>, EntityError> {
        let dialect = self.dialect();
        let mut statements = Vec::new();
        for table in self.generate_schema(types)? {
            statements.push(dialect.render_table(&table));
            statements.extend(dialect.render_functions(&table));
            statements.extend(dialect.render_triggers(&table));

            let entity_type = types
                .iter()
                .filter_map(|name| self.entity_type(name).ok())
                .find(|t| t.table == table.name);
            let indexed = entity_type
                .iter()
                .flat_map(|t| t.fields().iter())
                .filter(|f| f.indexed && !f.ignored);
            for field in indexed {
                statements.push(format!(
                    "CREATE INDEX {} ON {}({})",
                    dialect.quote(&format!("{}_{}_idx", table.name, field.name)),
                    dialect.quote(&table.name),
                    dialect.quote(&field.name)
                ));
            }
        }
        Ok(statements)
    }

    fn table_of(&self, entity_type: &EntityType) -> Result<DdlTable, EntityError> {
        let key = &entity_type.key;
        let key_codec = self.codec_for(&key.kind.value_kind())?;
        let mut key_field = DdlField::new(key.field.as_str(), key_codec.sql_type())
            .precision(key_codec.default_precision())
            .not_null()
            .primary_key();
        if key.auto_increment {
            key_field = key_field.auto_increment();
        }

        let mut table = DdlTable::new(entity_type.table.as_str()).field(key_field);
        let persisted = entity_type
            .fields()
            .iter()
            .filter(|f| !f.ignored && !f.name.eq_ignore_ascii_case(&key.field));
        for field in persisted {
            table = table.field(self.column_of(entity_type, field)?);

            let Some(target) = field.kind.entity_type() else {
                continue;
            };
            let target = self.entity_type(target)?;
            if target.polymorphic {
                if let Some(poly) = &field.poly_column {
                    table = table.field(DdlField::new(poly.as_str(), SqlType::VarChar).precision(DISCRIMINATOR_WIDTH));
                }
            } else {
                table = table.foreign_key(DdlForeignKey::new(
                    field.name.as_str(),
                    target.table.as_str(),
                    target.key.field.as_str(),
                ));
            }
        }

        Ok(table)
    }

    fn column_of(&self, entity_type: &EntityType, field: &FieldDescriptor) -> Result<DdlField, EntityError> {
        let codec = self.codec_for(&field.kind)?;
        let mut column = field.column_type.map_or_else(
            || DdlField::new(field.name.as_str(), codec.sql_type()).precision(codec.default_precision()),
            |explicit| {
                DdlField::new(field.name.as_str(), explicit.sql_type)
                    .precision(explicit.precision)
                    .scale(explicit.scale)
            },
        );
        if field.not_null {
            column = column.not_null();
        }
        if field.unique {
            column = column.unique();
        }

        let literal = |text: &str| -> Result<Literal, EntityError> {
            if let Ok(function) = text.parse::<DatabaseFunction>() {
                return Ok(Literal::Function(function));
            }
            codec.parse_default(text).map(Literal::Value).map_err(|source| {
                EntityError::Schema(format!(
                    "{}.{}: invalid default `{text}`: {source}",
                    entity_type.name, field.name
                ))
            })
        };
        if let Some(default) = &field.default {
            column = column.default_value(literal(default)?);
        }
        if let Some(on_update) = &field.on_update {
            column = column.on_update(literal(on_update)?);
        }

        Ok(column)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use entwine_sql::AnsiDialect;
    use entwine_types::ValueKind;

    use super::*;
    use crate::definition::{EntityDefinition, MethodShape, Tag};
    use crate::script::{Response, ScriptedProvider};

    fn manager() -> EntityManager {
        let manager = EntityManager::new(ScriptedProvider::new(AnsiDialect, |_| Response::Affected(0)));
        manager
            .register_all(&[
                EntityDefinition::new("Company"),
                EntityDefinition::new("Address").polymorphic(),
                EntityDefinition::new("Person")
                    .method(MethodShape::getter("get_first_name", ValueKind::String).tag(Tag::NotNull))
                    .method(
                        MethodShape::getter("get_age", ValueKind::Integer)
                            .tag(Tag::Default("18".into()))
                            .tag(Tag::Indexed),
                    )
                    .method(
                        MethodShape::getter("get_modified", ValueKind::Timestamp)
                            .tag(Tag::OnUpdate("CURRENT_TIMESTAMP".into())),
                    )
                    .method(MethodShape::getter("get_scratch", ValueKind::String).tag(Tag::Ignore))
                    .method(MethodShape::getter("get_company", ValueKind::Entity("Company".into())))
                    .method(MethodShape::getter("get_address", ValueKind::Entity("Address".into()))),
            ])
            .unwrap();
        manager
    }

    #[test]
    fn tables_follow_field_declarations() {
        let manager = manager();
        let tables = manager.generate_schema(&["Address", "Person"]).unwrap();
        assert_eq!(tables.len(), 1);

        let person = tables.first().unwrap();
        let names: Vec<&str> = person.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            ["id", "first_name", "age", "modified", "company_id", "address_id", "address_type"]
        );

        let id = person.fields.first().unwrap();
        assert!(id.primary_key && id.auto_increment && id.not_null);

        let age = person.fields.get(2).unwrap();
        assert_eq!(age.default, Some(Literal::Value(18_i32.into())));
        let modified = person.fields.get(3).unwrap();
        assert_eq!(modified.on_update, Some(Literal::Function(DatabaseFunction::CurrentTimestamp)));

        assert_eq!(person.foreign_keys.len(), 1);
        assert_eq!(person.foreign_keys.first().unwrap().table, "company");
    }

    #[test]
    fn indexed_fields_get_an_index() {
        let manager = manager();
        let statements = manager.render_schema(&["Person"]).unwrap();
        assert!(statements.first().unwrap().starts_with("CREATE TABLE person ("));
        assert!(statements.contains(&"CREATE INDEX person_age_idx ON person(age)".to_owned()));
    }

    #[test]
    fn invalid_defaults_are_schema_errors() {
        let manager = manager();
        manager
            .register(
                &EntityDefinition::new("Broken")
                    .method(MethodShape::getter("get_age", ValueKind::Integer).tag(Tag::Default("old".into()))),
            )
            .unwrap();
        assert!(matches!(
            manager.generate_schema(&["Broken"]),
            Err(EntityError::Schema(_))
        ));
    }
}
