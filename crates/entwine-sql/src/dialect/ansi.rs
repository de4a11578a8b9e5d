//! The generic ANSI dialect: unquoted identifiers, standard identity
//! columns and inline `ON UPDATE`.

use super::Dialect;

/// Generic ANSI SQL. Every [`Dialect`] default applies unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiDialect;

impl Dialect for AnsiDialect {
    fn name(&self) -> &'static str {
        "ansi"
    }
}

#[cfg(test)]
mod tests {
    use entwine_types::{DatabaseFunction, SqlType, Value};

    use super::*;
    use crate::ddl::{DdlField, DdlForeignKey, DdlTable};

    #[test]
    fn renders_the_person_table() {
        let table = DdlTable::new("person")
            .field(DdlField::new("id", SqlType::Integer).auto_increment().not_null().primary_key())
            .field(DdlField::new("first_name", SqlType::VarChar).precision(255).not_null())
            .field(DdlField::new("age", SqlType::Integer).precision(20).default_value(Value::Int(0)))
            .field(
                DdlField::new("created", SqlType::Timestamp)
                    .default_value(DatabaseFunction::CurrentTimestamp)
                    .on_update(DatabaseFunction::CurrentTimestamp),
            )
            .field(DdlField::new("company_id", SqlType::BigInt))
            .foreign_key(DdlForeignKey::new("company_id", "company", "id"));

        assert_eq!(
            AnsiDialect.render_table(&table),
            "CREATE TABLE person (\n\
             \x20   id INTEGER GENERATED BY DEFAULT AS IDENTITY NOT NULL,\n\
             \x20   first_name VARCHAR(255) NOT NULL,\n\
             \x20   age INTEGER(20) DEFAULT 0,\n\
             \x20   created TIMESTAMP DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,\n\
             \x20   company_id BIGINT,\n\
             \x20   FOREIGN KEY (company_id) REFERENCES company(id),\n\
             \x20   PRIMARY KEY(id)\n\
             )"
        );
    }

    #[test]
    fn auto_increment_suppresses_the_default() {
        let field = DdlField::new("id", SqlType::Integer)
            .auto_increment()
            .default_value(Value::Int(7));
        let clause = AnsiDialect.render_field(&field);
        assert!(clause.contains("GENERATED BY DEFAULT AS IDENTITY"));
        assert!(!clause.contains("DEFAULT 7"));
    }

    #[test]
    fn decimal_precision_and_scale() {
        let field = DdlField::new("price", SqlType::Decimal).precision(10).scale(2).unique();
        assert_eq!(AnsiDialect.render_field(&field), "price DECIMAL(10,2) UNIQUE");
    }

    #[test]
    fn no_auxiliary_statements() {
        let table = DdlTable::new("t").field(
            DdlField::new("modified", SqlType::Timestamp).on_update(DatabaseFunction::CurrentTimestamp),
        );
        assert!(AnsiDialect.render_functions(&table).is_empty());
        assert!(AnsiDialect.render_triggers(&table).is_empty());
    }
}
