//! `PostgreSQL`.
//!
//! Differences from the ANSI defaults:
//!
//! - identifiers are double-quoted
//! - generated keys use `SERIAL`/`BIGSERIAL` and `INSERT .. RETURNING`
//! - binary and long character types map to `BYTEA` and `TEXT`, and
//!   `BIT` maps to `BOOLEAN`; parsing reads each shared name back as one
//!   canonical type (`BLOB`, `CLOB`, `BOOLEAN`)
//! - precision is only emitted for character and exact numeric types
//! - `ON UPDATE` has no inline form and is emulated with a `plpgsql`
//!   function plus a `BEFORE UPDATE` trigger per field

use core::fmt::Write as _;

use entwine_types::{SqlType, Value};

use super::Dialect;
use crate::ddl::{DdlField, DdlTable};

/// The `PostgreSQL` dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    fn on_update_function_name(table: &DdlTable, field: &DdlField) -> String {
        format!("{}_{}_onupdate", table.name, field.name)
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_char(&self) -> Option<char> {
        Some('"')
    }

    fn type_name(&self, ty: SqlType) -> &'static str {
        match ty {
            SqlType::Binary | SqlType::Blob | SqlType::LongVarBinary | SqlType::VarBinary => "BYTEA",
            SqlType::Clob | SqlType::LongVarChar => "TEXT",
            SqlType::Double => "DOUBLE PRECISION",
            SqlType::Bit => "BOOLEAN",
            other => other.name(),
        }
    }

    fn parse_type_name(&self, name: &str) -> Option<SqlType> {
        match name.to_ascii_uppercase().as_str() {
            "SERIAL" => Some(SqlType::Integer),
            "BIGSERIAL" => Some(SqlType::BigInt),
            "BYTEA" => Some(SqlType::Blob),
            "TEXT" => Some(SqlType::Clob),
            "BOOLEAN" => Some(SqlType::Boolean),
            other => SqlType::ALL
                .into_iter()
                .find(|ty| self.type_name(*ty).eq_ignore_ascii_case(other)),
        }
    }

    fn render_field_type(&self, field: &DdlField) -> String {
        if field.auto_increment {
            return if field.sql_type == SqlType::BigInt {
                "BIGSERIAL"
            } else {
                "SERIAL"
            }
            .to_owned();
        }
        self.type_name(self.sanitize_type(field.sql_type)).to_owned()
    }

    fn consider_precision(&self, field: &DdlField) -> bool {
        !field.auto_increment
            && matches!(
                field.sql_type,
                SqlType::Char | SqlType::VarChar | SqlType::Decimal | SqlType::Numeric
            )
    }

    fn auto_increment_clause(&self) -> Option<&'static str> {
        None
    }

    fn render_scalar(&self, value: &Value) -> String {
        match value {
            Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_owned(),
            Value::Bytes(bytes) => {
                let mut literal = String::from("'\\x");
                for byte in bytes {
                    let _ = write!(literal, "{byte:02x}");
                }
                literal.push_str("'::bytea");
                literal
            }
            Value::Entity(entity) => self.render_scalar(&Value::from(entity.key().clone())),
            other => super::AnsiDialect.render_scalar(other),
        }
    }

    fn render_on_update(&self, _field: &DdlField) -> Option<String> {
        None
    }

    fn render_function_for_field(&self, table: &DdlTable, field: &DdlField) -> Option<String> {
        let on_update = field.on_update.as_ref()?;
        Some(format!(
            "CREATE FUNCTION {}() RETURNS trigger AS $$\nBEGIN\n    NEW.{} := {};\n    RETURN NEW;\nEND;\n$$ LANGUAGE plpgsql",
            self.quote(&Self::on_update_function_name(table, field)),
            self.quote(&field.name),
            self.render_value(on_update)
        ))
    }

    fn render_trigger_for_field(&self, table: &DdlTable, field: &DdlField) -> Option<String> {
        field.on_update.as_ref()?;
        let function = Self::on_update_function_name(table, field);
        Some(format!(
            "CREATE TRIGGER {} BEFORE UPDATE ON {} FOR EACH ROW EXECUTE PROCEDURE {}()",
            self.quote(&function),
            self.quote(&table.name),
            self.quote(&function)
        ))
    }

    fn insert_returning_clause(&self, pk_field: &str) -> Option<String> {
        Some(format!(" RETURNING {}", self.quote(pk_field)))
    }
}
