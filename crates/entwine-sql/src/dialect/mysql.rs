//! `MySQL` (`InnoDB`).

use entwine_types::SqlType;

use super::Dialect;
use crate::ddl::DdlField;

/// The `MySQL` dialect: backtick quoting, `AUTO_INCREMENT` and `InnoDB`
/// tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_char(&self) -> Option<char> {
        Some('`')
    }

    fn type_name(&self, ty: SqlType) -> &'static str {
        match ty {
            SqlType::Clob | SqlType::LongVarChar => "TEXT",
            SqlType::LongVarBinary => "LONGBLOB",
            SqlType::Timestamp => "DATETIME",
            other => other.name(),
        }
    }

    fn consider_precision(&self, field: &DdlField) -> bool {
        !matches!(
            field.sql_type,
            SqlType::Blob
                | SqlType::LongVarBinary
                | SqlType::Clob
                | SqlType::LongVarChar
                | SqlType::Boolean
                | SqlType::Date
                | SqlType::Time
                | SqlType::Timestamp
                | SqlType::Double
                | SqlType::Float
        )
    }

    fn auto_increment_clause(&self) -> Option<&'static str> {
        Some("AUTO_INCREMENT")
    }

    fn table_options(&self) -> Option<&'static str> {
        Some("ENGINE=InnoDB")
    }
}
