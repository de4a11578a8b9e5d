//! Logical SQL column types and named database functions.

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Logical column type, independent of any dialect.
///
/// Dialects translate each variant into their own type name; the generic
/// name returned by [`SqlType::name`] is the ANSI rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SqlType {
    /// 64-bit integer.
    BigInt,
    /// Fixed-length binary.
    Binary,
    /// Single bit.
    Bit,
    /// Binary large object.
    Blob,
    /// Boolean.
    Boolean,
    /// Fixed-length character.
    Char,
    /// Character large object.
    Clob,
    /// Calendar date.
    Date,
    /// Fixed-point decimal.
    Decimal,
    /// Double-precision float.
    Double,
    /// Float.
    Float,
    /// 32-bit integer.
    Integer,
    /// Long variable binary.
    LongVarBinary,
    /// Long variable character.
    LongVarChar,
    /// The null type.
    Null,
    /// Exact numeric.
    Numeric,
    /// Single-precision float.
    Real,
    /// Reference.
    Ref,
    /// 16-bit integer.
    SmallInt,
    /// Structured type.
    Struct,
    /// Time of day.
    Time,
    /// Date and time.
    Timestamp,
    /// Variable binary.
    VarBinary,
    /// Variable character.
    VarChar,
}

impl SqlType {
    /// Every logical type, in declaration order.
    pub const ALL: [Self; 24] = [
        Self::BigInt,
        Self::Binary,
        Self::Bit,
        Self::Blob,
        Self::Boolean,
        Self::Char,
        Self::Clob,
        Self::Date,
        Self::Decimal,
        Self::Double,
        Self::Float,
        Self::Integer,
        Self::LongVarBinary,
        Self::LongVarChar,
        Self::Null,
        Self::Numeric,
        Self::Real,
        Self::Ref,
        Self::SmallInt,
        Self::Struct,
        Self::Time,
        Self::Timestamp,
        Self::VarBinary,
        Self::VarChar,
    ];

    /// The generic (ANSI) type name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::BigInt => "BIGINT",
            Self::Binary => "BINARY",
            Self::Bit => "BIT",
            Self::Blob => "BLOB",
            Self::Boolean => "BOOLEAN",
            Self::Char => "CHAR",
            Self::Clob => "CLOB",
            Self::Date => "DATE",
            Self::Decimal => "DECIMAL",
            Self::Double => "DOUBLE",
            Self::Float => "FLOAT",
            Self::Integer => "INTEGER",
            Self::LongVarBinary => "LONGVARBINARY",
            Self::LongVarChar => "LONGVARCHAR",
            Self::Null => "NULL",
            Self::Numeric => "NUMERIC",
            Self::Real => "REAL",
            Self::Ref => "REF",
            Self::SmallInt => "SMALLINT",
            Self::Struct => "STRUCT",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::VarBinary => "VARBINARY",
            Self::VarChar => "VARCHAR",
        }
    }

    /// Whether the type is an integer type.
    pub const fn is_integral(self) -> bool {
        matches!(self, Self::BigInt | Self::Integer | Self::SmallInt)
    }
}

impl core::fmt::Display for SqlType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl core::str::FromStr for SqlType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValueError::UnknownSqlType(s.to_owned()))
    }
}

/// A named function the database evaluates, usable as a default value or
/// an `ON UPDATE` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatabaseFunction {
    /// The current date.
    CurrentDate,
    /// The current date and time.
    CurrentTimestamp,
}

impl core::str::FromStr for DatabaseFunction {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CURRENT_DATE" => Ok(Self::CurrentDate),
            "CURRENT_TIMESTAMP" | "NOW()" => Ok(Self::CurrentTimestamp),
            _ => Err(ValueError::UnknownFunction(s.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn every_type_parses_back_from_its_name() {
        for ty in SqlType::ALL {
            assert_eq!(ty.name().parse::<SqlType>().unwrap(), ty);
        }
    }

    #[test]
    fn type_names_are_case_insensitive() {
        assert_eq!("varchar".parse::<SqlType>().unwrap(), SqlType::VarChar);
        assert!("GEOMETRY".parse::<SqlType>().is_err());
    }

    #[test]
    fn functions_parse_by_name() {
        assert_eq!(
            "current_timestamp".parse::<DatabaseFunction>().unwrap(),
            DatabaseFunction::CurrentTimestamp
        );
        assert!("RANDOM()".parse::<DatabaseFunction>().is_err());
    }
}
