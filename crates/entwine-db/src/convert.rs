//! Conversion between entwine values and `PostgreSQL` wire values.

use chrono::{DateTime, Utc};
use entwine_sql::Statement;
use entwine_types::{Row, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row as _, TypeInfo, ValueRef};

pub(crate) type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Rewrite `?` placeholders to `$n` and split off the parameters to bind.
///
/// Null parameters are inlined as `NULL` so that `PostgreSQL` infers the
/// column type instead of rejecting an untyped bind. Placeholders inside
/// string literals are left alone.
pub(crate) fn prepare(statement: &Statement) -> (String, Vec<Value>) {
    let mut sql = String::with_capacity(statement.sql.len());
    let mut params = Vec::with_capacity(statement.params.len());
    let mut pending = statement.params.iter();
    let mut in_literal = false;

    for c in statement.sql.chars() {
        match c {
            '\'' => {
                in_literal = !in_literal;
                sql.push(c);
            }
            '?' if !in_literal => match pending.next() {
                Some(Value::Null) => sql.push_str("NULL"),
                Some(value) => {
                    params.push(value.clone());
                    sql.push('$');
                    sql.push_str(&params.len().to_string());
                }
                None => sql.push(c),
            },
            _ => sql.push(c),
        }
    }

    (sql, params)
}

/// Bind one value. Entity references bind their key.
pub(crate) fn bind(query: PgQuery<'_>, value: Value) -> PgQuery<'_> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(b),
        Value::Int(i) => query.bind(i),
        Value::Float(x) => query.bind(x),
        Value::Decimal(d) => query.bind(d),
        Value::Text(s) => query.bind(s),
        Value::Bytes(b) => query.bind(b),
        Value::Date(d) => query.bind(d),
        Value::Timestamp(ts) => query.bind(ts),
        Value::Uuid(u) => query.bind(u),
        Value::Entity(entity) => bind(query, Value::from(entity.key().clone())),
    }
}

/// Decode every column of a result row by its `PostgreSQL` type.
pub(crate) fn decode_row(row: &PgRow) -> Result<Row, sqlx::Error> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name())?;
        decoded.push(column.name(), value);
    }
    Ok(decoded)
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }
    Ok(match type_name {
        "BOOL" => Value::Bool(row.try_get(index)?),
        "INT2" => Value::from(row.try_get::<i16, _>(index)?),
        "INT4" => Value::from(row.try_get::<i32, _>(index)?),
        "INT8" => Value::Int(row.try_get(index)?),
        "FLOAT4" => Value::Float(f64::from(row.try_get::<f32, _>(index)?)),
        "FLOAT8" => Value::Float(row.try_get(index)?),
        "NUMERIC" => Value::Decimal(row.try_get(index)?),
        "BYTEA" => Value::Bytes(row.try_get(index)?),
        "DATE" => Value::Date(row.try_get(index)?),
        "TIMESTAMP" => Value::Timestamp(row.try_get(index)?),
        "TIMESTAMPTZ" => Value::Timestamp(row.try_get::<DateTime<Utc>, _>(index)?.naive_utc()),
        "UUID" => Value::Uuid(row.try_get(index)?),
        _ => Value::Text(row.try_get(index)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_numbered_in_order() {
        let statement = Statement::new("UPDATE person SET name = ?,age = ? WHERE id = ?")
            .bind("Ada")
            .bind(36_i64)
            .bind(1_i64);
        let (sql, params) = prepare(&statement);
        assert_eq!(sql, "UPDATE person SET name = $1,age = $2 WHERE id = $3");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn nulls_are_inlined() {
        let statement = Statement::new("UPDATE person SET name = ?,age = ? WHERE id = ?")
            .bind(Value::Null)
            .bind(36_i64)
            .bind(1_i64);
        let (sql, params) = prepare(&statement);
        assert_eq!(sql, "UPDATE person SET name = NULL,age = $1 WHERE id = $2");
        assert_eq!(params, vec![Value::Int(36), Value::Int(1)]);
    }

    #[test]
    fn literals_keep_their_question_marks() {
        let statement = Statement::new("SELECT id FROM pen WHERE note = 'why?' AND id = ?").bind(4_i64);
        let (sql, _) = prepare(&statement);
        assert_eq!(sql, "SELECT id FROM pen WHERE note = 'why?' AND id = $1");
    }
}
