//! The [`Dialect`] trait and its implementations.
//!
//! A dialect is a stateless renderer. Every method has a default that
//! produces ANSI-flavoured SQL; concrete dialects override only the hooks
//! where their database differs (type names, quoting, auto-increment,
//! `ON UPDATE` emulation, generated-key retrieval).
//!
//! Rendering is split into small hooks so an override can replace one
//! clause without re-implementing the statement:
//!
//! ```text
//! render_table
//!   +-- render_field       (per field, in order)
//!   |     +-- render_field_type / consider_precision
//!   |     +-- auto_increment_clause XOR render_value(default)
//!   |     +-- render_on_update
//!   +-- render_foreign_key (per key)
//!   +-- PRIMARY KEY(...)
//!   +-- table_options
//! ```

mod ansi;
mod mysql;
mod postgres;

pub use ansi::AnsiDialect;
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;

use core::fmt::Write as _;

use chrono::NaiveDateTime;
use entwine_types::{DatabaseFunction, SqlType, Value};

use crate::ddl::{DdlField, DdlForeignKey, DdlTable, Literal};
use crate::query::{Query, QueryTarget};
use crate::select::{ColumnRef, Condition, Select, SelectItem, Source};
use crate::statement::Statement;

/// Maps entity type names to table names while rendering a [`Query`].
pub trait TableResolver {
    /// Table name for an entity type.
    fn table_name(&self, entity_type: &str) -> String;
}

impl<F: Fn(&str) -> String> TableResolver for F {
    fn table_name(&self, entity_type: &str) -> String {
        self(entity_type)
    }
}

/// A relational dialect.
pub trait Dialect: Send + Sync + core::fmt::Debug {
    /// Short dialect name, used in diagnostics.
    fn name(&self) -> &'static str;

    // ------------------------------------------------------------------
    // Identifiers
    // ------------------------------------------------------------------

    /// The identifier quote character, if the dialect quotes identifiers.
    fn quote_char(&self) -> Option<char> {
        None
    }

    /// Quote (and escape) an identifier. `*` is never quoted.
    fn quote(&self, identifier: &str) -> String {
        match self.quote_char() {
            Some(q) if identifier != "*" => {
                let doubled = format!("{q}{q}");
                format!("{q}{}{q}", identifier.replace(q, &doubled))
            }
            _ => identifier.to_owned(),
        }
    }

    /// Render a possibly qualified column reference.
    fn render_column(&self, column: &ColumnRef) -> String {
        column.qualifier.as_ref().map_or_else(
            || self.quote(&column.name),
            |q| format!("{}.{}", self.quote(q), self.quote(&column.name)),
        )
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    /// Map a logical type onto the type the dialect actually supports.
    fn sanitize_type(&self, ty: SqlType) -> SqlType {
        ty
    }

    /// The dialect's name for a logical type.
    fn type_name(&self, ty: SqlType) -> &'static str {
        ty.name()
    }

    /// Inverse of [`Dialect::type_name`], used when parsing rendered DDL.
    fn parse_type_name(&self, name: &str) -> Option<SqlType> {
        SqlType::ALL
            .into_iter()
            .find(|ty| self.type_name(*ty).eq_ignore_ascii_case(name))
    }

    /// The rendered type of a field, without precision.
    fn render_field_type(&self, field: &DdlField) -> String {
        self.type_name(self.sanitize_type(field.sql_type)).to_owned()
    }

    /// Whether precision and scale are meaningful for this field.
    fn consider_precision(&self, _field: &DdlField) -> bool {
        true
    }

    // ------------------------------------------------------------------
    // DDL
    // ------------------------------------------------------------------

    /// Clause marking a column as database-generated, if it is not
    /// expressed through the type itself.
    fn auto_increment_clause(&self) -> Option<&'static str> {
        Some("GENERATED BY DEFAULT AS IDENTITY")
    }

    /// Trailing table options appended after the closing parenthesis.
    fn table_options(&self) -> Option<&'static str> {
        None
    }

    /// Render a `CREATE TABLE` statement.
    ///
    /// Field order is preserved, foreign keys follow the fields and a
    /// single `PRIMARY KEY(...)` clause closes the list.
    fn render_table(&self, table: &DdlTable) -> String {
        let mut clauses: Vec<String> = table
            .fields
            .iter()
            .map(|field| self.render_field(field))
            .collect();

        clauses.extend(
            table
                .foreign_keys
                .iter()
                .map(|key| self.render_foreign_key(key)),
        );

        let primary_keys: Vec<String> = table.primary_keys().map(|pk| self.quote(pk)).collect();
        if !primary_keys.is_empty() {
            clauses.push(format!("PRIMARY KEY({})", primary_keys.join(",")));
        }

        let mut sql = format!("CREATE TABLE {} (\n", self.quote(&table.name));
        let body: Vec<String> = clauses.into_iter().map(|c| format!("    {c}")).collect();
        sql.push_str(&body.join(",\n"));
        sql.push_str("\n)");

        if let Some(options) = self.table_options() {
            sql.push(' ');
            sql.push_str(options);
        }

        sql
    }

    /// Render one column definition (no indentation, no trailing comma).
    fn render_field(&self, field: &DdlField) -> String {
        let mut ty = self.render_field_type(field);
        if self.consider_precision(field) && field.precision > 0 {
            if field.scale > 0 {
                let _ = write!(ty, "({},{})", field.precision, field.scale);
            } else {
                let _ = write!(ty, "({})", field.precision);
            }
        }

        let mut parts = vec![self.quote(&field.name), ty];

        if field.auto_increment {
            if let Some(clause) = self.auto_increment_clause() {
                parts.push(clause.to_owned());
            }
        } else if let Some(default) = &field.default {
            parts.push(format!("DEFAULT {}", self.render_value(default)));
        }

        if field.not_null {
            parts.push("NOT NULL".to_owned());
        }

        if let Some(on_update) = self.render_on_update(field) {
            parts.push(on_update);
        }

        if field.unique {
            parts.push("UNIQUE".to_owned());
        }

        parts.join(" ")
    }

    /// Render a `FOREIGN KEY` clause.
    fn render_foreign_key(&self, key: &DdlForeignKey) -> String {
        format!(
            "FOREIGN KEY ({}) REFERENCES {}({})",
            self.quote(&key.field),
            self.quote(&key.table),
            self.quote(&key.foreign_field)
        )
    }

    /// Render the `ON UPDATE` clause of a field, if the dialect supports
    /// it inline.
    fn render_on_update(&self, field: &DdlField) -> Option<String> {
        field
            .on_update
            .as_ref()
            .map(|value| format!("ON UPDATE {}", self.render_value(value)))
    }

    /// Auxiliary function statement for a field. Emits nothing by default.
    fn render_function_for_field(&self, _table: &DdlTable, _field: &DdlField) -> Option<String> {
        None
    }

    /// Auxiliary trigger statement for a field. Emits nothing by default.
    fn render_trigger_for_field(&self, _table: &DdlTable, _field: &DdlField) -> Option<String> {
        None
    }

    /// All auxiliary function statements for a table.
    fn render_functions(&self, table: &DdlTable) -> Vec<String> {
        table
            .fields
            .iter()
            .filter_map(|field| self.render_function_for_field(table, field))
            .collect()
    }

    /// All auxiliary trigger statements for a table.
    fn render_triggers(&self, table: &DdlTable) -> Vec<String> {
        table
            .fields
            .iter()
            .filter_map(|field| self.render_trigger_for_field(table, field))
            .collect()
    }

    // ------------------------------------------------------------------
    // Literals
    // ------------------------------------------------------------------

    /// Render a DDL literal.
    fn render_value(&self, literal: &Literal) -> String {
        match literal {
            Literal::Value(value) => self.render_scalar(value),
            Literal::Function(function) => self.render_function(*function).to_owned(),
        }
    }

    /// Render a concrete value as a SQL literal.
    fn render_scalar(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_owned(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_owned(),
            Value::Int(i) => i.to_string(),
            Value::Float(x) => x.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Value::Bytes(bytes) => {
                let mut hex = String::with_capacity(bytes.len().saturating_mul(2).saturating_add(3));
                hex.push_str("X'");
                for byte in bytes {
                    let _ = write!(hex, "{byte:02X}");
                }
                hex.push('\'');
                hex
            }
            Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            Value::Timestamp(ts) => format!("'{}'", self.render_timestamp(ts)),
            Value::Uuid(u) => format!("'{u}'"),
            Value::Entity(entity) => self.render_scalar(&Value::from(entity.key().clone())),
        }
    }

    /// Render a timestamp body (without quotes).
    fn render_timestamp(&self, timestamp: &NaiveDateTime) -> String {
        timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }

    /// Render a named database function.
    fn render_function(&self, function: DatabaseFunction) -> &'static str {
        match function {
            DatabaseFunction::CurrentDate => "CURRENT_DATE",
            DatabaseFunction::CurrentTimestamp => "CURRENT_TIMESTAMP",
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Render a [`Query`] in the fixed clause order
    /// `SELECT .. FROM .. JOIN .. WHERE .. GROUP BY .. ORDER BY .. LIMIT`.
    ///
    /// With `count` set the projection is replaced by `COUNT(*)`.
    fn render_query(&self, query: &Query, tables: &dyn TableResolver, count: bool) -> String {
        let mut sql = self.render_query_select(query, tables, count);
        sql.push_str(&self.render_query_joins(query, tables));
        sql.push_str(&self.render_query_where(query));
        sql.push_str(&self.render_query_group_by(query));
        sql.push_str(&self.render_query_order_by(query));
        sql.push_str(&self.render_query_limit(query));
        sql
    }

    /// `SELECT [DISTINCT] projection|COUNT(*) FROM table`.
    fn render_query_select(&self, query: &Query, tables: &dyn TableResolver, count: bool) -> String {
        let table = match query.target() {
            Some(QueryTarget::Table(table)) => table.clone(),
            Some(QueryTarget::Entity(entity_type)) => tables.table_name(entity_type),
            None => String::new(),
        };

        let mut sql = String::from("SELECT ");
        if query.is_distinct() {
            sql.push_str("DISTINCT ");
        }
        if count {
            sql.push_str("COUNT(*)");
        } else {
            sql.push_str(&query.projection().join(","));
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.quote(&table));
        sql
    }

    /// ` JOIN table [ON ..]` for every joined entity type.
    fn render_query_joins(&self, query: &Query, tables: &dyn TableResolver) -> String {
        let mut sql = String::new();
        for (entity_type, on) in query.joins() {
            sql.push_str(" JOIN ");
            sql.push_str(&self.quote(&tables.table_name(entity_type)));
            if let Some(on) = on {
                sql.push_str(" ON ");
                sql.push_str(on);
            }
        }
        sql
    }

    /// ` WHERE ..`.
    fn render_query_where(&self, query: &Query) -> String {
        query
            .predicate()
            .map_or_else(String::new, |w| format!(" WHERE {w}"))
    }

    /// ` GROUP BY ..`.
    fn render_query_group_by(&self, query: &Query) -> String {
        query
            .group_clause()
            .map_or_else(String::new, |g| format!(" GROUP BY {g}"))
    }

    /// ` ORDER BY ..`.
    fn render_query_order_by(&self, query: &Query) -> String {
        query
            .order_clause()
            .map_or_else(String::new, |o| format!(" ORDER BY {o}"))
    }

    /// ` LIMIT n`.
    fn render_query_limit(&self, query: &Query) -> String {
        query
            .row_limit()
            .map_or_else(String::new, |n| format!(" LIMIT {n}"))
    }

    /// Render a structured [`Select`] into a statement, binding condition
    /// values in placeholder order.
    fn render_select(&self, select: &Select) -> Statement {
        let mut statement = Statement::default();
        write_select(self, select, &mut statement);
        statement
    }

    // ------------------------------------------------------------------
    // DML
    // ------------------------------------------------------------------

    /// Clause appended to an `INSERT` so it yields the generated key.
    fn insert_returning_clause(&self, _pk_field: &str) -> Option<String> {
        None
    }

    /// Render an `INSERT` that yields the generated primary key.
    ///
    /// Parameters bind positionally; entity values bind their key. With
    /// no parameters the statement inserts an all-default row.
    fn render_insert(&self, table: &str, pk_field: &str, params: &[(String, Value)]) -> Statement {
        let mut statement = Statement::new(format!("INSERT INTO {} (", self.quote(table)));

        if params.is_empty() {
            statement.sql.push_str(&self.quote(pk_field));
            statement.sql.push_str(") VALUES (DEFAULT)");
        } else {
            let columns: Vec<String> = params.iter().map(|(field, _)| self.quote(field)).collect();
            let placeholders = vec!["?"; params.len()];
            let _ = write!(
                statement.sql,
                "{}) VALUES ({})",
                columns.join(","),
                placeholders.join(",")
            );
            for (_, value) in params {
                statement.push(match value {
                    Value::Entity(entity) => Value::from(entity.key().clone()),
                    other => other.clone(),
                });
            }
        }

        if let Some(returning) = self.insert_returning_clause(pk_field) {
            statement.sql.push_str(&returning);
        }

        statement
    }
}

fn write_select<D: Dialect + ?Sized>(dialect: &D, select: &Select, out: &mut Statement) {
    out.sql.push_str("SELECT ");
    if select.distinct {
        out.sql.push_str("DISTINCT ");
    }

    let items: Vec<String> = select
        .items
        .iter()
        .map(|item| match item {
            SelectItem::Wildcard(None) => "*".to_owned(),
            SelectItem::Wildcard(Some(q)) => format!("{}.*", dialect.quote(q)),
            SelectItem::Column { column, alias } => alias.as_ref().map_or_else(
                || dialect.render_column(column),
                |alias| format!("{} AS {}", dialect.render_column(column), dialect.quote(alias)),
            ),
        })
        .collect();
    out.sql.push_str(&items.join(","));

    out.sql.push_str(" FROM ");
    match &select.from {
        Source::Table(table) => out.sql.push_str(&dialect.quote(table)),
        Source::Union { selects, alias } => {
            out.sql.push('(');
            for (i, sub) in selects.iter().enumerate() {
                if i > 0 {
                    out.sql.push_str(" UNION ");
                }
                write_select(dialect, sub, out);
            }
            out.sql.push_str(") ");
            out.sql.push_str(alias);
        }
    }

    if let Some(join) = &select.join {
        let _ = write!(
            out.sql,
            " INNER JOIN {} ON {} = {}",
            dialect.quote(&join.table),
            dialect.render_column(&join.left),
            dialect.render_column(&join.right)
        );
    }

    if !select.conditions.is_empty() {
        out.sql.push_str(" WHERE ");
        write_conditions(dialect, &select.conditions, " AND ", out);
    }
}

fn write_conditions<D: Dialect + ?Sized>(
    dialect: &D,
    conditions: &[Condition],
    separator: &str,
    out: &mut Statement,
) {
    for (i, condition) in conditions.iter().enumerate() {
        if i > 0 {
            out.sql.push_str(separator);
        }
        match condition {
            Condition::Eq(column, value) => {
                let _ = write!(out.sql, "{} = ?", dialect.render_column(column));
                out.params.push(value.clone());
            }
            Condition::Raw(fragment) => {
                let _ = write!(out.sql, "({fragment})");
            }
            Condition::AnyOf(group) => {
                out.sql.push('(');
                write_conditions(dialect, group, " OR ", out);
                out.sql.push(')');
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use entwine_types::EntityRef;

    use super::*;
    use crate::select::Join;

    fn identity(entity_type: &str) -> String {
        entity_type.to_lowercase()
    }

    #[test]
    fn literals_render_per_kind() {
        let d = AnsiDialect;
        assert_eq!(d.render_scalar(&Value::Null), "NULL");
        assert_eq!(d.render_scalar(&Value::Bool(true)), "1");
        assert_eq!(d.render_scalar(&Value::Bool(false)), "0");
        assert_eq!(d.render_scalar(&Value::Text("O'Neil".into())), "'O''Neil'");
        assert_eq!(d.render_scalar(&Value::Bytes(vec![0xAB, 0x01])), "X'AB01'");

        let ts = NaiveDate::from_ymd_opt(2008, 3, 14)
            .unwrap()
            .and_hms_milli_opt(9, 26, 53, 5)
            .unwrap();
        assert_eq!(d.render_scalar(&Value::Timestamp(ts)), "'2008-03-14 09:26:53.005'");
        assert_eq!(
            d.render_value(&Literal::Function(DatabaseFunction::CurrentTimestamp)),
            "CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn query_clauses_render_in_fixed_order() {
        let query = Query::select("id,name")
            .from_entity("Person")
            .distinct()
            .join("Company", Some("company.id = person.company_id"))
            .where_clause("age > ?", vec![Value::Int(21)])
            .group("name")
            .order("name DESC")
            .limit(10);

        let sql = AnsiDialect.render_query(&query, &identity, false);
        assert_eq!(
            sql,
            "SELECT DISTINCT id,name FROM person JOIN company ON company.id = person.company_id \
             WHERE age > ? GROUP BY name ORDER BY name DESC LIMIT 10"
        );
    }

    #[test]
    fn count_queries_replace_the_projection() {
        let query = Query::select("id").from_table("pen").where_clause("deleted = 0", vec![]);
        assert_eq!(
            AnsiDialect.render_query(&query, &identity, true),
            "SELECT COUNT(*) FROM pen WHERE deleted = 0"
        );
    }

    #[test]
    fn union_selects_bind_parameters_in_placeholder_order() {
        let sub = |col: &str, key: i64| {
            Select::from_table("friendship")
                .item(SelectItem::aliased(ColumnRef::new("friend_b"), "out_map"))
                .item(SelectItem::aliased(ColumnRef::new(col), "in_map"))
                .condition(Condition::Eq(ColumnRef::new(col), Value::Int(key)))
        };
        let outer = Select::from_union(vec![sub("friend_a", 1), sub("friend_c", 2)], "a")
            .distinct()
            .item(SelectItem::aliased(ColumnRef::qualified("a", "out_map"), "out_map"))
            .condition(Condition::AnyOf(vec![Condition::Eq(
                ColumnRef::qualified("a", "kind"),
                Value::Text("person".into()),
            )]));

        let statement = AnsiDialect.render_select(&outer);
        assert_eq!(
            statement.sql,
            "SELECT DISTINCT a.out_map AS out_map FROM (\
             SELECT friend_b AS out_map,friend_a AS in_map FROM friendship WHERE friend_a = ? UNION \
             SELECT friend_b AS out_map,friend_c AS in_map FROM friendship WHERE friend_c = ?) a \
             WHERE (a.kind = ?)"
        );
        assert_eq!(
            statement.params,
            vec![Value::Int(1), Value::Int(2), Value::Text("person".into())]
        );
    }

    #[test]
    fn joins_and_raw_fragments_render() {
        let select = Select::from_table("person_suit")
            .item(SelectItem::Wildcard(Some("suit".into())))
            .inner_join(Join {
                table: "suit".into(),
                left: ColumnRef::qualified("person_suit", "suit_id"),
                right: ColumnRef::qualified("suit", "id"),
            })
            .condition(Condition::Eq(ColumnRef::qualified("person_suit", "person_id"), Value::Int(3)))
            .condition(Condition::Raw("deleted = 0".into()));

        let statement = PostgresDialect.render_select(&select);
        assert_eq!(
            statement.sql,
            "SELECT \"suit\".* FROM \"person_suit\" INNER JOIN \"suit\" ON \
             \"person_suit\".\"suit_id\" = \"suit\".\"id\" WHERE \"person_suit\".\"person_id\" = ? \
             AND (deleted = 0)"
        );
    }

    #[test]
    fn inserts_bind_entity_keys_and_fall_back_to_defaults() {
        let params = vec![
            ("first_name".to_owned(), Value::Text("Daniel".into())),
            ("company_id".to_owned(), Value::Entity(EntityRef::new("Company", 4))),
        ];
        let statement = AnsiDialect.render_insert("person", "id", &params);
        assert_eq!(statement.sql, "INSERT INTO person (first_name,company_id) VALUES (?,?)");
        assert_eq!(statement.params.get(1), Some(&Value::Int(4)));

        let empty = AnsiDialect.render_insert("person", "id", &[]);
        assert_eq!(empty.sql, "INSERT INTO person (id) VALUES (DEFAULT)");
        assert!(empty.params.is_empty());
    }

    #[test]
    fn identifiers_escape_embedded_quotes() {
        assert_eq!(PostgresDialect.quote("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(MySqlDialect.quote("order"), "`order`");
        assert_eq!(AnsiDialect.quote("order"), "order");
        assert_eq!(PostgresDialect.quote("*"), "*");
    }
}
