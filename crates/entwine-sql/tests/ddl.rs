//! DDL rendering across dialects, checked by parsing the output back.

#![allow(clippy::unwrap_used)]

use entwine_sql::{
    AnsiDialect, DdlField, DdlForeignKey, DdlTable, Dialect, Literal, MySqlDialect, PostgresDialect,
    parse_create_table, parse_field_clause,
};
use entwine_types::{DatabaseFunction, SqlType, Value};

fn person() -> DdlTable {
    DdlTable::new("person")
        .field(DdlField::new("id", SqlType::Integer).not_null().primary_key())
        .field(DdlField::new("age", SqlType::Integer).precision(20).default_value(Value::Int(0)))
        .field(DdlField::new("url", SqlType::VarChar).precision(255).unique())
        .field(DdlField::new("company_id", SqlType::Integer))
        .foreign_key(DdlForeignKey::new("company_id", "company", "id"))
}

#[test]
fn person_table_renders_fields_then_keys() {
    let sql = AnsiDialect.render_table(&person());
    assert_eq!(
        sql,
        "CREATE TABLE person (\n\
         \x20   id INTEGER NOT NULL,\n\
         \x20   age INTEGER(20) DEFAULT 0,\n\
         \x20   url VARCHAR(255) UNIQUE,\n\
         \x20   company_id INTEGER,\n\
         \x20   FOREIGN KEY (company_id) REFERENCES company(id),\n\
         \x20   PRIMARY KEY(id)\n\
         )"
    );
    assert!(!sql.contains(",\n)"));
    assert_eq!(sql.matches("PRIMARY KEY").count(), 1);
}

#[test]
fn person_table_round_trips_through_every_dialect() {
    let dialects: [&dyn Dialect; 3] = [&AnsiDialect, &PostgresDialect, &MySqlDialect];
    for dialect in dialects {
        let parsed = parse_create_table(dialect, &dialect.render_table(&person())).unwrap();

        assert_eq!(parsed.name, "person", "{}", dialect.name());
        let names: Vec<&str> = parsed.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "age", "url", "company_id"], "{}", dialect.name());
        assert_eq!(parsed.primary_keys().collect::<Vec<_>>(), ["id"]);
        assert_eq!(parsed.foreign_keys, vec![DdlForeignKey::new("company_id", "company", "id")]);
    }
}

#[test]
fn field_clauses_round_trip() {
    let fields = [
        DdlField::new("name", SqlType::VarChar).precision(128).not_null().unique(),
        DdlField::new("price", SqlType::Decimal).precision(12).scale(4).default_value(Value::Int(0)),
        DdlField::new("motto", SqlType::VarChar)
            .precision(64)
            .default_value(Value::Text("don't panic, ever".into())),
        DdlField::new("modified", SqlType::Timestamp)
            .not_null()
            .default_value(DatabaseFunction::CurrentTimestamp),
        DdlField::new("id", SqlType::BigInt).auto_increment().not_null(),
    ];

    let dialects: [&dyn Dialect; 3] = [&AnsiDialect, &PostgresDialect, &MySqlDialect];
    for dialect in dialects {
        for field in &fields {
            let clause = dialect.render_field(field);
            let parsed = parse_field_clause(dialect, &clause).unwrap();

            assert_eq!(parsed.name, field.name, "{clause}");
            assert_eq!(parsed.sql_type, field.sql_type, "{clause}");
            assert_eq!(parsed.not_null, field.not_null, "{clause}");
            assert_eq!(parsed.unique, field.unique, "{clause}");
            assert_eq!(parsed.auto_increment, field.auto_increment, "{clause}");
            if dialect.consider_precision(field) {
                assert_eq!((parsed.precision, parsed.scale), (field.precision, field.scale), "{clause}");
            }
            if !field.auto_increment {
                assert_eq!(parsed.default, field.default, "{clause}");
            }
        }
    }
}

#[test]
fn on_update_is_inline_except_on_postgres() {
    let field = DdlField::new("modified", SqlType::Timestamp).on_update(DatabaseFunction::CurrentTimestamp);

    for dialect in [&AnsiDialect as &dyn Dialect, &MySqlDialect] {
        let parsed = parse_field_clause(dialect, &dialect.render_field(&field)).unwrap();
        assert_eq!(parsed.on_update, Some(Literal::Function(DatabaseFunction::CurrentTimestamp)));
    }

    let parsed = parse_field_clause(&PostgresDialect, &PostgresDialect.render_field(&field)).unwrap();
    assert_eq!(parsed.on_update, None);
}
