//! Parser for rendered DDL.
//!
//! Reads back what [`Dialect::render_field`] and [`Dialect::render_table`]
//! produce so schema rendering can be checked for round-trip fidelity:
//! parsing a rendered field yields the name, type, precision, scale,
//! default, auto-increment, not-null, on-update and unique flags that went
//! in (modulo the dialect's precision rules).
//!
//! The grammar is exactly the rendered one, not general SQL.

use entwine_types::{DatabaseFunction, Value};

use crate::ddl::{DdlField, DdlForeignKey, DdlTable, Literal};
use crate::dialect::Dialect;
use crate::error::SqlError;

/// Parse one rendered column definition.
pub fn parse_field_clause(dialect: &dyn Dialect, clause: &str) -> Result<DdlField, SqlError> {
    let mut tokens = Tokens::new(clause)?;

    let name = unquote(&tokens.require("column name")?);
    let (type_name, precision, scale) = split_type(clause, &tokens.require("column type")?)?;

    let type_name = if type_name.eq_ignore_ascii_case("DOUBLE") && tokens.peek_is("PRECISION") {
        tokens.advance();
        "DOUBLE PRECISION".to_owned()
    } else {
        type_name
    };

    let serial = type_name.eq_ignore_ascii_case("SERIAL") || type_name.eq_ignore_ascii_case("BIGSERIAL");
    let sql_type = dialect
        .parse_type_name(&type_name)
        .ok_or_else(|| SqlError::UnknownType {
            dialect: dialect.name(),
            name: type_name.clone(),
        })?;

    let mut field = DdlField::new(name, sql_type).precision(precision).scale(scale);
    field.auto_increment = serial;

    while let Some(keyword) = tokens.pop() {
        match keyword.to_ascii_uppercase().as_str() {
            "GENERATED" => {
                for expected in ["BY", "DEFAULT", "AS", "IDENTITY"] {
                    tokens.keyword(clause, expected)?;
                }
                field.auto_increment = true;
            }
            "AUTO_INCREMENT" => field.auto_increment = true,
            "DEFAULT" => {
                let literal = tokens.require("default value")?;
                field.default = Some(parse_literal(clause, &literal)?);
            }
            "NOT" => {
                tokens.keyword(clause, "NULL")?;
                field.not_null = true;
            }
            "ON" => {
                tokens.keyword(clause, "UPDATE")?;
                let literal = tokens.require("on-update value")?;
                field.on_update = Some(parse_literal(clause, &literal)?);
            }
            "UNIQUE" => field.unique = true,
            other => return Err(unparseable(clause, format!("unexpected token `{other}`"))),
        }
    }

    Ok(field)
}

/// Parse a rendered `CREATE TABLE` statement.
pub fn parse_create_table(dialect: &dyn Dialect, sql: &str) -> Result<DdlTable, SqlError> {
    let sql = sql.trim();
    let head = sql.get(..13).ok_or(SqlError::NotCreateTable)?;
    if !head.eq_ignore_ascii_case("CREATE TABLE ") {
        return Err(SqlError::NotCreateTable);
    }
    let rest = sql.get(13..).ok_or(SqlError::NotCreateTable)?;

    let open = rest.find('(').ok_or(SqlError::NotCreateTable)?;
    let close = rest.rfind(')').ok_or(SqlError::NotCreateTable)?;
    let name = rest.get(..open).ok_or(SqlError::NotCreateTable)?;
    let body = rest
        .get(open.saturating_add(1)..close)
        .ok_or(SqlError::NotCreateTable)?;

    let mut table = DdlTable::new(unquote(name.trim()));
    let mut primary_keys = Vec::new();

    for clause in body.split(",\n").map(str::trim).filter(|c| !c.is_empty()) {
        let upper = clause.to_ascii_uppercase();
        if upper.starts_with("PRIMARY KEY") {
            primary_keys.extend(parenthesised(clause, clause)?.split(',').map(|k| unquote(k.trim())));
        } else if upper.starts_with("FOREIGN KEY") {
            table.foreign_keys.push(parse_foreign_key(clause)?);
        } else {
            table.fields.push(parse_field_clause(dialect, clause)?);
        }
    }

    for field in &mut table.fields {
        field.primary_key = primary_keys.contains(&field.name);
    }

    Ok(table)
}

fn parse_foreign_key(clause: &str) -> Result<DdlForeignKey, SqlError> {
    let upper = clause.to_ascii_uppercase();
    let split = upper
        .find(" REFERENCES ")
        .ok_or_else(|| unparseable(clause, "missing REFERENCES"))?;
    let (local, foreign) = (
        clause.get(..split).unwrap_or_default(),
        clause.get(split.saturating_add(12)..).unwrap_or_default(),
    );

    let field = unquote(parenthesised(clause, local)?.trim());
    let open = foreign
        .find('(')
        .ok_or_else(|| unparseable(clause, "missing referenced column"))?;
    let table = unquote(foreign.get(..open).unwrap_or_default().trim());
    let foreign_field = unquote(parenthesised(clause, foreign)?.trim());

    Ok(DdlForeignKey::new(field, table, foreign_field))
}

/// The text between the first `(` and the last `)` of `text`.
fn parenthesised<'a>(clause: &str, text: &'a str) -> Result<&'a str, SqlError> {
    let open = text.find('(');
    let close = text.rfind(')');
    match (open, close) {
        (Some(open), Some(close)) if open < close => text
            .get(open.saturating_add(1)..close)
            .ok_or_else(|| unparseable(clause, "bad parentheses")),
        _ => Err(unparseable(clause, "missing parentheses")),
    }
}

/// Split `VARCHAR(255)` or `DECIMAL(10,2)` into name, precision and scale.
fn split_type(clause: &str, token: &str) -> Result<(String, u32, u32), SqlError> {
    let Some(open) = token.find('(') else {
        return Ok((token.to_owned(), 0, 0));
    };
    let name = token.get(..open).unwrap_or_default().to_owned();
    let args = parenthesised(clause, token)?;

    let mut numbers = args.split(',').map(|n| {
        n.trim()
            .parse::<u32>()
            .map_err(|e| unparseable(clause, format!("bad precision `{n}`: {e}")))
    });
    let precision = numbers.next().transpose()?.unwrap_or(0);
    let scale = numbers.next().transpose()?.unwrap_or(0);
    Ok((name, precision, scale))
}

fn parse_literal(clause: &str, token: &str) -> Result<Literal, SqlError> {
    if let Some(body) = token.strip_prefix('\'') {
        let text = body
            .strip_suffix('\'')
            .ok_or_else(|| unparseable(clause, "unterminated string literal"))?;
        return Ok(Literal::Value(Value::Text(text.replace("''", "'"))));
    }

    let upper = token.to_ascii_uppercase();
    match upper.as_str() {
        "NULL" => return Ok(Literal::Value(Value::Null)),
        "TRUE" => return Ok(Literal::Value(Value::Bool(true))),
        "FALSE" => return Ok(Literal::Value(Value::Bool(false))),
        _ => {}
    }

    if let Ok(function) = upper.parse::<DatabaseFunction>() {
        return Ok(Literal::Function(function));
    }
    if let Ok(int) = token.parse::<i64>() {
        return Ok(Literal::Value(Value::Int(int)));
    }
    if let Ok(float) = token.parse::<f64>() {
        return Ok(Literal::Value(Value::Float(float)));
    }

    Err(unparseable(clause, format!("unrecognised literal `{token}`")))
}

/// Strip identifier quotes and undo quote doubling.
fn unquote(identifier: &str) -> String {
    for quote in ['"', '`'] {
        if let Some(inner) = identifier
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.replace(&format!("{quote}{quote}"), &quote.to_string());
        }
    }
    identifier.to_owned()
}

fn unparseable(clause: &str, reason: impl Into<String>) -> SqlError {
    SqlError::UnparseableField {
        clause: clause.to_owned(),
        reason: reason.into(),
    }
}

/// Whitespace-separated tokens that keep quoted sections intact.
struct Tokens {
    items: Vec<String>,
    pos: usize,
}

impl Tokens {
    fn new(clause: &str) -> Result<Self, SqlError> {
        let mut items = Vec::new();
        let mut current = String::new();
        let mut quote: Option<char> = None;
        let mut chars = clause.chars().peekable();

        while let Some(c) = chars.next() {
            match quote {
                Some(q) if c == q => {
                    current.push(c);
                    if chars.peek() == Some(&q) {
                        current.push(q);
                        chars.next();
                    } else {
                        quote = None;
                    }
                }
                None if c == '\'' || c == '"' || c == '`' => {
                    quote = Some(c);
                    current.push(c);
                }
                None if c.is_whitespace() => {
                    if !current.is_empty() {
                        items.push(core::mem::take(&mut current));
                    }
                }
                _ => current.push(c),
            }
        }

        if quote.is_some() {
            return Err(unparseable(clause, "unterminated quote"));
        }
        if !current.is_empty() {
            items.push(current);
        }
        Ok(Self { items, pos: 0 })
    }

    fn pop(&mut self) -> Option<String> {
        let item = self.items.get(self.pos).cloned();
        if item.is_some() {
            self.advance();
        }
        item
    }

    const fn advance(&mut self) {
        self.pos = self.pos.saturating_add(1);
    }

    fn peek_is(&self, keyword: &str) -> bool {
        self.items
            .get(self.pos)
            .is_some_and(|t| t.eq_ignore_ascii_case(keyword))
    }

    fn require(&mut self, what: &str) -> Result<String, SqlError> {
        let clause = self.items.join(" ");
        self.pop()
            .ok_or_else(|| unparseable(&clause, format!("missing {what}")))
    }

    fn keyword(&mut self, clause: &str, expected: &str) -> Result<(), SqlError> {
        if self.peek_is(expected) {
            self.advance();
            Ok(())
        } else {
            Err(unparseable(clause, format!("expected `{expected}`")))
        }
    }
}
