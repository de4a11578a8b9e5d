//! SQL text paired with positional parameters.

use entwine_types::Value;

/// A statement ready for execution: SQL text using `?` placeholders and the
/// values bound to them, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    /// SQL text.
    pub sql: String,
    /// Positional parameters, one per `?`.
    pub params: Vec<Value>,
}

impl Statement {
    /// Create a statement with no parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Bind the next positional parameter, builder style.
    #[must_use]
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Bind the next positional parameter.
    pub fn push(&mut self, value: impl Into<Value>) {
        self.params.push(value.into());
    }

    /// Whether the SQL text starts with `SELECT`.
    pub fn is_select(&self) -> bool {
        self.sql
            .trim_start()
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("SELECT"))
    }
}

impl core::fmt::Display for Statement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.sql)
    }
}
