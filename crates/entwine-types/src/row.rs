//! Result rows.

use crate::value::Value;

/// One result row: an ordered list of `(column label, value)` pairs.
///
/// Lookup by label is case-insensitive, matching how drivers report
/// unquoted identifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub const fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Append a column, builder style.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    /// Append a column.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push((column.into(), value.into()));
    }

    /// Look up a column by label.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    /// Look up a column by position.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.columns.get(index).map(|(_, value)| value)
    }

    /// Iterate over `(label, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of columns.
    pub const fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub const fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let row = Row::new().with("firstName", "Daniel").with("ID", 3);
        assert_eq!(row.get("FIRSTNAME"), Some(&Value::Text("Daniel".into())));
        assert_eq!(row.get("id"), Some(&Value::Int(3)));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn positional_lookup_follows_column_order() {
        let row: Row = [("a", Value::Int(1)), ("b", Value::Int(2))].into_iter().collect();
        assert_eq!(row.get_index(1), Some(&Value::Int(2)));
        assert_eq!(row.len(), 2);
    }
}
