//! A structured `SELECT` model.
//!
//! Relation traversal needs four closely related statement shapes: a plain
//! filtered select, a preload select, an `INNER JOIN` between a bridge and
//! a target table, and a `SELECT DISTINCT` over a `UNION` of sub-selects.
//! All four are expressed with these types and rendered by
//! [`Dialect::render_select`](crate::Dialect::render_select), which quotes
//! identifiers and collects parameters in placeholder order.

use entwine_types::Value;

/// A possibly table-qualified column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Table or alias qualifier.
    pub qualifier: Option<String>,
    /// Column name.
    pub name: String,
}

impl ColumnRef {
    /// An unqualified column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }

    /// A column qualified by a table or alias.
    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }
}

/// One projected item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectItem {
    /// `*` or `qualifier.*`.
    Wildcard(Option<String>),
    /// A column with an optional alias.
    Column {
        /// The column.
        column: ColumnRef,
        /// `AS` alias.
        alias: Option<String>,
    },
}

impl SelectItem {
    /// A bare column.
    pub const fn column(column: ColumnRef) -> Self {
        Self::Column {
            column,
            alias: None,
        }
    }

    /// An aliased column.
    pub fn aliased(column: ColumnRef, alias: impl Into<String>) -> Self {
        Self::Column {
            column,
            alias: Some(alias.into()),
        }
    }
}

/// The `FROM` source.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// A table.
    Table(String),
    /// A parenthesised `UNION` of sub-selects with an alias.
    Union {
        /// The sub-selects, joined by `UNION`.
        selects: Vec<Select>,
        /// Alias of the derived table.
        alias: String,
    },
}

/// An `INNER JOIN` on column equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Joined table.
    pub table: String,
    /// Left side of the `ON` equality.
    pub left: ColumnRef,
    /// Right side of the `ON` equality.
    pub right: ColumnRef,
}

/// A `WHERE` condition. Conditions of a select are joined with `AND`.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = ?` with the bound value.
    Eq(ColumnRef, Value),
    /// A raw fragment, rendered in parentheses.
    Raw(String),
    /// A parenthesised `OR` group.
    AnyOf(Vec<Self>),
}

/// A structured `SELECT` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    /// `SELECT DISTINCT`.
    pub distinct: bool,
    /// Projection.
    pub items: Vec<SelectItem>,
    /// `FROM` source.
    pub from: Source,
    /// Optional `INNER JOIN`.
    pub join: Option<Join>,
    /// `WHERE` conditions.
    pub conditions: Vec<Condition>,
}

impl Select {
    /// Start a select over a table.
    pub fn from_table(table: impl Into<String>) -> Self {
        Self {
            distinct: false,
            items: Vec::new(),
            from: Source::Table(table.into()),
            join: None,
            conditions: Vec::new(),
        }
    }

    /// Start a select over a `UNION` of sub-selects.
    pub fn from_union(selects: Vec<Self>, alias: impl Into<String>) -> Self {
        Self {
            distinct: false,
            items: Vec::new(),
            from: Source::Union {
                selects,
                alias: alias.into(),
            },
            join: None,
            conditions: Vec::new(),
        }
    }

    /// Add a projected item.
    #[must_use]
    pub fn item(mut self, item: SelectItem) -> Self {
        self.items.push(item);
        self
    }

    /// Add a condition.
    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set the join.
    #[must_use]
    pub fn inner_join(mut self, join: Join) -> Self {
        self.join = Some(join);
        self
    }

    /// Set `DISTINCT`.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}
