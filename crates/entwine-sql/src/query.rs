//! The abstract query descriptor.
//!
//! A [`Query`] names its target either as a literal table or as an entity
//! type that the caller's [`TableResolver`](crate::TableResolver) maps to a
//! table. Predicate, grouping and ordering are raw SQL fragments; the
//! predicate's `?` placeholders are bound from [`Query::params`] in order.

use entwine_types::Value;

/// Target of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTarget {
    /// A literal table name.
    Table(String),
    /// An entity type, resolved to a table at render time.
    Entity(String),
}

/// An abstract `SELECT` description.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    target: Option<QueryTarget>,
    fields: Vec<String>,
    joins: Vec<(String, Option<String>)>,
    where_clause: Option<String>,
    params: Vec<Value>,
    group_clause: Option<String>,
    order_clause: Option<String>,
    limit: Option<u64>,
    distinct: bool,
}

impl Default for Query {
    fn default() -> Self {
        Self::select("*")
    }
}

impl Query {
    /// Start a query projecting the given comma-separated field list.
    pub fn select(fields: &str) -> Self {
        Self {
            target: None,
            fields: fields
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_owned)
                .collect(),
            joins: Vec::new(),
            where_clause: None,
            params: Vec::new(),
            group_clause: None,
            order_clause: None,
            limit: None,
            distinct: false,
        }
    }

    /// Target a literal table.
    #[must_use]
    pub fn from_table(mut self, table: impl Into<String>) -> Self {
        self.target = Some(QueryTarget::Table(table.into()));
        self
    }

    /// Target an entity type's table.
    #[must_use]
    pub fn from_entity(mut self, entity_type: impl Into<String>) -> Self {
        self.target = Some(QueryTarget::Entity(entity_type.into()));
        self
    }

    /// Target an entity type unless a target is already set.
    #[must_use]
    pub fn or_from_entity(mut self, entity_type: &str) -> Self {
        if self.target.is_none() {
            self.target = Some(QueryTarget::Entity(entity_type.to_owned()));
        }
        self
    }

    /// Join an entity type's table, optionally with an `ON` condition.
    #[must_use]
    pub fn join(mut self, entity_type: impl Into<String>, on: Option<&str>) -> Self {
        self.joins.push((entity_type.into(), on.map(str::to_owned)));
        self
    }

    /// Set the predicate and its positional parameters.
    #[must_use]
    pub fn where_clause(mut self, clause: impl Into<String>, params: Vec<Value>) -> Self {
        self.where_clause = Some(clause.into());
        self.params = params;
        self
    }

    /// Set the `GROUP BY` fragment.
    #[must_use]
    pub fn group(mut self, clause: impl Into<String>) -> Self {
        self.group_clause = Some(clause.into());
        self
    }

    /// Set the `ORDER BY` fragment.
    #[must_use]
    pub fn order(mut self, clause: impl Into<String>) -> Self {
        self.order_clause = Some(clause.into());
        self
    }

    /// Limit the number of rows.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Select distinct rows only.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Replace the projection.
    #[must_use]
    pub fn fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    /// The target, if set.
    pub const fn target(&self) -> Option<&QueryTarget> {
        self.target.as_ref()
    }

    /// Projected fields.
    pub fn projection(&self) -> &[String] {
        &self.fields
    }

    /// Joined entity types with optional `ON` conditions.
    pub fn joins(&self) -> &[(String, Option<String>)] {
        &self.joins
    }

    /// The predicate fragment.
    pub fn predicate(&self) -> Option<&str> {
        self.where_clause.as_deref()
    }

    /// Parameters bound to the predicate.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// The `GROUP BY` fragment.
    pub fn group_clause(&self) -> Option<&str> {
        self.group_clause.as_deref()
    }

    /// The `ORDER BY` fragment.
    pub fn order_clause(&self) -> Option<&str> {
        self.order_clause.as_deref()
    }

    /// The row limit.
    pub const fn row_limit(&self) -> Option<u64> {
        self.limit
    }

    /// Whether `DISTINCT` is requested.
    pub const fn is_distinct(&self) -> bool {
        self.distinct
    }
}
