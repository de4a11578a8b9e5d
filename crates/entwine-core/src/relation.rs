//! Relation traversal.
//!
//! A relation accessor resolves to one of four statement shapes, picked in
//! this order:
//!
//! 1. one-to-many preload: the target declares preload fields and maps
//!    back to us through a single field. One select against the target
//!    table projects the key plus the preload fields.
//! 2. many-to-many preload: as above through a bridge table, joined to
//!    the target table. Both key columns are aliased `{table}__{key}`.
//! 3. the single-field case: one select against the bridge (or target)
//!    table filtered by the mapping field.
//! 4. the union case, for several mapping fields: a `SELECT DISTINCT`
//!    over a `UNION` of one sub-select per field pair, with the
//!    discriminator filter applied in the outer query.
//!
//! Results are cached in the manager's relation cache under the exact
//! field list the statement was built from.

use std::sync::Arc;

use entwine_sql::{ColumnRef, Condition, Join, Select, SelectItem};
use entwine_types::{EntityRef, PrimaryKey, Value};
use tracing::{debug, instrument};

use crate::descriptor::{EntityType, RelationKind, RelationSpec};
use crate::error::EntityError;
use crate::proxy::Entity;
use crate::relations::RelationKey;

const RESULT: &str = "____result";
const OUT: &str = "____out";
const IN: &str = "____in";
const THIS_TYPE: &str = "____this_type";
const THAT_TYPE: &str = "____that_type";
const UNION_ALIAS: &str = "a";

/// Everything a relation statement is built from.
struct Mapping {
    /// The table holding the mapping fields.
    through: Arc<EntityType>,
    /// The type of the returned entities.
    target: Arc<EntityType>,
    /// Fields of `through` referencing the source.
    in_map: Vec<String>,
    /// Fields of `through` naming the results.
    out_map: Vec<String>,
    /// Discriminator column per `in_map` field.
    this_poly: Vec<Option<String>>,
    /// Discriminator column per `out_map` field.
    that_poly: Vec<Option<String>>,
}

/// A built statement and how to read its rows.
struct Plan {
    select: Select,
    return_label: String,
    through_label: Option<String>,
    that_poly_labels: Vec<String>,
    /// Fields to deposit into the results' caches; `*` deposits all.
    deposit: Option<Vec<String>>,
}

impl Entity {
    /// Resolve a relation accessor.
    #[instrument(skip(self, spec), fields(entity = %self.entity_type(), key = %self.key(), target = %spec.target))]
    pub(crate) fn retrieve_relations(&self, spec: &RelationSpec) -> Result<Vec<Self>, EntityError> {
        let manager = self.manager();
        let mapping = self.mapping(spec)?;
        let fields = cache_fields(&mapping, spec.predicate.as_deref());

        let cache_key = RelationKey {
            source: self.to_ref(),
            target_type: mapping.target.name.clone(),
            through_type: mapping.through.name.clone(),
            fields,
        };

        let use_cache = manager.config().relation_cache_enabled;
        if use_cache {
            let hit = manager.relations().get(&cache_key).map(<[EntityRef]>::to_vec);
            if let Some(refs) = hit {
                debug!(results = refs.len(), "relation cache hit");
                return refs.iter().map(|r| manager.peer_ref(r)).collect();
            }
        }

        let plan = self.plan(&mapping, spec.predicate.as_deref());
        let statement = manager.dialect().render_select(&plan.select);
        let rows = manager.query(&statement)?;

        let mut results = Vec::with_capacity(rows.len());
        let mut through_refs = Vec::new();
        for row in &rows {
            let Some(raw) = row.get(&plan.return_label).filter(|v| !v.is_null()) else {
                continue;
            };

            let back_type = plan
                .that_poly_labels
                .iter()
                .find_map(|label| row.get(label).and_then(Value::as_str))
                .map_or_else(
                    || mapping.target.name.clone(),
                    |discriminator| manager.mapper().invert(&mapping.target.name, discriminator),
                );
            let key_kind = manager.entity_type(&back_type)?.key.kind;
            let key = PrimaryKey::from_value(raw, key_kind)?;

            if back_type == self.entity_type() && key == *self.key() {
                continue;
            }

            if let Some(value) = plan
                .through_label
                .as_deref()
                .and_then(|label| row.get(label))
                .filter(|v| !v.is_null())
            {
                let through_key = PrimaryKey::from_value(value, mapping.through.key.kind)?;
                through_refs.push(EntityRef::new(mapping.through.name.as_str(), through_key));
            }

            let entity = manager.peer(&back_type, key)?;
            if let Some(fields) = &plan.deposit {
                let only = (!fields.iter().any(|f| f == "*")).then_some(fields.as_slice());
                entity.proxy().deposit(row, only)?;
            }
            results.push(entity);
        }

        if use_cache {
            let result_refs: Vec<EntityRef> = results.iter().map(Self::to_ref).collect();
            let through = if through_refs.is_empty() {
                result_refs.clone()
            } else {
                through_refs
            };
            manager.relations().put(cache_key, &through, result_refs);
        }

        Ok(results)
    }

    fn mapping(&self, spec: &RelationSpec) -> Result<Mapping, EntityError> {
        let registry = self.manager().registry();
        let this_type = self.entity_type();
        let target = registry.get(&spec.target)?;

        let (through, in_map, out_map) = match &spec.kind {
            RelationKind::OneToOne | RelationKind::OneToMany => {
                let in_map = registry.mapping_fields(&target, this_type);
                let out_map = vec![target.key.field.clone()];
                (Arc::clone(&target), in_map, out_map)
            }
            RelationKind::ManyToMany { through } => {
                let through = registry.get(through)?;
                let in_map = registry.mapping_fields(&through, this_type);
                let out_map = registry.mapping_fields(&through, &target.name);
                (through, in_map, out_map)
            }
        };

        if in_map.is_empty() || out_map.is_empty() {
            return Err(EntityError::Schema(format!(
                "{} has no fields mapping {this_type} to {}",
                through.name, target.name
            )));
        }

        let poly_of = |fields: &[String]| -> Vec<Option<String>> {
            fields
                .iter()
                .map(|name| {
                    through
                        .field_named(name)
                        .and_then(|f| registry.poly_column(f))
                        .map(str::to_owned)
                })
                .collect()
        };
        let this_poly = poly_of(&in_map);
        let that_poly = if matches!(spec.kind, RelationKind::ManyToMany { .. }) {
            poly_of(&out_map)
        } else {
            vec![None]
        };

        Ok(Mapping {
            through,
            target,
            in_map,
            out_map,
            this_poly,
            that_poly,
        })
    }

    /// Pick and build the statement shape.
    fn plan(&self, mapping: &Mapping, predicate: Option<&str>) -> Plan {
        let manager = self.manager();
        let preload = mapping
            .target
            .preload
            .clone()
            .filter(|_| manager.config().preload_enabled);
        let filter = Filter {
            key: Value::from(self.key().clone()),
            discriminator: Value::Text(manager.mapper().convert(self.entity_type())),
            predicate,
        };

        let single = match (
            mapping.in_map.as_slice(),
            mapping.out_map.as_slice(),
            mapping.this_poly.as_slice(),
            mapping.that_poly.as_slice(),
        ) {
            ([in_field], [out_field], [this_poly], [that_poly]) => Some(SingleField {
                in_field,
                out_field,
                this_poly: this_poly.as_deref(),
                that_poly: that_poly.as_deref(),
            }),
            _ => None,
        };
        let Some(single) = single else {
            return union_plan(mapping, &filter);
        };

        match preload {
            Some(preload) if mapping.through.name == mapping.target.name => {
                one_to_many_preload(mapping, &single, &filter, preload)
            }
            Some(preload) => many_to_many_preload(mapping, &single, &filter, preload),
            None => single_plan(mapping, &single, &filter),
        }
    }
}

/// Values every relation statement filters on.
struct Filter<'a> {
    /// Our primary key.
    key: Value,
    /// Our discriminator, for polymorphic mapping fields.
    discriminator: Value,
    predicate: Option<&'a str>,
}

/// The mapping when a single field connects each side.
struct SingleField<'a> {
    in_field: &'a str,
    out_field: &'a str,
    this_poly: Option<&'a str>,
    that_poly: Option<&'a str>,
}

impl SingleField<'_> {
    /// Conditions in bind order, optionally qualified by a table.
    fn conditions(&self, filter: &Filter<'_>, qualifier: Option<&str>) -> Vec<Condition> {
        let column = |name: &str| {
            qualifier.map_or_else(|| ColumnRef::new(name), |q| ColumnRef::qualified(q, name))
        };
        let mut conditions = vec![Condition::Eq(column(self.in_field), filter.key.clone())];
        if let Some(predicate) = filter.predicate {
            conditions.push(Condition::Raw(predicate.to_owned()));
        }
        if let Some(poly) = self.this_poly {
            conditions.push(Condition::Eq(column(poly), filter.discriminator.clone()));
        }
        conditions
    }

    fn that_poly_labels(&self) -> Vec<String> {
        self.that_poly.map(str::to_owned).into_iter().collect()
    }
}

fn wants_everything(preload: &[String]) -> bool {
    preload.iter().any(|f| f == "*")
}

/// One select against the target table, projecting the preload fields.
fn one_to_many_preload(mapping: &Mapping, single: &SingleField<'_>, filter: &Filter<'_>, preload: Vec<String>) -> Plan {
    let mut select = Select::from_table(mapping.through.table.as_str());
    if wants_everything(&preload) {
        select = select.item(SelectItem::Wildcard(None));
    } else {
        select = select.item(SelectItem::column(ColumnRef::new(single.out_field)));
        for field in preload.iter().filter(|f| f.as_str() != single.out_field) {
            select = select.item(SelectItem::column(ColumnRef::new(field.as_str())));
        }
    }
    select.conditions = single.conditions(filter, None);

    Plan {
        select,
        return_label: single.out_field.to_owned(),
        through_label: None,
        that_poly_labels: Vec::new(),
        deposit: Some(preload),
    }
}

/// The bridge table joined to the target table. Both key columns are
/// aliased so they cannot collide with preload fields.
fn many_to_many_preload(mapping: &Mapping, single: &SingleField<'_>, filter: &Filter<'_>, preload: Vec<String>) -> Plan {
    let bridge = mapping.through.table.as_str();
    let bridge_key = mapping.through.key.field.as_str();
    let target = mapping.target.table.as_str();
    let target_key = mapping.target.key.field.as_str();
    let return_label = format!("{target}__{target_key}");
    let through_label = format!("{bridge}__{bridge_key}");

    let mut select = Select::from_table(bridge)
        .item(SelectItem::aliased(
            ColumnRef::qualified(target, target_key),
            return_label.as_str(),
        ))
        .inner_join(Join {
            table: target.to_owned(),
            left: ColumnRef::qualified(bridge, single.out_field),
            right: ColumnRef::qualified(target, target_key),
        });
    if wants_everything(&preload) {
        select = select.item(SelectItem::Wildcard(Some(target.to_owned())));
    } else {
        for field in preload.iter().filter(|f| f.as_str() != target_key) {
            select = select.item(SelectItem::column(ColumnRef::qualified(target, field.as_str())));
        }
    }
    select = select.item(SelectItem::aliased(
        ColumnRef::qualified(bridge, bridge_key),
        through_label.as_str(),
    ));
    if let Some(poly) = single.that_poly {
        select = select.item(SelectItem::column(ColumnRef::qualified(bridge, poly)));
    }
    select.conditions = single.conditions(filter, Some(bridge));

    Plan {
        select,
        return_label,
        through_label: Some(through_label),
        that_poly_labels: single.that_poly_labels(),
        deposit: Some(preload),
    }
}

/// One select against the table holding the mapping field.
fn single_plan(mapping: &Mapping, single: &SingleField<'_>, filter: &Filter<'_>) -> Plan {
    let mut select = Select::from_table(mapping.through.table.as_str())
        .item(SelectItem::column(ColumnRef::new(single.out_field)));
    let through_label = (mapping.through.name != mapping.target.name).then(|| mapping.through.key.field.clone());
    if let Some(label) = &through_label {
        select = select.item(SelectItem::column(ColumnRef::new(label.as_str())));
    }
    if let Some(poly) = single.that_poly {
        select = select.item(SelectItem::column(ColumnRef::new(poly)));
    }
    select.conditions = single.conditions(filter, None);

    Plan {
        select,
        return_label: single.out_field.to_owned(),
        through_label,
        that_poly_labels: single.that_poly_labels(),
        deposit: None,
    }
}

/// One sub-select per `(out, in)` field pair, wrapped in a distinct outer
/// select. Discriminators are carried through the union under fixed
/// aliases when every field of a side has one.
fn union_plan(mapping: &Mapping, filter: &Filter<'_>) -> Plan {
    let this_polys: Option<Vec<&str>> = mapping.this_poly.iter().map(Option::as_deref).collect();
    let that_polys: Option<Vec<&str>> = mapping.that_poly.iter().map(Option::as_deref).collect();

    let mut subselects = Vec::with_capacity(mapping.out_map.len().saturating_mul(mapping.in_map.len()));
    for (out_index, out_field) in mapping.out_map.iter().enumerate() {
        for (in_index, in_field) in mapping.in_map.iter().enumerate() {
            let mut sub = Select::from_table(mapping.through.table.as_str())
                .item(SelectItem::aliased(ColumnRef::new(out_field.as_str()), OUT))
                .item(SelectItem::aliased(ColumnRef::new(in_field.as_str()), IN));
            if let Some(poly) = this_polys.as_ref().and_then(|p| p.get(in_index)) {
                sub = sub.item(SelectItem::aliased(ColumnRef::new(*poly), THIS_TYPE));
            }
            if let Some(poly) = that_polys.as_ref().and_then(|p| p.get(out_index)) {
                sub = sub.item(SelectItem::aliased(ColumnRef::new(*poly), THAT_TYPE));
            }
            sub = sub.condition(Condition::Eq(ColumnRef::new(in_field.as_str()), filter.key.clone()));
            if let Some(predicate) = filter.predicate {
                sub = sub.condition(Condition::Raw(predicate.to_owned()));
            }
            if this_polys.is_none() {
                let poly = mapping.this_poly.get(in_index).and_then(Option::as_deref);
                if let Some(poly) = poly {
                    sub = sub.condition(Condition::Eq(ColumnRef::new(poly), filter.discriminator.clone()));
                }
            }
            subselects.push(sub);
        }
    }

    let mut select = Select::from_union(subselects, UNION_ALIAS)
        .distinct()
        .item(SelectItem::aliased(ColumnRef::qualified(UNION_ALIAS, OUT), RESULT));
    let mut that_poly_labels = Vec::new();
    if that_polys.is_some() {
        select = select.item(SelectItem::column(ColumnRef::qualified(UNION_ALIAS, THAT_TYPE)));
        that_poly_labels.push(THAT_TYPE.to_owned());
    }
    if this_polys.is_some() {
        select = select.condition(Condition::Eq(
            ColumnRef::qualified(UNION_ALIAS, THIS_TYPE),
            filter.discriminator.clone(),
        ));
    }

    Plan {
        select,
        return_label: RESULT.to_owned(),
        through_label: None,
        that_poly_labels,
        deposit: None,
    }
}

/// The field list a relation result is cached under: the out fields, the
/// in fields unless they are the target key, and every column the
/// predicate compares.
fn cache_fields(mapping: &Mapping, predicate: Option<&str>) -> Vec<String> {
    let mut fields = mapping.out_map.clone();
    let in_is_key = mapping
        .in_map
        .first()
        .is_some_and(|f| f.trim().eq_ignore_ascii_case(&mapping.target.key.field));
    if !in_is_key {
        fields.extend(mapping.in_map.iter().cloned());
    }
    fields.extend(predicate.map(where_columns).unwrap_or_default());
    fields
}

/// Columns a raw predicate compares: every word directly followed by
/// `=`, `>`, `<`, `LIKE` or `IS`.
fn where_columns(predicate: &str) -> Vec<String> {
    const OPERATORS: [&str; 5] = ["=", ">", "<", "LIKE", "IS"];
    let is_word = |c: char| c.is_alphanumeric() || c == '_';

    let mut columns = Vec::new();
    let mut rest = predicate;
    while let Some(start) = rest.find(is_word) {
        let word_and_tail = rest.get(start..).unwrap_or_default();
        let end = word_and_tail.find(|c: char| !is_word(c)).unwrap_or(word_and_tail.len());
        let (word, tail) = word_and_tail.split_at(end);
        if OPERATORS.iter().any(|op| tail.trim_start().starts_with(op)) {
            columns.push(word.to_owned());
        }
        rest = tail;
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_columns_are_extracted() {
        assert_eq!(where_columns("deleted = 0"), ["deleted"]);
        assert_eq!(
            where_columns("name LIKE 'a%' AND age>3 AND boss IS NULL"),
            ["name", "age", "boss"]
        );
        assert!(where_columns("").is_empty());
        assert!(where_columns("active").is_empty());
    }
}
