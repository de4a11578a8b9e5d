//! The relation result cache.
//!
//! Shared by every handle of an [`EntityManager`](crate::EntityManager).
//! An entry maps `(source, target type, through type, fields)` to the
//! ordered list of related entities. The field list is part of the key:
//! a preload query selects more columns than a plain one and the two must
//! not share results.
//!
//! Three indexes support invalidation: by through type (any row of that
//! type may have changed membership), by through entity (that row is gone)
//! and by `(through entity, field)` (that entity's mapping field changed).

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use entwine_types::EntityRef;

/// Identity of one cached relation result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationKey {
    /// The entity the relation was traversed from.
    pub source: EntityRef,
    /// The type of the returned entities.
    pub target_type: String,
    /// The type holding the mapping fields (the target for one-to-many).
    pub through_type: String,
    /// The ordered field list the query was built from.
    pub fields: Vec<String>,
}

#[derive(Debug)]
struct Cached {
    results: Vec<EntityRef>,
    through: Vec<EntityRef>,
}

/// Cross-entity cache of relation traversal results.
#[derive(Debug, Default)]
pub struct RelationsCache {
    entries: HashMap<RelationKey, Cached>,
    by_type: HashMap<String, HashSet<RelationKey>>,
    by_through: HashMap<EntityRef, HashSet<RelationKey>>,
    by_field: HashMap<(EntityRef, String), HashSet<RelationKey>>,
}

/// Remove `key` from the set under `slot`, dropping the set once empty.
fn unlink<K: Eq + core::hash::Hash>(index: &mut HashMap<K, HashSet<RelationKey>>, slot: K, key: &RelationKey) {
    if let Entry::Occupied(mut keys) = index.entry(slot) {
        keys.get_mut().remove(key);
        if keys.get().is_empty() {
            keys.remove();
        }
    }
}

impl RelationsCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached result for a key.
    pub fn get(&self, key: &RelationKey) -> Option<&[EntityRef]> {
        self.entries.get(key).map(|entry| entry.results.as_slice())
    }

    /// Store a result, replacing any previous entry for the key.
    ///
    /// `through` lists the entities whose fields produced the result: the
    /// bridge rows for many-to-many, the results themselves otherwise.
    pub fn put(&mut self, key: RelationKey, through: &[EntityRef], results: Vec<EntityRef>) {
        self.invalidate(&key);

        self.by_type
            .entry(key.through_type.clone())
            .or_default()
            .insert(key.clone());

        for entity in through {
            self.by_through
                .entry(entity.clone())
                .or_default()
                .insert(key.clone());
            for field in &key.fields {
                self.by_field
                    .entry((entity.clone(), field.clone()))
                    .or_default()
                    .insert(key.clone());
            }
        }

        self.entries.insert(
            key,
            Cached {
                results,
                through: through.to_vec(),
            },
        );
    }

    /// Invalidate every entry whose through type is one of `types`.
    pub fn remove_types(&mut self, types: &[String]) {
        for entity_type in types {
            let keys = self.by_type.get(entity_type).cloned().unwrap_or_default();
            for key in &keys {
                self.invalidate(key);
            }
        }
    }

    /// Invalidate every entry reachable through any of `entities`.
    pub fn remove_through(&mut self, entities: &[EntityRef]) {
        for entity in entities {
            let keys = self.by_through.get(entity).cloned().unwrap_or_default();
            for key in &keys {
                self.invalidate(key);
            }
        }
    }

    /// Invalidate every entry built from any of `fields` of `entity`.
    pub fn remove_fields(&mut self, entity: &EntityRef, fields: &[String]) {
        for field in fields {
            let keys = self
                .by_field
                .get(&(entity.clone(), field.clone()))
                .cloned()
                .unwrap_or_default();
            for key in &keys {
                self.invalidate(key);
            }
        }
    }

    /// Drop one entry along with every index slot pointing at it.
    fn invalidate(&mut self, key: &RelationKey) {
        let Some(entry) = self.entries.remove(key) else {
            return;
        };
        unlink(&mut self.by_type, key.through_type.clone(), key);
        for entity in entry.through {
            for field in &key.fields {
                unlink(&mut self.by_field, (entity.clone(), field.clone()), key);
            }
            unlink(&mut self.by_through, entity, key);
        }
    }

    /// Drop everything.
    pub fn flush(&mut self) {
        self.entries.clear();
        self.by_type.clear();
        self.by_through.clear();
        self.by_field.clear();
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pens_of(person: i64, fields: &[&str]) -> RelationKey {
        RelationKey {
            source: EntityRef::new("Person", person),
            target_type: "Pen".into(),
            through_type: "Pen".into(),
            fields: fields.iter().map(|f| (*f).to_owned()).collect(),
        }
    }

    #[test]
    fn field_lists_are_part_of_the_key() {
        let mut cache = RelationsCache::new();
        let pens = vec![EntityRef::new("Pen", 1), EntityRef::new("Pen", 2)];
        cache.put(pens_of(1, &["id", "person_id"]), &pens, pens.clone());

        assert_eq!(cache.get(&pens_of(1, &["id", "person_id"])), Some(pens.as_slice()));
        assert_eq!(cache.get(&pens_of(1, &["id", "person_id", "deleted"])), None);
    }

    #[test]
    fn saving_a_mapping_field_invalidates_entries() {
        let mut cache = RelationsCache::new();
        let pens = vec![EntityRef::new("Pen", 1), EntityRef::new("Pen", 2)];
        cache.put(pens_of(1, &["id", "person_id"]), &pens, pens.clone());

        cache.remove_fields(&EntityRef::new("Pen", 2), &["color".to_owned()]);
        assert_eq!(cache.len(), 1);

        cache.remove_fields(&EntityRef::new("Pen", 2), &["person_id".to_owned()]);
        assert!(cache.is_empty());
    }

    #[test]
    fn through_types_invalidate_entries() {
        let mut cache = RelationsCache::new();
        let pens = vec![EntityRef::new("Pen", 1)];
        cache.put(pens_of(1, &["id", "person_id"]), &pens, pens.clone());
        cache.put(pens_of(2, &["id", "person_id"]), &[], Vec::new());

        cache.remove_types(&["Company".to_owned()]);
        assert_eq!(cache.len(), 2);

        cache.remove_types(&["Pen".to_owned()]);
        assert!(cache.is_empty());
    }

    #[test]
    fn removed_through_entities_invalidate_entries() {
        let mut cache = RelationsCache::new();
        let bridge = vec![EntityRef::new("PersonSuit", 10), EntityRef::new("PersonSuit", 11)];
        let suits = vec![EntityRef::new("Suit", 1), EntityRef::new("Suit", 2)];
        let key = RelationKey {
            source: EntityRef::new("Person", 1),
            target_type: "Suit".into(),
            through_type: "PersonSuit".into(),
            fields: vec!["suit_id".into(), "person_id".into()],
        };
        cache.put(key, &bridge, suits);

        cache.remove_through(&[EntityRef::new("PersonSuit", 12)]);
        assert_eq!(cache.len(), 1);

        cache.remove_through(&[EntityRef::new("PersonSuit", 11)]);
        assert!(cache.is_empty());
    }

    fn assert_unindexed(cache: &RelationsCache) {
        assert!(cache.is_empty());
        assert!(cache.by_type.is_empty());
        assert!(cache.by_through.is_empty());
        assert!(cache.by_field.is_empty());
    }

    #[test]
    fn invalidation_clears_every_index() {
        let mut cache = RelationsCache::new();
        for person in 0..50 {
            let pens = vec![EntityRef::new("Pen", person)];
            cache.put(pens_of(person, &["id", "person_id"]), &pens, pens.clone());
        }
        cache.remove_types(&["Pen".to_owned()]);
        assert_unindexed(&cache);

        let pens = vec![EntityRef::new("Pen", 1), EntityRef::new("Pen", 2)];
        cache.put(pens_of(1, &["id", "person_id"]), &pens, pens.clone());
        cache.remove_through(&[EntityRef::new("Pen", 2)]);
        assert_unindexed(&cache);

        cache.put(pens_of(1, &["id", "person_id"]), &pens, pens.clone());
        cache.remove_fields(&EntityRef::new("Pen", 1), &["person_id".to_owned()]);
        assert_unindexed(&cache);
    }

    #[test]
    fn replacing_an_entry_drops_stale_through_links() {
        let mut cache = RelationsCache::new();
        let before = vec![EntityRef::new("Pen", 1)];
        let after = vec![EntityRef::new("Pen", 2)];
        cache.put(pens_of(1, &["id", "person_id"]), &before, before.clone());
        cache.put(pens_of(1, &["id", "person_id"]), &after, after.clone());

        cache.remove_through(&before);
        assert_eq!(cache.get(&pens_of(1, &["id", "person_id"])), Some(after.as_slice()));
        assert!(!cache.by_through.contains_key(&EntityRef::new("Pen", 1)));

        cache.remove_through(&after);
        assert_unindexed(&cache);
    }
}
