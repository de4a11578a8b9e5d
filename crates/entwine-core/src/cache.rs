//! Per-entity field caches.
//!
//! Every live entity handle owns one [`CacheLayer`]: the last known value
//! of each field, the set of fields mutated since the last save, and the
//! entity types whose relation caches must be invalidated on the next
//! save. A [`Cache`] creates layers; [`RamCache`] keeps them in memory.
//!
//! Invariant: a field in the dirty set always has an entry in the value
//! map. `Value::Null` means "explicitly set to null".

use std::collections::HashMap;
use std::sync::Arc;

use entwine_types::{EntityRef, Value};
use parking_lot::Mutex;

/// Field cache of a single entity handle. No operation performs I/O.
pub trait CacheLayer: Send + Sync {
    /// The cached value of a field.
    fn get(&self, field: &str) -> Option<Value>;

    /// Cache a value.
    fn put(&self, field: &str, value: Value);

    /// Drop a cached value.
    fn remove(&self, field: &str);

    /// Whether a value is cached.
    fn contains(&self, field: &str) -> bool;

    /// Record that a field was mutated.
    fn mark_dirty(&self, field: &str);

    /// Cache a mutated value and mark it dirty in one step, so a concurrent
    /// save never sees the mark without the value.
    fn put_dirty(&self, field: &str, value: Value) {
        self.put(field, value);
        self.mark_dirty(field);
    }

    /// Whether a field is dirty.
    fn dirty_contains(&self, field: &str) -> bool;

    /// Dirty fields in the order they were first marked.
    fn dirty_fields(&self) -> Vec<String>;

    /// Forget all dirty marks. Cached values stay, now clean.
    fn clear_dirty(&self);

    /// Forget the dirty marks of the named fields only.
    fn clear_dirty_fields(&self, fields: &[String]);

    /// Record an entity type whose relation caches the next save must flush.
    fn mark_to_flush(&self, entity_type: &str);

    /// Entity types marked for relation-cache flushing.
    fn to_flush(&self) -> Vec<String>;

    /// Forget the flush marks.
    fn clear_flush(&self);

    /// Drop every clean entry. Dirty entries survive so unsaved edits are
    /// never lost to an external flush.
    fn clear(&self);
}

/// Creates cache layers for entity handles.
pub trait Cache: Send + Sync + core::fmt::Debug {
    /// A fresh, empty layer for the given entity.
    fn create_layer(&self, entity: &EntityRef) -> Arc<dyn CacheLayer>;
}

/// In-memory [`Cache`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RamCache;

impl Cache for RamCache {
    fn create_layer(&self, _entity: &EntityRef) -> Arc<dyn CacheLayer> {
        Arc::new(RamCacheLayer::default())
    }
}

#[derive(Debug, Default)]
struct LayerState {
    values: HashMap<String, Value>,
    dirty: Vec<String>,
    to_flush: Vec<String>,
}

/// In-memory [`CacheLayer`].
#[derive(Debug, Default)]
pub struct RamCacheLayer {
    state: Mutex<LayerState>,
}

impl CacheLayer for RamCacheLayer {
    fn get(&self, field: &str) -> Option<Value> {
        self.state.lock().values.get(field).cloned()
    }

    fn put(&self, field: &str, value: Value) {
        self.state.lock().values.insert(field.to_owned(), value);
    }

    fn remove(&self, field: &str) {
        self.state.lock().values.remove(field);
    }

    fn contains(&self, field: &str) -> bool {
        self.state.lock().values.contains_key(field)
    }

    fn mark_dirty(&self, field: &str) {
        let mut state = self.state.lock();
        if !state.dirty.iter().any(|f| f == field) {
            state.dirty.push(field.to_owned());
        }
    }

    fn put_dirty(&self, field: &str, value: Value) {
        let mut state = self.state.lock();
        state.values.insert(field.to_owned(), value);
        if !state.dirty.iter().any(|f| f == field) {
            state.dirty.push(field.to_owned());
        }
    }

    fn dirty_contains(&self, field: &str) -> bool {
        self.state.lock().dirty.iter().any(|f| f == field)
    }

    fn dirty_fields(&self) -> Vec<String> {
        self.state.lock().dirty.clone()
    }

    fn clear_dirty(&self) {
        self.state.lock().dirty.clear();
    }

    fn clear_dirty_fields(&self, fields: &[String]) {
        self.state.lock().dirty.retain(|f| !fields.contains(f));
    }

    fn mark_to_flush(&self, entity_type: &str) {
        let mut state = self.state.lock();
        if !state.to_flush.iter().any(|t| t == entity_type) {
            state.to_flush.push(entity_type.to_owned());
        }
    }

    fn to_flush(&self) -> Vec<String> {
        self.state.lock().to_flush.clone()
    }

    fn clear_flush(&self) {
        self.state.lock().to_flush.clear();
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        let LayerState { values, dirty, .. } = &mut *state;
        values.retain(|field, _| dirty.contains(field));
    }
}
