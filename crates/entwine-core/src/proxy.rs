//! Entity handles and method dispatch.
//!
//! An [`Entity`] is a cheap, clonable handle to one `(type, key)` identity.
//! Calling [`Entity::invoke`] looks the method up in the type's descriptor
//! and runs the classified [`Operation`]: key access, save, listener
//! bookkeeping, identity intrinsics, a field read or write through the
//! handle's cache layer, or a relation traversal.
//!
//! Every read and write of a field on a handle serializes under that
//! field's lock. Different fields, or the same field on different handles,
//! proceed independently.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Arc, OnceLock};

use entwine_sql::{ColumnRef, Condition, Select, SelectItem, Statement};
use entwine_types::{EntityRef, PrimaryKey, Row, Value, ValueKind};
use parking_lot::{Mutex, RwLock};
use tracing::{instrument, trace, warn};

use crate::cache::CacheLayer;
use crate::codec::TypeCodec;
use crate::definition::Tag;
use crate::descriptor::{EntityType, FieldDescriptor, FieldIndex, MethodEntry, Operation, RelationKind};
use crate::error::EntityError;
use crate::listener::{PropertyChangeEvent, PropertyChangeListener};
use crate::manager::EntityManager;

/// An argument to [`Entity::invoke`].
#[derive(Clone)]
pub enum Argument {
    /// A value.
    Value(Value),
    /// A listener, for the listener intrinsics.
    Listener(Arc<dyn PropertyChangeListener>),
}

impl core::fmt::Debug for Argument {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Listener(_) => f.write_str("Listener"),
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&Entity> for Argument {
    fn from(entity: &Entity) -> Self {
        Self::Value(Value::Entity(entity.to_ref()))
    }
}

impl From<Arc<dyn PropertyChangeListener>> for Argument {
    fn from(listener: Arc<dyn PropertyChangeListener>) -> Self {
        Self::Listener(listener)
    }
}

/// The result of [`Entity::invoke`].
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Nothing.
    Unit,
    /// A plain value.
    Value(Value),
    /// A single entity, or none.
    Entity(Option<Entity>),
    /// Several entities.
    Entities(Vec<Entity>),
}

/// State behind one entity identity. Shared by every [`Entity`] clone and
/// interned by the manager while alive.
pub(crate) struct EntityProxy {
    manager: EntityManager,
    descriptor: Arc<EntityType>,
    reference: EntityRef,
    layer: OnceLock<Arc<dyn CacheLayer>>,
    locks: Box<[RwLock<()>]>,
    listeners: Mutex<Vec<Arc<dyn PropertyChangeListener>>>,
}

impl Drop for EntityProxy {
    fn drop(&mut self) {
        self.manager.release(&self.reference);
    }
}

impl EntityProxy {
    pub(crate) fn new(manager: EntityManager, descriptor: Arc<EntityType>, reference: EntityRef) -> Self {
        let locks = descriptor.fields().iter().map(|_| RwLock::new(())).collect();
        Self {
            manager,
            descriptor,
            reference,
            layer: OnceLock::new(),
            locks,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// The cache layer, created on first use.
    pub(crate) fn layer(&self) -> Arc<dyn CacheLayer> {
        Arc::clone(
            self.layer
                .get_or_init(|| self.manager.cache_factory().create_layer(&self.reference)),
        )
    }

    fn field(&self, index: FieldIndex) -> Result<&FieldDescriptor, EntityError> {
        self.descriptor.field(index).ok_or_else(|| {
            EntityError::Schema(format!("{} has no field #{}", self.descriptor.name, index.get()))
        })
    }

    fn cacheable(field: &FieldDescriptor, codec: &dyn TypeCodec) -> bool {
        field.on_update.is_none() && !field.transient && codec.should_cache()
    }

    /// Whether a dirty name (a field or a discriminator column) may stay
    /// cached after a save.
    fn keeps_cached(&self, name: &str) -> Result<bool, EntityError> {
        match self.descriptor.field_named(name) {
            Some(field) => {
                let codec = self.manager.codec_for(&field.kind)?;
                Ok(Self::cacheable(field, codec.as_ref()))
            }
            None => Ok(true),
        }
    }

    /// Decode a field from a row, resolving a polymorphic reference to its
    /// concrete type through the row's discriminator column.
    fn decode(&self, field: &FieldDescriptor, row: &Row) -> Result<Value, EntityError> {
        let poly = self.manager.registry().poly_column(field).map(str::to_owned);
        let discriminator = poly
            .as_deref()
            .and_then(|column| row.get(column))
            .and_then(Value::as_str);
        let kind = match (field.kind.entity_type(), discriminator) {
            (Some(base), Some(discriminator)) => {
                ValueKind::Entity(self.manager.mapper().invert(base, discriminator))
            }
            _ => field.kind.clone(),
        };
        Ok(self.manager.codec_for(&kind)?.decode(row, &field.name)?)
    }

    /// Cache every cacheable field present in a row, skipping dirty ones.
    /// With `only` set, fields outside the list are skipped too.
    pub(crate) fn deposit(&self, row: &Row, only: Option<&[String]>) -> Result<(), EntityError> {
        let layer = self.layer();
        for field in self.descriptor.fields() {
            let wanted = only.is_none_or(|names| names.iter().any(|n| n.eq_ignore_ascii_case(&field.name)));
            if !wanted || row.get(&field.name).is_none() || layer.dirty_contains(&field.name) {
                continue;
            }
            let codec = self.manager.codec_for(&field.kind)?;
            if Self::cacheable(field, codec.as_ref()) {
                layer.put(&field.name, self.decode(field, row)?);
            }
        }
        Ok(())
    }

    /// Cache values just inserted.
    pub(crate) fn cache_values(&self, values: &[(String, Value)]) -> Result<(), EntityError> {
        let layer = self.layer();
        for (name, value) in values {
            if self.keeps_cached(name)? {
                layer.put(name, value.clone());
            }
        }
        Ok(())
    }

    /// Forget everything cached, dirty edits included.
    pub(crate) fn discard(&self) {
        let layer = self.layer();
        layer.clear_dirty();
        layer.clear_flush();
        layer.clear();
    }

    // ------------------------------------------------------------------
    // Field access
    // ------------------------------------------------------------------

    fn read_field(&self, index: FieldIndex) -> Result<Value, EntityError> {
        let field = self.field(index)?;
        let lock = self.locks.get(index.get()).ok_or_else(|| {
            EntityError::Schema(format!("{} has no lock for {}", self.descriptor.name, field.name))
        })?;
        let _guard = lock.write();

        let layer = self.layer();
        let codec = self.manager.codec_for(&field.kind)?;
        let cacheable = Self::cacheable(field, codec.as_ref());

        if !cacheable && layer.dirty_contains(&field.name) {
            return Ok(layer.get(&field.name).unwrap_or_default());
        }

        if let Some(value) = layer.get(&field.name).filter(|_| cacheable) {
            if self.manager.registry().value_fits(&value, &field.kind) {
                return Ok(value);
            }
            if let Some(reference) = self.as_reference(field, &value) {
                let value = Value::Entity(reference);
                layer.put(&field.name, value.clone());
                return Ok(value);
            }
            trace!(
                entity = %self.reference,
                field = %field.name,
                cached = value.variant_name(),
                expected = %field.kind,
                "evicting cached value of the wrong kind"
            );
            layer.remove(&field.name);
        }

        let poly = self.manager.registry().poly_column(field).map(str::to_owned);
        let mut select = Select::from_table(self.descriptor.table.as_str())
            .item(SelectItem::column(ColumnRef::new(field.name.as_str())));
        if let Some(poly) = &poly {
            select = select.item(SelectItem::column(ColumnRef::new(poly.as_str())));
        }
        let select = select.condition(Condition::Eq(
            ColumnRef::new(self.descriptor.key.field.as_str()),
            Value::from(self.reference.key().clone()),
        ));

        let statement = self.manager.dialect().render_select(&select);
        let rows = self.manager.query(&statement)?;
        let value = match rows.first() {
            Some(row) => self.decode(field, row)?,
            None => Value::Null,
        };

        if cacheable {
            layer.put(&field.name, value.clone());
        }
        Ok(value)
    }

    /// A raw key cached for an entity-valued field, as a reference.
    fn as_reference(&self, field: &FieldDescriptor, value: &Value) -> Option<EntityRef> {
        let target = field.kind.entity_type()?;
        if matches!(value, Value::Null | Value::Entity(_)) {
            return None;
        }
        let key_kind = self.manager.entity_type(target).ok()?.key.kind;
        let key = PrimaryKey::from_value(value, key_kind).ok()?;
        Some(EntityRef::new(target, key))
    }

    fn write_field(&self, index: FieldIndex, value: Value) -> Result<(), EntityError> {
        let field = self.field(index)?;
        let lock = self.locks.get(index.get()).ok_or_else(|| {
            EntityError::Schema(format!("{} has no lock for {}", self.descriptor.name, field.name))
        })?;
        let _guard = lock.write();

        let layer = self.layer();
        if let Value::Entity(target) = &value {
            layer.mark_to_flush(target.entity_type());
            layer.mark_to_flush(&self.descriptor.name);
        }

        let poly = self.manager.registry().poly_column(field).map(str::to_owned);
        if let Some(poly) = poly {
            let discriminator = match &value {
                Value::Entity(target) => Value::Text(self.manager.mapper().convert(target.entity_type())),
                _ => Value::Null,
            };
            layer.put_dirty(&poly, discriminator);
        }

        layer.put_dirty(&field.name, value);
        Ok(())
    }

    /// Check a mutator argument against the field's kind. Scalars the
    /// codec can coerce are accepted in coerced form.
    fn coerce_argument(&self, entry: &MethodEntry, index: FieldIndex, value: Value) -> Result<Value, EntityError> {
        let field = self.field(index)?;
        if value.is_null() || self.manager.registry().value_fits(&value, &field.kind) {
            return Ok(value);
        }
        let mismatch = || EntityError::ArgumentType {
            entity: self.descriptor.name.clone(),
            method: entry.shape.name.clone(),
            expected: field.kind.clone(),
            got: value.variant_name(),
        };
        if field.kind.entity_type().is_some() {
            return Err(mismatch());
        }
        let mut scratch = Statement::default();
        self.manager
            .codec_for(&field.kind)?
            .encode(&mut scratch, &value)
            .map_err(|_e| mismatch())?;
        Ok(scratch.params.pop().unwrap_or_default())
    }

    // ------------------------------------------------------------------
    // Save
    // ------------------------------------------------------------------

    #[instrument(skip(self), fields(entity = %self.descriptor.name, key = %self.reference.key()))]
    fn save(&self) -> Result<(), EntityError> {
        let layer = self.layer();
        let dirty = layer.dirty_fields();
        if dirty.is_empty() {
            return Ok(());
        }
        let written: Vec<Option<Value>> = dirty.iter().map(|name| layer.get(name)).collect();
        let (statement, versioned) = self.update_statement(&dirty, &written)?;

        {
            let mut relations = self.manager.relations();
            relations.remove_types(&layer.to_flush());
            relations.remove_fields(&self.reference, &dirty);
        }
        layer.clear_flush();

        let affected = self.manager.execute(&statement)?;
        if versioned && affected == 0 {
            warn!(entity = %self.descriptor.name, key = %self.reference.key(), "stale object");
            return Err(EntityError::StaleObject {
                entity: self.descriptor.name.clone(),
                key: self.reference.key().clone(),
            });
        }

        let events: Vec<PropertyChangeEvent> = dirty
            .iter()
            .zip(&written)
            .map(|(name, value)| PropertyChangeEvent {
                entity: self.reference.clone(),
                field: name.clone(),
                new_value: value.clone().unwrap_or_default(),
            })
            .collect();

        // Fields rewritten while the update ran stay dirty for the next save.
        let settled: Vec<String> = dirty
            .into_iter()
            .zip(written)
            .filter(|(name, value)| layer.get(name) == *value)
            .map(|(name, _)| name)
            .collect();
        layer.clear_dirty_fields(&settled);

        for name in &settled {
            if !self.keeps_cached(name)? {
                layer.remove(name);
            }
        }

        if let Some(spec) = &self.descriptor.version {
            Self::bump_version(layer.as_ref(), &spec.field, spec.increment);
        }

        let listeners = self.listeners.lock().clone();
        for event in &events {
            for listener in &listeners {
                listener.property_changed(event);
            }
        }

        Ok(())
    }

    /// The `UPDATE` writing `written` into the dirty fields, and whether it
    /// is guarded by an expected version.
    fn update_statement(&self, dirty: &[String], written: &[Option<Value>]) -> Result<(Statement, bool), EntityError> {
        let dialect = Arc::clone(self.manager.dialect());
        let version = self.descriptor.version.as_ref();
        let mut statement = Statement::new(format!("UPDATE {} SET ", dialect.quote(&self.descriptor.table)));
        let mut assignments: Vec<String> = Vec::with_capacity(dirty.len().saturating_add(1));

        for (name, value) in dirty.iter().zip(written) {
            if version.is_some_and(|v| v.field == *name) {
                continue;
            }
            let quoted = dialect.quote(name);
            let Some(value) = value else {
                assignments.push(format!("{quoted} = NULL"));
                continue;
            };
            let kind = self
                .descriptor
                .field_named(name)
                .map_or(ValueKind::String, |f| f.kind.clone());
            self.manager.codec_for(&kind)?.encode(&mut statement, value)?;
            assignments.push(format!("{quoted} = ?"));
        }

        let mut expected_version = None;
        if let Some(spec) = version {
            let index = self.descriptor.field_index(&spec.field).ok_or_else(|| {
                EntityError::Persist(format!("unable to get version: no accessor for {}", spec.field))
            })?;
            let current = self
                .read_field(index)
                .map_err(|e| EntityError::Persist(format!("unable to get version: {e}")))?;
            let quoted = dialect.quote(&spec.field);
            if current.is_null() {
                assignments.push(format!("{quoted} = {}", spec.increment));
            } else {
                assignments.push(format!("{quoted} = {quoted} + {}", spec.increment));
                expected_version = Some((quoted, current));
            }
        }

        statement.sql.push_str(&assignments.join(","));
        statement.sql.push_str(" WHERE ");
        statement.sql.push_str(&dialect.quote(&self.descriptor.key.field));
        statement.sql.push_str(" = ?");
        statement.push(Value::from(self.reference.key().clone()));
        let versioned = expected_version.is_some();
        if let Some((quoted, current)) = expected_version {
            statement.sql.push_str(" AND ");
            statement.sql.push_str(&quoted);
            statement.sql.push_str(" = ?");
            statement.push(current);
        }
        Ok((statement, versioned))
    }

    /// Mirror a successful versioned update in the cache.
    fn bump_version(layer: &dyn CacheLayer, field: &str, increment: i64) {
        match layer.get(field) {
            Some(Value::Int(n)) => n
                .checked_add(increment)
                .map_or_else(|| layer.remove(field), |next| layer.put(field, Value::Int(next))),
            Some(Value::Null) => layer.put(field, Value::Int(increment)),
            Some(_) => layer.remove(field),
            None => {}
        }
    }

    // ------------------------------------------------------------------
    // Dispatch helpers
    // ------------------------------------------------------------------

    fn unknown(&self, method: &str) -> EntityError {
        EntityError::UnknownMethod {
            entity: self.descriptor.name.clone(),
            method: method.to_owned(),
        }
    }

    fn check_arity(&self, method: &str, expected: usize, args: &[Argument]) -> Result<(), EntityError> {
        if args.len() == expected {
            Ok(())
        } else {
            Err(EntityError::Arity {
                entity: self.descriptor.name.clone(),
                method: method.to_owned(),
                expected,
                got: args.len(),
            })
        }
    }

    fn check_constraints(&self, entry: &MethodEntry, args: &[Argument]) -> Result<(), EntityError> {
        let not_null = entry.shape.has_tag(|t| matches!(t, Tag::NotNull))
            || matches!(entry.operation, Operation::Set(index)
                if self.descriptor.field(index).is_some_and(|f| f.not_null));
        if not_null && matches!(args.first(), Some(Argument::Value(Value::Null))) {
            return Err(EntityError::NullConstraint {
                entity: self.descriptor.name.clone(),
                method: entry.shape.name.clone(),
            });
        }
        Ok(())
    }

    fn listener_argument(
        &self,
        method: &str,
        args: &[Argument],
    ) -> Result<Arc<dyn PropertyChangeListener>, EntityError> {
        match args.first() {
            Some(Argument::Listener(listener)) => Ok(Arc::clone(listener)),
            _ => Err(self.unknown(method)),
        }
    }

    fn value_argument<'a>(&self, method: &str, args: &'a [Argument]) -> Result<&'a Value, EntityError> {
        match args.first() {
            Some(Argument::Value(value)) => Ok(value),
            _ => Err(self.unknown(method)),
        }
    }

    fn same_identity(&self, other: &Value) -> bool {
        match other {
            Value::Entity(reference) => {
                reference.key() == self.reference.key()
                    && self.manager.table_for(reference.entity_type()) == self.descriptor.table
            }
            _ => false,
        }
    }

    fn identity_hash(&self) -> i64 {
        let mut hasher = DefaultHasher::new();
        self.descriptor.table.hash(&mut hasher);
        self.reference.key().hash(&mut hasher);
        i64::try_from(hasher.finish() % 65_536).unwrap_or_default()
    }
}

/// A handle to one entity.
///
/// Handles compare and hash by table and key. Clones share the cache
/// layer, field locks and listeners.
#[derive(Clone)]
pub struct Entity {
    proxy: Arc<EntityProxy>,
}

impl Entity {
    pub(crate) const fn from_proxy(proxy: Arc<EntityProxy>) -> Self {
        Self { proxy }
    }

    pub(crate) fn proxy(&self) -> &EntityProxy {
        &self.proxy
    }

    /// Call a method by name.
    pub fn invoke(&self, method: &str, args: &[Argument]) -> Result<Outcome, EntityError> {
        let proxy = &self.proxy;
        let entry = proxy
            .descriptor
            .method(method)
            .ok_or_else(|| proxy.unknown(method))?;

        let arity = match entry.operation {
            Operation::AddListener | Operation::RemoveListener | Operation::Equals | Operation::Set(_) => 1,
            _ => 0,
        };
        proxy.check_arity(method, arity, args)?;
        proxy.check_constraints(entry, args)?;

        match &entry.operation {
            Operation::PrimaryKey => Ok(Outcome::Value(Value::from(self.key().clone()))),
            Operation::Save => {
                proxy.save()?;
                Ok(Outcome::Unit)
            }
            Operation::EntityType => Ok(Outcome::Value(Value::Text(proxy.descriptor.name.clone()))),
            Operation::AddListener => {
                let listener = proxy.listener_argument(method, args)?;
                proxy.listeners.lock().push(listener);
                Ok(Outcome::Unit)
            }
            Operation::RemoveListener => {
                let listener = proxy.listener_argument(method, args)?;
                proxy.listeners.lock().retain(|l| !Arc::ptr_eq(l, &listener));
                Ok(Outcome::Unit)
            }
            Operation::Equals => {
                let other = proxy.value_argument(method, args)?;
                Ok(Outcome::Value(Value::Bool(proxy.same_identity(other))))
            }
            Operation::HashCode => Ok(Outcome::Value(Value::Int(proxy.identity_hash()))),
            Operation::Describe => Ok(Outcome::Value(Value::Text(self.to_string()))),
            Operation::Get(index) => {
                let value = proxy.read_field(*index)?;
                let references_entity = proxy.field(*index)?.kind.entity_type().is_some();
                match value {
                    Value::Entity(reference) => Ok(Outcome::Entity(Some(
                        proxy.manager.peer_ref(&reference)?,
                    ))),
                    Value::Null if references_entity => Ok(Outcome::Entity(None)),
                    other => Ok(Outcome::Value(other)),
                }
            }
            Operation::Set(index) => {
                let value = proxy.value_argument(method, args)?.clone();
                let value = proxy.coerce_argument(entry, *index, value)?;
                proxy.write_field(*index, value)?;
                Ok(Outcome::Unit)
            }
            Operation::Relation(spec) => {
                let related = self.retrieve_relations(spec)?;
                match spec.kind {
                    RelationKind::OneToOne => Ok(Outcome::Entity(related.into_iter().next())),
                    RelationKind::OneToMany | RelationKind::ManyToMany { .. } => {
                        Ok(Outcome::Entities(related))
                    }
                }
            }
        }
    }

    /// Read a field, or a one-to-one relation as an entity reference.
    pub fn get(&self, method: &str) -> Result<Value, EntityError> {
        match self.invoke(method, &[])? {
            Outcome::Value(value) => Ok(value),
            Outcome::Entity(entity) => Ok(entity.map_or(Value::Null, |e| Value::Entity(e.to_ref()))),
            Outcome::Unit | Outcome::Entities(_) => Err(self.proxy.unknown(method)),
        }
    }

    /// Read an entity-valued field or one-to-one relation.
    pub fn get_entity(&self, method: &str) -> Result<Option<Self>, EntityError> {
        match self.invoke(method, &[])? {
            Outcome::Entity(entity) => Ok(entity),
            Outcome::Value(Value::Null) => Ok(None),
            Outcome::Unit | Outcome::Value(_) | Outcome::Entities(_) => Err(self.proxy.unknown(method)),
        }
    }

    /// Write a field. Nothing reaches the database until [`save`](Self::save).
    pub fn set(&self, method: &str, value: impl Into<Value>) -> Result<(), EntityError> {
        self.invoke(method, &[Argument::Value(value.into())]).map(|_| ())
    }

    /// Traverse a relation.
    pub fn related(&self, method: &str) -> Result<Vec<Self>, EntityError> {
        match self.invoke(method, &[])? {
            Outcome::Entities(entities) => Ok(entities),
            Outcome::Entity(entity) => Ok(entity.into_iter().collect()),
            Outcome::Unit | Outcome::Value(_) => Err(self.proxy.unknown(method)),
        }
    }

    /// Persist dirty fields.
    ///
    /// With a version field configured, a save that matches no row fails
    /// with [`EntityError::StaleObject`] and leaves the dirty set intact.
    pub fn save(&self) -> Result<(), EntityError> {
        self.proxy.save()
    }

    /// Register a listener called after every successful save.
    pub fn add_listener(&self, listener: Arc<dyn PropertyChangeListener>) {
        self.proxy.listeners.lock().push(listener);
    }

    /// Remove a listener registered with the same `Arc`.
    pub fn remove_listener(&self, listener: &Arc<dyn PropertyChangeListener>) {
        self.proxy
            .listeners
            .lock()
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// The primary key.
    pub fn key(&self) -> &PrimaryKey {
        self.proxy.reference.key()
    }

    /// The entity type name.
    pub fn entity_type(&self) -> &str {
        &self.proxy.descriptor.name
    }

    /// The entity type descriptor.
    pub fn descriptor(&self) -> &Arc<EntityType> {
        &self.proxy.descriptor
    }

    /// The identity of this handle.
    pub fn to_ref(&self) -> EntityRef {
        self.proxy.reference.clone()
    }

    /// The manager this handle belongs to.
    pub fn manager(&self) -> &EntityManager {
        &self.proxy.manager
    }

    /// The handle's cache layer.
    pub fn cache(&self) -> Arc<dyn CacheLayer> {
        self.proxy.layer()
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.proxy.descriptor.table == other.proxy.descriptor.table && self.key() == other.key()
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.proxy.descriptor.table.hash(state);
        self.key().hash(state);
    }
}

impl core::fmt::Display for Entity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} {{{} = {}}}",
            self.proxy.descriptor.table,
            self.proxy.descriptor.key.field,
            self.key()
        )
    }
}

impl core::fmt::Debug for Entity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Entity")
            .field("type", &self.entity_type())
            .field("key", self.key())
            .finish()
    }
}

impl From<&Entity> for Value {
    fn from(entity: &Entity) -> Self {
        Self::Entity(entity.to_ref())
    }
}

impl From<Entity> for Value {
    fn from(entity: Entity) -> Self {
        Self::Entity(entity.to_ref())
    }
}
