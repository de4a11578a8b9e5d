//! The entity manager.
//!
//! [`EntityManager`] owns everything shared between entity handles: the
//! connection provider and its dialect, the name resolver and polymorphic
//! type mapper, the codec registry, the registered entity types, the weak
//! identity map of live handles and the relation result cache. It is cheap
//! to clone; clones share state.
//!
//! ```
//! use entwine_core::definition::{EntityDefinition, MethodShape};
//! use entwine_core::script::{Response, ScriptedProvider};
//! use entwine_core::EntityManager;
//! use entwine_sql::AnsiDialect;
//! use entwine_types::{Row, Value, ValueKind};
//!
//! let provider = ScriptedProvider::new(AnsiDialect, |_statement| {
//!     Response::Rows(vec![Row::new().with("first_name", "Daniel")])
//! });
//! let manager = EntityManager::new(provider);
//! manager
//!     .register(&EntityDefinition::new("Person")
//!         .method(MethodShape::getter("get_first_name", ValueKind::String)))
//!     .unwrap();
//!
//! let person = manager.peer("Person", 1).unwrap();
//! assert_eq!(person.get("get_first_name").unwrap(), Value::from("Daniel"));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use entwine_sql::{Dialect, Query, Statement};
use entwine_types::{EntityRef, PrimaryKey, Row, Value, ValueKind};
use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard};
use tracing::{debug, info, instrument};

use crate::cache::{Cache, RamCache};
use crate::codec::{CodecRegistry, TypeCodec};
use crate::config::ManagerConfig;
use crate::definition::EntityDefinition;
use crate::descriptor::EntityType;
use crate::error::EntityError;
use crate::naming::{DefaultTypeMapper, NameResolver, PolymorphicTypeMapper, SnakeCaseResolver};
use crate::provider::ConnectionProvider;
use crate::proxy::{Entity, EntityProxy};
use crate::registry::EntityRegistry;
use crate::relations::RelationsCache;

/// Shared state behind every clone of an [`EntityManager`].
struct ManagerInner {
    provider: Arc<dyn ConnectionProvider>,
    dialect: Arc<dyn Dialect>,
    resolver: Arc<dyn NameResolver>,
    mapper: Arc<dyn PolymorphicTypeMapper>,
    cache: Arc<dyn Cache>,
    codecs: RwLock<CodecRegistry>,
    registry: RwLock<EntityRegistry>,
    identity: Mutex<HashMap<EntityRef, Weak<EntityProxy>>>,
    relations: Mutex<RelationsCache>,
    config: ManagerConfig,
}

/// Entry point for registering entity types and obtaining handles.
#[derive(Clone)]
pub struct EntityManager {
    inner: Arc<ManagerInner>,
}

impl core::fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EntityManager")
            .field("dialect", &self.inner.dialect.name())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Builds an [`EntityManager`] with non-default collaborators.
pub struct EntityManagerBuilder {
    provider: Arc<dyn ConnectionProvider>,
    config: ManagerConfig,
    resolver: Arc<dyn NameResolver>,
    mapper: Arc<dyn PolymorphicTypeMapper>,
    codecs: CodecRegistry,
    cache: Arc<dyn Cache>,
}

impl EntityManagerBuilder {
    /// Manager settings.
    #[must_use]
    pub const fn with_config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Table and column naming.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Discriminator mapping for polymorphic references.
    #[must_use]
    pub fn with_type_mapper(mut self, mapper: Arc<dyn PolymorphicTypeMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    /// Codec registry. Entity codecs are added as types register.
    #[must_use]
    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    /// Cache layer factory.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = cache;
        self
    }

    /// Finish building.
    pub fn build(self) -> EntityManager {
        let dialect = self.provider.dialect();
        EntityManager {
            inner: Arc::new(ManagerInner {
                provider: self.provider,
                dialect,
                resolver: self.resolver,
                mapper: self.mapper,
                cache: self.cache,
                codecs: RwLock::new(self.codecs),
                registry: RwLock::new(EntityRegistry::new()),
                identity: Mutex::new(HashMap::new()),
                relations: Mutex::new(RelationsCache::new()),
                config: self.config,
            }),
        }
    }
}

impl EntityManager {
    /// A manager with default collaborators and settings.
    pub fn new(provider: impl ConnectionProvider + 'static) -> Self {
        Self::builder(Arc::new(provider)).build()
    }

    /// Start building a manager over a connection provider.
    pub fn builder(provider: Arc<dyn ConnectionProvider>) -> EntityManagerBuilder {
        EntityManagerBuilder {
            provider,
            config: ManagerConfig::default(),
            resolver: Arc::new(SnakeCaseResolver),
            mapper: Arc::new(DefaultTypeMapper::new()),
            codecs: CodecRegistry::new(),
            cache: Arc::new(RamCache),
        }
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Classify and register an entity type.
    pub fn register(&self, definition: &EntityDefinition) -> Result<Arc<EntityType>, EntityError> {
        let entity_type = EntityType::build(definition, self.inner.resolver.as_ref())?;
        self.inner
            .codecs
            .write()
            .register_entity(entity_type.name.as_str(), entity_type.key.kind);
        let registered = self.inner.registry.write().insert(entity_type);
        debug!(
            entity = %registered.name,
            table = %registered.table,
            fields = registered.fields().len(),
            "registered entity type"
        );
        Ok(registered)
    }

    /// Register several definitions in order.
    pub fn register_all<'a>(
        &self,
        definitions: impl IntoIterator<Item = &'a EntityDefinition>,
    ) -> Result<(), EntityError> {
        for definition in definitions {
            self.register(definition)?;
        }
        Ok(())
    }

    /// A registered entity type.
    pub fn entity_type(&self, name: &str) -> Result<Arc<EntityType>, EntityError> {
        self.inner.registry.read().get(name)
    }

    // ------------------------------------------------------------------
    // Handles
    // ------------------------------------------------------------------

    /// The handle for `(entity_type, key)`. While any handle for that
    /// identity is alive, every lookup returns it, cache layer included.
    pub fn peer(&self, entity_type: &str, key: impl Into<PrimaryKey>) -> Result<Entity, EntityError> {
        let descriptor = self.entity_type(entity_type)?;
        let key = PrimaryKey::from_value(&Value::from(key.into()), descriptor.key.kind)?;
        let reference = EntityRef::new(descriptor.name.as_str(), key);

        let mut identity = self.inner.identity.lock();
        if let Some(proxy) = identity.get(&reference).and_then(Weak::upgrade) {
            return Ok(Entity::from_proxy(proxy));
        }
        let proxy = Arc::new(EntityProxy::new(self.clone(), descriptor, reference.clone()));
        identity.insert(reference, Arc::downgrade(&proxy));
        Ok(Entity::from_proxy(proxy))
    }

    /// The handle for a reference.
    pub fn peer_ref(&self, reference: &EntityRef) -> Result<Entity, EntityError> {
        self.peer(reference.entity_type(), reference.key().clone())
    }

    /// Insert a row and return its handle. The inserted values are cached.
    ///
    /// Auto-increment keys come back from the insert; other key kinds must
    /// be supplied under the key column.
    #[instrument(skip(self, params), fields(entity = entity_type))]
    pub fn create(&self, entity_type: &str, params: &[(&str, Value)]) -> Result<Entity, EntityError> {
        let descriptor = self.entity_type(entity_type)?;

        let missing = descriptor.fields().iter().find(|field| {
            field.not_null
                && field.default.is_none()
                && !field.ignored
                && !params.iter().any(|(name, _)| *name == field.name)
        });
        if let Some(field) = missing {
            return Err(EntityError::NullConstraint {
                entity: descriptor.name.clone(),
                method: field.mutator.clone().unwrap_or_else(|| field.name.clone()),
            });
        }

        let mut assigned_key = None;
        let mut bound: Vec<(String, Value)> = Vec::with_capacity(params.len());
        let mut cached: Vec<(String, Value)> = Vec::with_capacity(params.len());
        for (name, value) in params {
            if *name == descriptor.key.field {
                assigned_key = Some(PrimaryKey::from_value(value, descriptor.key.kind)?);
                bound.push(((*name).to_owned(), value.clone()));
                continue;
            }

            let field = descriptor.field_named(name).ok_or_else(|| {
                EntityError::Schema(format!("{} has no field {name}", descriptor.name))
            })?;
            if field.not_null && value.is_null() {
                return Err(EntityError::NullConstraint {
                    entity: descriptor.name.clone(),
                    method: field.mutator.clone().unwrap_or_else(|| field.name.clone()),
                });
            }

            let codec = self.codec_for(&field.kind)?;
            let mut scratch = Statement::default();
            codec.encode(&mut scratch, value)?;
            bound.push((field.name.clone(), scratch.params.pop().unwrap_or_default()));
            cached.push((field.name.clone(), value.clone()));

            let poly = self.inner.registry.read().poly_column(field).map(str::to_owned);
            if let Some(poly) = poly {
                let discriminator = match value {
                    Value::Entity(target) => Value::Text(self.inner.mapper.convert(target.entity_type())),
                    _ => Value::Null,
                };
                bound.push((poly.clone(), discriminator.clone()));
                cached.push((poly, discriminator));
            }
        }

        let statement = self
            .inner
            .dialect
            .render_insert(&descriptor.table, &descriptor.key.field, &bound);

        let key = match assigned_key {
            Some(key) => {
                self.execute(&statement)?;
                key
            }
            None if descriptor.key.auto_increment => {
                self.log_statement(&statement);
                let mut connection = self.inner.provider.connection()?;
                let generated = connection.insert_returning(&statement, &descriptor.key.field)?;
                PrimaryKey::from_value(&generated, descriptor.key.kind)?
            }
            None => {
                return Err(EntityError::Persist(format!(
                    "{} requires an assigned {} value",
                    descriptor.name, descriptor.key.field
                )));
            }
        };

        let entity = self.peer(&descriptor.name, key)?;
        entity.proxy().cache_values(&cached)?;
        self.inner
            .relations
            .lock()
            .remove_types(core::slice::from_ref(&descriptor.name));
        Ok(entity)
    }

    /// Handles for every row a query matches.
    ///
    /// A `*` projection is narrowed to the key plus the type's preload
    /// fields when it declares any. Every entity field present in the
    /// result rows is deposited into the handles' caches.
    #[instrument(skip(self, query), fields(entity = entity_type))]
    pub fn find(&self, entity_type: &str, query: Query) -> Result<Vec<Entity>, EntityError> {
        let descriptor = self.entity_type(entity_type)?;
        let key_field = descriptor.key.field.as_str();

        let mut projection = query.projection().to_vec();
        if projection.iter().any(|f| f == "*") {
            projection = match &descriptor.preload {
                Some(preload) if !preload.iter().any(|f| f == "*") => {
                    let mut fields = vec![key_field.to_owned()];
                    fields.extend(preload.iter().filter(|f| *f != key_field).cloned());
                    fields
                }
                _ => vec!["*".to_owned()],
            };
        } else if !projection.iter().any(|f| f.eq_ignore_ascii_case(key_field)) {
            projection.insert(0, key_field.to_owned());
        }

        let query = query.or_from_entity(&descriptor.name).fields(projection);
        let statement = Statement {
            sql: self
                .inner
                .dialect
                .render_query(&query, &|t: &str| self.table_for(t), false),
            params: query.params().to_vec(),
        };

        let rows = self.query(&statement)?;
        let mut entities = Vec::with_capacity(rows.len());
        for row in &rows {
            let value = row.get(key_field).ok_or_else(|| {
                EntityError::Schema(format!("result rows lack the key column {key_field}"))
            })?;
            let key = PrimaryKey::from_value(value, descriptor.key.kind)?;
            let entity = self.peer(&descriptor.name, key)?;
            entity.proxy().deposit(row, None)?;
            entities.push(entity);
        }
        Ok(entities)
    }

    /// Number of rows a query matches.
    #[instrument(skip(self, query), fields(entity = entity_type))]
    pub fn count(&self, entity_type: &str, query: Query) -> Result<u64, EntityError> {
        let query = query.or_from_entity(entity_type);
        let statement = Statement {
            sql: self
                .inner
                .dialect
                .render_query(&query, &|t: &str| self.table_for(t), true),
            params: query.params().to_vec(),
        };
        self.query(&statement)?
            .first()
            .and_then(|row| row.get_index(0))
            .and_then(Value::as_i64)
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| EntityError::Schema("count returned no row count".to_owned()))
    }

    /// Delete rows, one statement per entity type. The handles' caches are
    /// discarded and later lookups get fresh handles.
    #[instrument(skip_all, fields(count = entities.len()))]
    pub fn delete(&self, entities: &[Entity]) -> Result<(), EntityError> {
        let mut groups: Vec<(Arc<EntityType>, Vec<&Entity>)> = Vec::new();
        for entity in entities {
            let slot = groups
                .iter()
                .position(|(t, _)| t.name == entity.entity_type())
                .unwrap_or_else(|| {
                    groups.push((Arc::clone(entity.descriptor()), Vec::new()));
                    groups.len().saturating_sub(1)
                });
            if let Some((_, members)) = groups.get_mut(slot) {
                members.push(entity);
            }
        }

        let dialect = &self.inner.dialect;
        for (descriptor, members) in &groups {
            let placeholders = vec!["?"; members.len()].join(",");
            let mut statement = Statement::new(format!(
                "DELETE FROM {} WHERE {} IN ({placeholders})",
                dialect.quote(&descriptor.table),
                dialect.quote(&descriptor.key.field)
            ));
            for entity in members {
                statement.push(Value::from(entity.key().clone()));
            }
            self.execute(&statement)?;
        }

        let types: Vec<String> = groups.iter().map(|(t, _)| t.name.clone()).collect();
        let removed: Vec<EntityRef> = entities.iter().map(Entity::to_ref).collect();
        {
            let mut relations = self.inner.relations.lock();
            relations.remove_types(&types);
            relations.remove_through(&removed);
        }
        {
            let mut identity = self.inner.identity.lock();
            for reference in &removed {
                identity.remove(reference);
            }
        }
        for entity in entities {
            entity.proxy().discard();
        }
        Ok(())
    }

    /// Drop the clean cached values of some handles and the relation
    /// results of their types. Unsaved edits survive.
    pub fn flush(&self, entities: &[Entity]) {
        let mut types: Vec<String> = Vec::new();
        for entity in entities {
            entity.cache().clear();
            if !types.iter().any(|t| t == entity.entity_type()) {
                types.push(entity.entity_type().to_owned());
            }
        }
        self.inner.relations.lock().remove_types(&types);
    }

    /// Drop the clean cached values of every live handle and every
    /// relation result.
    pub fn flush_all(&self) {
        let live: Vec<Arc<EntityProxy>> = {
            let identity = self.inner.identity.lock();
            identity.values().filter_map(Weak::upgrade).collect()
        };
        for proxy in &live {
            proxy.layer().clear();
        }
        drop(live);
        self.inner.relations.lock().flush();
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The dialect of the connection provider.
    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.inner.dialect
    }

    /// Manager settings.
    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// Number of cached relation results.
    pub fn relation_cache_len(&self) -> usize {
        self.inner.relations.lock().len()
    }

    /// Table of an entity type, through the name resolver when the type
    /// is not registered.
    pub fn table_for(&self, entity_type: &str) -> String {
        self.inner.registry.read().get(entity_type).map_or_else(
            |_| self.inner.resolver.table_name(entity_type),
            |t| t.table.clone(),
        )
    }

    pub(crate) fn registry(&self) -> RwLockReadGuard<'_, EntityRegistry> {
        self.inner.registry.read()
    }

    pub(crate) fn relations(&self) -> MutexGuard<'_, RelationsCache> {
        self.inner.relations.lock()
    }

    pub(crate) fn mapper(&self) -> &dyn PolymorphicTypeMapper {
        self.inner.mapper.as_ref()
    }

    pub(crate) fn cache_factory(&self) -> &dyn Cache {
        self.inner.cache.as_ref()
    }

    pub(crate) fn codec_for(&self, kind: &ValueKind) -> Result<Arc<dyn TypeCodec>, EntityError> {
        Ok(self.inner.codecs.read().codec_for(kind)?)
    }

    /// Forget a dead handle, unless a newer live one replaced it.
    pub(crate) fn release(&self, reference: &EntityRef) {
        let mut identity = self.inner.identity.lock();
        if identity
            .get(reference)
            .is_some_and(|weak| weak.strong_count() == 0)
        {
            identity.remove(reference);
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn log_statement(&self, statement: &Statement) {
        if self.inner.config.log_statements {
            info!(sql = %statement.sql, params = statement.params.len(), "executing statement");
        } else {
            debug!(sql = %statement.sql, params = statement.params.len(), "executing statement");
        }
    }

    /// Run a row-returning statement on a freshly borrowed connection.
    pub(crate) fn query(&self, statement: &Statement) -> Result<Vec<Row>, EntityError> {
        self.log_statement(statement);
        let mut connection = self.inner.provider.connection()?;
        Ok(connection.query(statement)?)
    }

    /// Run a statement on a freshly borrowed connection and return the
    /// affected-row count.
    pub(crate) fn execute(&self, statement: &Statement) -> Result<u64, EntityError> {
        self.log_statement(statement);
        let mut connection = self.inner.provider.connection()?;
        Ok(connection.execute(statement)?)
    }
}
