//! Schema rendering from a mapper file.

use std::sync::Arc;

use anyhow::Context;
use entwine_core::{ConnectionProvider, EntityManager, MapperConfig, ScriptedProvider};
use entwine_sql::{AnsiDialect, MySqlDialect, PostgresDialect};

use crate::settings::DialectName;

/// A provider that only names a dialect. Rendering never connects.
pub fn offline_provider(dialect: DialectName) -> Arc<dyn ConnectionProvider> {
    match dialect {
        DialectName::Ansi => Arc::new(ScriptedProvider::unavailable(AnsiDialect)),
        DialectName::Postgres => Arc::new(ScriptedProvider::unavailable(PostgresDialect)),
        DialectName::MySql => Arc::new(ScriptedProvider::unavailable(MySqlDialect)),
    }
}

/// Register every mapped entity and render the DDL for `types`, or for
/// every mapped entity when `types` is empty.
pub fn render(
    mapper: &MapperConfig,
    provider: Arc<dyn ConnectionProvider>,
    types: &[String],
) -> anyhow::Result<Vec<String>> {
    let manager = EntityManager::builder(provider)
        .with_config(mapper.manager.clone())
        .build();
    manager
        .register_all(&mapper.entities)
        .context("registering entity definitions")?;

    let names: Vec<&str> = if types.is_empty() {
        mapper.entities.iter().map(|e| e.name.as_str()).collect()
    } else {
        types.iter().map(String::as_str).collect()
    };
    manager
        .render_schema(&names)
        .context("rendering schema")
}
