//! DDL tool for the entwine entity mapper.
//!
//! Reads a mapper file, renders `CREATE TABLE` and `CREATE INDEX`
//! statements for its entity types and prints them. With `apply` set, the
//! statements are also run in one transaction against `PostgreSQL`.
//!
//! ```text
//! entwine-ddl [settings.toml]
//! ```
//!
//! Settings come from the optional file argument and `ENTWINE_DDL__*`
//! environment variables (see [`settings::DdlSettings`]).

mod render;
mod settings;

use std::sync::Arc;

use anyhow::{Context, bail};
use entwine_core::MapperConfig;
use entwine_db::PostgresPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::render::{offline_provider, render};
use crate::settings::{DdlSettings, DialectName};

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the settings or mapper file cannot be loaded, the
/// schema cannot be rendered, or applying it fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args().nth(1);
    let settings = DdlSettings::load(path.as_deref()).context("loading settings")?;
    info!(
        mapping = %settings.mapping.display(),
        dialect = ?settings.dialect,
        apply = settings.apply,
        "configuration loaded"
    );

    let mapper = MapperConfig::from_file(&settings.mapping)
        .with_context(|| format!("loading {}", settings.mapping.display()))?;
    info!(entities = mapper.entities.len(), "mapping loaded");

    if !settings.apply {
        let ddl = render(&mapper, offline_provider(settings.dialect), &settings.types)?;
        print_statements(&ddl);
        return Ok(());
    }

    if settings.dialect != DialectName::Postgres {
        bail!("apply is only supported for the postgres dialect");
    }
    let Some(url) = settings.database_url.as_deref() else {
        bail!("apply requires database_url");
    };

    let pool = PostgresPool::connect_url(url).await?;
    let ddl = render(&mapper, Arc::new(pool.provider()?), &settings.types)?;
    print_statements(&ddl);
    pool.apply_schema(&ddl).await?;
    pool.close().await;

    Ok(())
}

fn print_statements(ddl: &[String]) {
    for statement in ddl {
        println!("{statement};\n");
    }
}
