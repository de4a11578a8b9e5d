//! Mapper configuration.
//!
//! A mapper file holds the manager settings and the entity definitions:
//!
//! ```yaml
//! manager:
//!   preload_enabled: true
//!   log_statements: false
//! entities:
//!   - name: Person
//!     methods:
//!       - name: get_first_name
//!         returns: { value: string }
//! ```
//!
//! Environment variables override the manager settings after parsing:
//!
//! - `ENTWINE_PRELOAD_ENABLED` overrides `manager.preload_enabled`
//! - `ENTWINE_RELATION_CACHE_ENABLED` overrides `manager.relation_cache_enabled`
//! - `ENTWINE_LOG_STATEMENTS` overrides `manager.log_statements`

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::definition::EntityDefinition;

/// A mapper file that could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The mapper file is missing or unreadable.
    #[error("cannot read mapper file {}: {source}", path.display())]
    Io {
        /// The file that was asked for.
        path: PathBuf,
        /// Why reading it failed.
        source: std::io::Error,
    },

    /// The mapper document is not YAML or does not describe entities.
    #[error("malformed mapper document: {source}")]
    Yaml {
        /// Where parsing stopped.
        #[from]
        source: serde_yml::Error,
    },
}

/// Entity manager behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManagerConfig {
    /// Use the preload statement shapes when a relation target declares
    /// preload fields.
    #[serde(default = "default_true")]
    pub preload_enabled: bool,

    /// Cache relation traversal results.
    #[serde(default = "default_true")]
    pub relation_cache_enabled: bool,

    /// Log every statement at `info` instead of `debug`.
    #[serde(default)]
    pub log_statements: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            preload_enabled: true,
            relation_cache_enabled: true,
            log_statements: false,
        }
    }
}

const fn default_true() -> bool {
    true
}

impl ManagerConfig {
    /// Override settings from `ENTWINE_*` environment variables. Values
    /// that do not parse as booleans are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(val) = env_flag("ENTWINE_PRELOAD_ENABLED") {
            self.preload_enabled = val;
        }
        if let Some(val) = env_flag("ENTWINE_RELATION_CACHE_ENABLED") {
            self.relation_cache_enabled = val;
        }
        if let Some(val) = env_flag("ENTWINE_LOG_STATEMENTS") {
            self.log_statements = val;
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Top-level mapper file: manager settings plus entity definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MapperConfig {
    /// Manager settings.
    #[serde(default)]
    pub manager: ManagerConfig,

    /// Entity definitions, registered in order.
    #[serde(default)]
    pub entities: Vec<EntityDefinition>,
}

impl MapperConfig {
    /// Load a mapper file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] naming `path` if it cannot be read, or
    /// [`ConfigError::Yaml`] if it does not hold a mapper document.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parse a mapper file from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = from_yaml(yaml)?;
        config.manager.apply_env_overrides();
        Ok(config)
    }
}

/// Deserialize a mapping document. Enum values are written as
/// single-key maps (`returns: { entity: Company }`) or plain names
/// (`returns: unit`), never as YAML `!tags`.
pub(crate) fn from_yaml<T: DeserializeOwned>(yaml: &str) -> Result<T, serde_yml::Error> {
    serde_yml::with::singleton_map_recursive::deserialize(serde_yml::Deserializer::from_str(yaml))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_documents_use_defaults() {
        let config: MapperConfig = from_yaml("{}").unwrap();
        assert_eq!(config.manager, ManagerConfig::default());
        assert!(config.entities.is_empty());
    }

    #[test]
    fn entities_and_switches_parse() {
        let yaml = r"
manager:
  preload_enabled: false
entities:
  - name: Company
  - name: Person
    methods:
      - name: get_company
        returns: { entity: Company }
";
        let config: MapperConfig = from_yaml(yaml).unwrap();
        assert!(!config.manager.preload_enabled);
        assert!(config.manager.relation_cache_enabled);
        assert_eq!(config.entities.len(), 2);
        assert_eq!(config.entities.get(1).unwrap().methods.len(), 1);
    }

    #[test]
    fn the_bundled_ddl_sample_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../entwine-ddl/schema.yaml");
        let config = MapperConfig::from_file(&path).unwrap();
        assert!(!config.entities.is_empty());
        assert!(config.entities.iter().all(|e| !e.name.is_empty()));
    }

    #[test]
    fn missing_files_name_their_path() {
        let error = MapperConfig::from_file(Path::new("/nonexistent/entwine.yaml")).unwrap_err();
        assert!(matches!(error, ConfigError::Io { ref path, .. } if path == Path::new("/nonexistent/entwine.yaml")));
        assert!(error.to_string().contains("/nonexistent/entwine.yaml"));
    }

    #[test]
    fn invalid_yaml_is_reported() {
        assert!(matches!(
            MapperConfig::parse("manager: [unterminated"),
            Err(ConfigError::Yaml { .. })
        ));
    }
}
