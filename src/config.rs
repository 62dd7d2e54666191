//! On-disk configuration.
//!
//! ```toml
//! database = "crm.db"
//! catalog = "catalog.toml"
//! log = "nestql=debug"
//! id_field = "Id"
//!
//! [limits]
//! max_depth = 16
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::tree::DEFAULT_MAX_DEPTH;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "NESTQL_CONFIG";

/// Loaded configuration plus the file it came from.
#[derive(Debug, Default)]
pub struct Config {
    path: Option<PathBuf>,
    data: RawConfig,
}

impl Config {
    /// Loads `explicit`, or the default config path. A missing file yields defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(default_config_path);
        let data = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            _ => RawConfig::default(),
        };
        Ok(Self { path, data })
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let data = toml::from_str(source).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Ok(Self { path: None, data })
    }

    /// File the configuration was looked up at.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Default SQLite database.
    pub fn database(&self) -> Option<&Path> {
        self.data.database.as_deref()
    }

    /// Catalog file to load instead of introspecting the database.
    pub fn catalog(&self) -> Option<&Path> {
        self.data.catalog.as_deref()
    }

    /// Default log filter.
    pub fn log(&self) -> Option<&str> {
        self.data.log.as_deref()
    }

    /// Identifier field assumed for tables without a primary key.
    pub fn id_field(&self) -> Option<&str> {
        self.data.id_field.as_deref()
    }

    /// Maximum nesting depth of a query document.
    pub fn max_depth(&self) -> usize {
        self.data.limits.max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    database: Option<PathBuf>,
    catalog: Option<PathBuf>,
    log: Option<String>,
    id_field: Option<String>,
    #[serde(default)]
    limits: LimitsSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct LimitsSection {
    max_depth: Option<usize>,
}

/// Failure while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Config file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid configuration TOML.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Config file.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
}

/// `<config dir>/nestql/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("nestql").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load(Some(dir.path().join("absent.toml"))).expect("load");
        assert_eq!(config.database(), None);
        assert_eq!(config.max_depth(), DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn reads_every_key() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        writeln!(
            file,
            "database = \"crm.db\"\ncatalog = \"catalog.toml\"\nlog = \"debug\"\nid_field = \"Key\"\n\n[limits]\nmax_depth = 4"
        )?;
        let config = Config::load(Some(file.path().to_path_buf()))?;
        assert_eq!(config.database(), Some(Path::new("crm.db")));
        assert_eq!(config.catalog(), Some(Path::new("catalog.toml")));
        assert_eq!(config.log(), Some("debug"));
        assert_eq!(config.id_field(), Some("Key"));
        assert_eq!(config.max_depth(), 4);
        assert_eq!(config.path(), Some(file.path()));
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml_str("databse = \"typo.db\"").expect_err("typo");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
