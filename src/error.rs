//! Crate-level error type for setup and I/O paths.
//!
//! Per-request failures never surface here: they are collected as
//! [`RequestError`](crate::query::errors::RequestError) values and reported in
//! the response.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Result alias used by catalog, engine and configuration setup.
pub type Result<T> = std::result::Result<T, NestError>;

/// Failure while loading configuration, catalogs or opening the backing store.
#[derive(Debug, Error)]
pub enum NestError {
    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// SQLite could not open or introspect the database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A catalog file was not valid TOML for the catalog format.
    #[error("failed to parse catalog{}: {source}", path.as_ref().map(|p| format!(" {}", p.display())).unwrap_or_default())]
    CatalogParse {
        /// File the catalog came from, when loaded from disk.
        path: Option<PathBuf>,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// A catalog parsed but is inconsistent.
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A caller-supplied argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_parse_mentions_path_when_known() {
        let source = toml::from_str::<toml::Value>("= nope").expect_err("bad toml");
        let err = NestError::CatalogParse {
            path: Some(PathBuf::from("catalog.toml")),
            source,
        };
        assert!(err.to_string().starts_with("failed to parse catalog catalog.toml: "));
    }
}
