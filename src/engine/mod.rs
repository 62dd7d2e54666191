//! Backing-store capabilities consumed by the executor.
//!
//! The executor never talks to a database directly: it hands compiled query
//! text to a [`QueryEngine`] and reads columns back through [`Record`].

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::query::value::Value;

/// SQLite-backed engine and catalog.
pub mod sqlite;

pub use sqlite::{SqliteCatalog, SqliteEngine};

/// One record returned by the backing store.
pub trait Record: fmt::Debug + Send {
    /// Returns the value of `field`, or `None` when the record has no such column.
    fn get(&self, field: &str) -> Option<&Value>;
}

/// Executes native query text.
pub trait QueryEngine {
    /// Runs `query` and returns every record it produced.
    fn execute(&self, query: &str) -> Result<Vec<Box<dyn Record>>, EngineError>;
}

impl<E: QueryEngine + ?Sized> QueryEngine for &E {
    fn execute(&self, query: &str) -> Result<Vec<Box<dyn Record>>, EngineError> {
        (**self).execute(query)
    }
}

/// Failure reported by a backing store.
#[derive(Debug, Error)]
pub enum EngineError {
    /// SQLite rejected or failed the statement.
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The engine refused the query for its own reasons.
    #[error("{0}")]
    Rejected(String),
}

/// Record stored as a column-name to value map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    values: BTreeMap<String, Value>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column, builder style.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Sets a column.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(field.into(), value.into());
    }
}

impl Record for Row {
    fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
