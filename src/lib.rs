//! Nested-query translation service.
//!
//! Accepts GraphQL-like query documents over a relational store, resolves them
//! against entity metadata, runs one native query per requested node and
//! stitches the results into nested JSON. See [`service::QueryService`].

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod query;
pub mod service;

pub use engine::{QueryEngine, Record, SqliteCatalog, SqliteEngine};
pub use error::{NestError, Result};
pub use query::{InMemoryCatalog, MetadataCatalog};
pub use service::{QueryService, Request, Response};
