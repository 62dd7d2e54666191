use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::engine::{EngineError, QueryEngine, Record, Row};
use crate::error::Result;
use crate::query::metadata::{
    ChildRelationship, EntityDescriptor, InMemoryCatalog, MetadataCatalog, DEFAULT_ID_FIELD,
};
use crate::query::value::Value;

/// Query engine running compiled SQL on a SQLite connection.
pub struct SqliteEngine {
    conn: Connection,
}

impl SqliteEngine {
    /// Opens (or creates) a database file.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Opens an existing database file without write access.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Borrows the underlying connection, e.g. to seed data.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl QueryEngine for SqliteEngine {
    fn execute(&self, query: &str) -> std::result::Result<Vec<Box<dyn Record>>, EngineError> {
        let mut stmt = self.conn.prepare(query)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let row_iter = stmt.query_map([], |row| {
            columns
                .iter()
                .enumerate()
                .map(|(idx, column)| Ok((column.as_str(), value_from_sql(row.get_ref(idx)?))))
                .collect::<rusqlite::Result<Row>>()
        })?;

        let mut records: Vec<Box<dyn Record>> = Vec::new();
        for record in row_iter {
            records.push(Box::new(record?));
        }
        Ok(records)
    }
}

fn value_from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    }
}

/// Catalog derived from a SQLite schema.
///
/// Every table becomes an entity whose fields are its columns. The identifier
/// field is the first primary-key column, falling back to the configured
/// default. Each foreign key `child.col -> parent` becomes a relationship on
/// `parent` named after `child` (or `child_col` when a child references the
/// same parent more than once).
#[derive(Clone, Debug)]
pub struct SqliteCatalog {
    inner: InMemoryCatalog,
}

impl SqliteCatalog {
    /// Introspects the schema reachable through `conn`.
    pub fn introspect(conn: &Connection, default_id_field: Option<&str>) -> Result<Self> {
        let default_id_field = default_id_field.unwrap_or(DEFAULT_ID_FIELD);
        let tables = list_tables(conn)?;

        let mut entities = BTreeMap::new();
        let mut links: Vec<(String, String, String)> = Vec::new();
        for table in &tables {
            let mut stmt =
                conn.prepare("SELECT name, pk FROM pragma_table_info(?1) ORDER BY cid")?;
            let columns = stmt
                .query_map([table], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            let id_field = columns
                .iter()
                .filter(|(_, pk)| *pk > 0)
                .min_by_key(|(_, pk)| *pk)
                .map(|(name, _)| name.clone())
                .unwrap_or_else(|| default_id_field.to_owned());
            let descriptor =
                EntityDescriptor::new(table.clone(), columns.into_iter().map(|(name, _)| name))
                    .with_id_field(id_field);
            entities.insert(table.clone(), descriptor);

            let mut stmt = conn.prepare(
                "SELECT \"table\", \"from\" FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
            )?;
            let fks = stmt
                .query_map([table], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (parent, column) in fks {
                links.push((parent, table.clone(), column));
            }
        }

        for (parent, child, column) in &links {
            let repeated = links
                .iter()
                .filter(|(p, c, _)| p == parent && c == child)
                .count()
                > 1;
            let name = if repeated {
                format!("{child}_{column}")
            } else {
                child.clone()
            };
            if let Some(descriptor) = entities.get_mut(parent) {
                descriptor.child_relationships.push(ChildRelationship {
                    name,
                    entity: child.clone(),
                    join_field: column.clone(),
                });
            }
        }

        let mut inner = InMemoryCatalog::new();
        for descriptor in entities.into_values() {
            inner.insert(descriptor);
        }
        debug!(
            entities = inner.len(),
            relationships = links.len(),
            "catalog.sqlite.introspect"
        );
        Ok(Self { inner })
    }

    /// Consumes the wrapper, returning the introspected catalog.
    pub fn into_inner(self) -> InMemoryCatalog {
        self.inner
    }
}

impl MetadataCatalog for SqliteCatalog {
    fn describe(&self, entity: &str) -> Option<EntityDescriptor> {
        self.inner.describe(entity)
    }
}

fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tables)
}
