//! Entity metadata consumed by the resolver.
//!
//! The catalog is a capability owned by the host: the resolver only asks it to
//! [`describe`](MetadataCatalog::describe) an entity and snapshots the answer
//! into the request node. [`InMemoryCatalog`] is the stock implementation; it
//! can be assembled in code, loaded from a TOML catalog file, or produced by
//! introspecting a SQLite schema (see `engine::sqlite`).

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NestError, Result};

/// Identifier field assumed when a catalog entry does not name one.
pub const DEFAULT_ID_FIELD: &str = "Id";

/// Provides entity descriptions to the resolver.
pub trait MetadataCatalog {
    /// Describes an entity, or returns `None` if the catalog does not know it.
    fn describe(&self, entity: &str) -> Option<EntityDescriptor>;
}

/// A parent-to-child link between two entities.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRelationship {
    /// Name used to reference the children from inside the parent's selection.
    pub name: String,
    /// Child entity name.
    pub entity: String,
    /// Field on the child that holds the parent's identifier.
    pub join_field: String,
}

/// Read-only description of one entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Entity name.
    pub name: String,
    /// Field names valid for this entity.
    pub fields: BTreeSet<String>,
    /// Field holding each record's identifier.
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// Relationships to child entities.
    #[serde(default, rename = "children")]
    pub child_relationships: Vec<ChildRelationship>,
}

fn default_id_field() -> String {
    DEFAULT_ID_FIELD.to_owned()
}

impl EntityDescriptor {
    /// Creates a descriptor with the given fields and the default identifier field.
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            id_field: default_id_field(),
            child_relationships: Vec::new(),
        }
    }

    /// Overrides the identifier field.
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Adds a child relationship.
    pub fn with_child(
        mut self,
        name: impl Into<String>,
        entity: impl Into<String>,
        join_field: impl Into<String>,
    ) -> Self {
        self.child_relationships.push(ChildRelationship {
            name: name.into(),
            entity: entity.into(),
            join_field: join_field.into(),
        });
        self
    }
}

/// Finds a relationship by relationship name, then by child entity name.
pub fn find_relationship<'a>(
    relationships: &'a [ChildRelationship],
    name: &str,
) -> Option<&'a ChildRelationship> {
    relationships
        .iter()
        .find(|rel| rel.name == name)
        .or_else(|| relationships.iter().find(|rel| rel.entity == name))
}

/// Catalog held entirely in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCatalog {
    entities: BTreeMap<String, EntityDescriptor>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct CatalogFile {
    #[serde(default, rename = "entity")]
    entities: Vec<EntityDescriptor>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity, replacing any previous entry with the same name.
    pub fn with_entity(mut self, entity: EntityDescriptor) -> Self {
        self.insert(entity);
        self
    }

    /// Registers an entity in place.
    pub fn insert(&mut self, entity: EntityDescriptor) {
        self.entities.insert(entity.name.clone(), entity);
    }

    /// Iterates the registered entities in name order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.values()
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true when no entity is registered.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Parses a TOML catalog document.
    ///
    /// ```toml
    /// [[entity]]
    /// name = "Account"
    /// fields = ["Id", "Name"]
    ///
    /// [[entity.children]]
    /// name = "Contacts"
    /// entity = "Contact"
    /// join_field = "AccountId"
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(source).map_err(|source| NestError::CatalogParse {
            path: None,
            source,
        })?;
        Self::from_file_entities(file.entities)
    }

    /// Loads a TOML catalog file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let file: CatalogFile =
            toml::from_str(&contents).map_err(|source| NestError::CatalogParse {
                path: Some(path.to_path_buf()),
                source,
            })?;
        Self::from_file_entities(file.entities)
    }

    /// Serializes the catalog back into the TOML catalog format.
    pub fn to_toml_string(&self) -> Result<String> {
        let file = CatalogFile {
            entities: self.entities.values().cloned().collect(),
        };
        toml::to_string_pretty(&file).map_err(|err| NestError::InvalidCatalog(err.to_string()))
    }

    fn from_file_entities(entities: Vec<EntityDescriptor>) -> Result<Self> {
        let mut catalog = Self::new();
        for entity in entities {
            if catalog.entities.contains_key(&entity.name) {
                return Err(NestError::InvalidCatalog(format!(
                    "entity '{}' is declared twice",
                    entity.name
                )));
            }
            catalog.insert(entity);
        }
        for entity in catalog.entities.values() {
            for rel in &entity.child_relationships {
                if !catalog.entities.contains_key(&rel.entity) {
                    return Err(NestError::InvalidCatalog(format!(
                        "relationship '{}.{}' points at unknown entity '{}'",
                        entity.name, rel.name, rel.entity
                    )));
                }
            }
        }
        Ok(catalog)
    }
}

impl MetadataCatalog for InMemoryCatalog {
    fn describe(&self, entity: &str) -> Option<EntityDescriptor> {
        self.entities.get(entity).cloned()
    }
}

impl<C: MetadataCatalog + ?Sized> MetadataCatalog for &C {
    fn describe(&self, entity: &str) -> Option<EntityDescriptor> {
        (**self).describe(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
        [[entity]]
        name = "Account"
        fields = ["Id", "Name"]

        [[entity.children]]
        name = "Contacts"
        entity = "Contact"
        join_field = "AccountId"

        [[entity]]
        name = "Contact"
        id_field = "ContactId"
        fields = ["ContactId", "LastName", "AccountId"]
    "#;

    #[test]
    fn catalog_file_round_trips_relationships() {
        let catalog = InMemoryCatalog::from_toml_str(CATALOG).expect("catalog parses");
        let account = catalog.describe("Account").expect("account");
        assert_eq!(account.id_field, "Id");
        let rel = find_relationship(&account.child_relationships, "Contacts").expect("by name");
        assert_eq!(rel.join_field, "AccountId");
        assert_eq!(find_relationship(&account.child_relationships, "Contact"), Some(rel));
        assert_eq!(catalog.describe("Contact").expect("contact").id_field, "ContactId");
        assert!(catalog.describe("Bogus").is_none());
    }

    #[test]
    fn dangling_relationship_is_rejected() {
        let source = r#"
            [[entity]]
            name = "Account"
            fields = ["Id"]
            [[entity.children]]
            name = "Notes"
            entity = "Note"
            join_field = "ParentId"
        "#;
        let err = InMemoryCatalog::from_toml_str(source).expect_err("dangling");
        assert!(err.to_string().contains("unknown entity 'Note'"));
    }
}
