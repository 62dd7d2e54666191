//! The request tree built from one query document.

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use crate::engine::Record;
use crate::query::metadata::{find_relationship, ChildRelationship, EntityDescriptor};
use crate::query::value::Value;

/// Argument name reserved for the row limit.
pub const LIMIT_ARG: &str = "limit";
/// Argument name reserved for the row offset.
pub const OFFSET_ARG: &str = "offset";

/// Raw argument values attached to a node. A key written without a value maps to `None`.
pub type Arguments = HashMap<String, Option<String>>;

/// One requested entity occurrence.
///
/// Created by the tree builder, filled with records by the executor and read by
/// the assembler. Children are owned in request order; a child never points back
/// at its parent.
#[derive(Debug)]
pub struct RequestNode {
    /// Output key for this node.
    pub alias: String,
    /// Name as written in the query (entity or relationship name).
    pub name: String,
    /// Resolved entity name used in the native query.
    pub entity: String,
    /// Requested fields in request order, duplicates preserved.
    pub requested_fields: Vec<String>,
    /// Raw argument values.
    pub arguments: Arguments,
    /// Fields valid for the entity, snapshotted at resolve time.
    pub known_fields: BTreeSet<String>,
    /// Identifier field of the entity.
    pub id_field: String,
    /// Child relationships of the entity, snapshotted at resolve time.
    pub child_join_keys: Vec<ChildRelationship>,
    /// Child nodes in request order.
    pub children: Vec<RequestNode>,
    /// Records returned by the backing store.
    pub result_records: Vec<Box<dyn Record>>,
    /// Identifier values of `result_records`, consumed by the children's join filters.
    pub result_identifiers: Vec<Value>,
}

impl RequestNode {
    /// Creates a freshly resolved node with no fields, children or results.
    pub fn new(
        alias: impl Into<String>,
        name: impl Into<String>,
        descriptor: EntityDescriptor,
        arguments: Arguments,
    ) -> Self {
        Self {
            alias: alias.into(),
            name: name.into(),
            entity: descriptor.name,
            requested_fields: Vec::new(),
            arguments,
            known_fields: descriptor.fields,
            id_field: descriptor.id_field,
            child_join_keys: descriptor.child_relationships,
            children: Vec::new(),
            result_records: Vec::new(),
            result_identifiers: Vec::new(),
        }
    }

    /// Requested fields narrowed to known fields, request order, de-duplicated.
    pub fn output_fields(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.requested_fields
            .iter()
            .filter(|field| self.known_fields.contains(field.as_str()))
            .filter(|field| seen.insert(field.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Attaches a child, replacing an earlier sibling with the same alias in place.
    pub fn add_child(&mut self, child: RequestNode) {
        insert_by_alias(&mut self.children, child);
    }

    /// Looks up a child by alias.
    pub fn child(&self, alias: &str) -> Option<&RequestNode> {
        self.children.iter().find(|child| child.alias == alias)
    }

    /// Returns the argument value for `key` if one was given with a value.
    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|value| value.as_deref())
    }
}

/// Finds the join field for `child` by relationship name, then by child entity name.
pub(crate) fn join_field<'a>(
    relationships: &'a [ChildRelationship],
    child: &str,
) -> Option<&'a str> {
    find_relationship(relationships, child).map(|rel| rel.join_field.as_str())
}

/// Inserts a node into an alias-keyed sequence.
///
/// An existing node with the same alias is replaced in its original position.
pub(crate) fn insert_by_alias(nodes: &mut Vec<RequestNode>, node: RequestNode) {
    match nodes.iter_mut().find(|existing| existing.alias == node.alias) {
        Some(slot) => {
            warn!(alias = %node.alias, "query.tree.duplicate_alias");
            *slot = node;
        }
        None => nodes.push(node),
    }
}
