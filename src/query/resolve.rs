//! Resolves a single node token against the metadata catalog.

use tracing::debug;

use crate::query::context::RequestContext;
use crate::query::errors::RequestError;
use crate::query::metadata::{find_relationship, MetadataCatalog};
use crate::query::node::{Arguments, RequestNode};

/// Pieces of a node token before catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeToken {
    /// Output key.
    pub alias: String,
    /// Entity or relationship name.
    pub name: String,
    /// Parsed argument list.
    pub arguments: Arguments,
}

/// Splits `[alias:]Name[(key:value,...)]` into its parts.
///
/// A `key` without `:value` is kept with a `None` value. Later duplicates of a
/// key overwrite earlier ones.
pub fn split_token(token: &str) -> NodeToken {
    let (head, arguments) = match token.find('(') {
        Some(open) => {
            let close = token.rfind(')').filter(|&close| close > open).unwrap_or(token.len());
            let head = format!("{}{}", &token[..open], token.get(close + 1..).unwrap_or(""));
            (head, parse_arguments(&token[open + 1..close]))
        }
        None => (token.to_owned(), Arguments::new()),
    };
    let (alias, name) = match head.split_once(':') {
        Some((alias, name)) => (alias.trim().to_owned(), name.trim().to_owned()),
        None => (head.trim().to_owned(), head.trim().to_owned()),
    };
    NodeToken {
        alias,
        name,
        arguments,
    }
}

fn parse_arguments(list: &str) -> Arguments {
    let mut arguments = Arguments::new();
    for pair in list.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
        match pair.split_once(':') {
            Some((key, value)) => {
                arguments.insert(key.trim().to_owned(), Some(value.trim().to_owned()));
            }
            None => {
                arguments.insert(pair.to_owned(), None);
            }
        }
    }
    arguments
}

/// Resolves node tokens into request nodes.
pub struct ObjectResolver<'a> {
    catalog: &'a dyn MetadataCatalog,
}

impl<'a> ObjectResolver<'a> {
    /// Creates a resolver over the given catalog.
    pub fn new(catalog: &'a dyn MetadataCatalog) -> Self {
        Self { catalog }
    }

    /// Resolves `token` as a root node (`parent == None`) or as a child of `parent`.
    ///
    /// On failure an error is recorded in `ctx` and `None` is returned; the
    /// caller drops the branch.
    pub fn resolve(
        &self,
        token: &str,
        parent: Option<&RequestNode>,
        ctx: &mut RequestContext,
    ) -> Option<RequestNode> {
        let NodeToken {
            alias,
            name,
            arguments,
        } = split_token(token);
        if name.is_empty() {
            ctx.error(RequestError::parse(format!(
                "missing entity name in '{token}'"
            )));
            return None;
        }
        let alias = if alias.is_empty() { name.clone() } else { alias };

        let entity = match parent {
            None => name.clone(),
            Some(parent) => match find_relationship(&parent.child_join_keys, &name) {
                Some(rel) => rel.entity.clone(),
                None => {
                    let err = if self.catalog.describe(&name).is_some() {
                        RequestError::UnknownRelationship {
                            name,
                            parent: parent.entity.clone(),
                        }
                    } else {
                        RequestError::unknown_entity(name)
                    };
                    ctx.error(err);
                    return None;
                }
            },
        };

        let Some(descriptor) = self.catalog.describe(&entity) else {
            ctx.error(RequestError::unknown_entity(name));
            return None;
        };
        debug!(
            alias = %alias,
            entity = %descriptor.name,
            fields = descriptor.fields.len(),
            "query.resolve"
        );
        Some(RequestNode::new(alias, name, descriptor, arguments))
    }
}
